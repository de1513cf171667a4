use crate::pipeline::{Progress, Step};
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;

const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const BAR_WIDTH: usize = 25;

/// Bar and spinner templates, with and without color.
const BAR_TEMPLATES: [&str; 2] = ["{prefix:>12.bold.cyan} [{bar:25}] {pos}/{len} {msg}", "{prefix:>12} [{bar:25}] {pos}/{len} {msg}"];
const SPINNER_TEMPLATES: [&str; 2] = ["{prefix:>12.bold.cyan} [{spinner}] {msg}", "{prefix:>12} [{spinner}] {msg}"];

/// Shared between the reporter and its refresh task.
#[derive(Debug)]
struct Shared {
    shown_after: Instant,
    shown: AtomicBool,
    spinning: AtomicBool,
    step_started: Mutex<Instant>,
    activity: Mutex<String>,
}

/// The word shown in front of a step's bar or spinner.
const fn step_label(step: Step) -> &'static str {
    match step {
        Step::Crawl => "Crawling",
        Step::CollectRepositories => "Collecting",
        Step::CollectForum => "Forum",
        Step::CollectDevelopers => "Developers",
        Step::CollectGovernance => "Governance",
        Step::CollectAsset => "Market",
        Step::Score => "Scoring",
        Step::Aggregate => "Aggregating",
    }
}

/// Pipeline progress on stderr, shown only once a run outlasts the initial delay.
///
/// Steps run behind a spinner labelled with the protocol and step. Per-repository collection
/// switches to a bar counting collected repositories.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    shared: Arc<Shared>,
    refresh: Arc<JoinHandle<()>>,
    use_colors: bool,
}

impl ProgressReporter {
    /// Create a reporter that stays invisible for `delay`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();

        let shared = Arc::new(Shared {
            shown_after: Instant::now() + delay,
            shown: AtomicBool::new(false),
            spinning: AtomicBool::new(false),
            step_started: Mutex::new(Instant::now()),
            activity: Mutex::new(String::new()),
        });

        Self {
            refresh: Arc::new(tokio::spawn(refresh(bar.clone(), Arc::clone(&shared)))),
            bar,
            shared,
            use_colors,
        }
    }

    fn template(&self, templates: [&'static str; 2]) -> &'static str {
        templates[usize::from(!self.use_colors)]
    }
}

impl Progress for ProgressReporter {
    fn step_started(&self, protocol: &str, step: Step) {
        self.bar.set_prefix(step_label(step));
        *self.shared.step_started.lock().expect("lock poisoned") = Instant::now();
        *self.shared.activity.lock().expect("lock poisoned") = format!("{protocol}: {step}");
        self.shared.spinning.store(true, Ordering::Relaxed);
        self.bar.enable_steady_tick(REFRESH_INTERVAL);

        let frames = sweep_frames();
        let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
        self.bar.set_style(
            ProgressStyle::default_spinner()
                .template(self.template(SPINNER_TEMPLATES))
                .expect("spinner template is valid")
                .tick_strings(&frames),
        );
    }

    fn collection_started(&self, protocol: &str, total: u64) {
        self.shared.spinning.store(false, Ordering::Relaxed);
        *self.shared.activity.lock().expect("lock poisoned") = protocol.to_string();
        self.bar.disable_steady_tick();
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template(self.template(BAR_TEMPLATES))
                .expect("progress bar template is valid")
                .progress_chars("=> "),
        );
    }

    fn repository_collected(&self, protocol: &str, key: &str) {
        *self.shared.activity.lock().expect("lock poisoned") = format!("{protocol}: {key}");
        self.bar.inc(1);
    }

    fn run_finished(&self) {
        self.refresh.abort();
        if self.shared.shown.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("shared", &self.shared)
            .field("use_colors", &self.use_colors)
            .finish_non_exhaustive()
    }
}

/// A `===>` block sweeping right then `<===` sweeping back, padded to the bar width.
///
/// The last frame is only shown once the spinner finishes.
fn sweep_frames() -> Vec<String> {
    let pad = |lead: usize, block: &str| {
        let mut frame = " ".repeat(lead);
        frame.push_str(block);
        frame.truncate(BAR_WIDTH);
        format!("{frame:<BAR_WIDTH$}")
    };

    let mut frames: Vec<String> = (0..BAR_WIDTH).map(|lead| pad(lead, "===>")).collect();
    frames.extend((0..BAR_WIDTH).rev().map(|lead| pad(lead, "<===")));
    frames.push(" ".repeat(BAR_WIDTH));
    frames
}

async fn refresh(bar: ProgressBar, shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !shared.shown.load(Ordering::Relaxed) {
            if Instant::now() < shared.shown_after {
                continue;
            }
            shared.shown.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        let mut message = shared.activity.lock().expect("lock poisoned").clone();
        if shared.spinning.load(Ordering::Relaxed) {
            let elapsed = shared.step_started.lock().expect("lock poisoned").elapsed().as_secs();
            message = format!("{elapsed}s: {message}");
        }

        bar.set_message(message);
    }
}
