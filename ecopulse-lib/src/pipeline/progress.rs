use super::Step;

/// Receives pipeline milestones as they happen.
///
/// `repository_collected` is called from collection workers, possibly concurrently.
/// Everything else comes from the task driving the protocol.
pub trait Progress: Send + Sync {
    /// `protocol` is about to run `step`.
    fn step_started(&self, protocol: &str, step: Step);

    /// Per-repository collection of `protocol` covers `total` valid repositories.
    fn collection_started(&self, protocol: &str, total: u64);

    /// The repository `key` of `protocol` has been collected, successfully or not.
    fn repository_collected(&self, protocol: &str, key: &str);

    /// Every selected protocol has been run.
    fn run_finished(&self);
}

/// Progress sink that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn step_started(&self, _protocol: &str, _step: Step) {}

    fn collection_started(&self, _protocol: &str, _total: u64) {}

    fn repository_collected(&self, _protocol: &str, _key: &str) {}

    fn run_finished(&self) {}
}
