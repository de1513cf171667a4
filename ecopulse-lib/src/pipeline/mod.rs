//! Per-protocol orchestration.
//!
//! A protocol moves through a fixed sequence of [`Phase`]s. Each phase runs an ordered
//! list of named [`Step`]s, and a failing step is logged and recorded without stopping
//! the steps after it. Per-repository collection fans out with bounded concurrency and is
//! drained completely before scoring starts.

mod context;
mod progress;

pub use context::{Actors, CancellationFlag, Credentials, RunContext};
pub use progress::{NoProgress, Progress};

use crate::Result;
use crate::aggregate::Aggregator;
use crate::collector::{CollectStep, Collector};
use crate::config::ProtocolConfig;
use crate::crawler::{Crawler, build_adapter};
use crate::integrations::{self, IntegrationReport};
use crate::model::RepositoryRecord;
use crate::scoring::HealthScorer;
use crate::store::{DocumentStore, ProtocolCollections, read_records};
use futures_util::StreamExt;
use futures_util::stream;
use strum::Display;

const LOG_TARGET: &str = "  pipeline";

/// Milestones of a protocol run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Phase {
    Configured,
    RepositoriesResolved,
    PerRepoCollected,
    Scored,
    Aggregated,
    Done,
}

/// A named unit of work within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    Crawl,
    CollectRepositories,
    CollectForum,
    CollectDevelopers,
    CollectGovernance,
    CollectAsset,
    Score,
    Aggregate,
}

/// The steps of every phase after [`Phase::Configured`], in execution order.
const PLAN: [(Phase, &[Step]); 4] = [
    (Phase::RepositoriesResolved, &[Step::Crawl]),
    (
        Phase::PerRepoCollected,
        &[
            Step::CollectRepositories,
            Step::CollectForum,
            Step::CollectDevelopers,
            Step::CollectGovernance,
            Step::CollectAsset,
        ],
    ),
    (Phase::Scored, &[Step::Score]),
    (Phase::Aggregated, &[Step::Aggregate]),
];

/// Outcome of one protocol run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub protocol: String,
    pub phases: Vec<Phase>,

    /// Name and error text of every failed step. Per-repository and per-integration
    /// metrics are named `{key}/{metric}`.
    pub failed_steps: Vec<(String, String)>,
    pub valid: usize,
    pub invalid: usize,
    pub cancelled: bool,
}

impl RunReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failed_steps.is_empty() && !self.cancelled
    }

    #[must_use]
    pub fn reached(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    /// One-line summary for the end of a run.
    #[must_use]
    pub fn summary(&self) -> String {
        let last = self.phases.last().copied().unwrap_or(Phase::Configured);
        let mut line = format!(
            "{}: {} valid, {} invalid repositories, reached {last}, {} failed steps",
            self.protocol,
            self.valid,
            self.invalid,
            self.failed_steps.len()
        );
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }

    fn record_failure(&mut self, name: impl Into<String>, error: impl Into<String>) {
        self.failed_steps.push((name.into(), error.into()));
    }

    fn absorb_integration(&mut self, integration: IntegrationReport) {
        for (metric, error) in integration.failed {
            self.record_failure(format!("{}/{metric}", integration.collection), error);
        }
    }
}

/// Repositories known to a protocol run so far.
#[derive(Debug, Default)]
struct ProtocolState {
    records: Vec<RepositoryRecord>,
}

/// Runs protocols through every phase.
#[derive(Debug)]
pub struct Pipeline<'a> {
    ctx: &'a RunContext,
    steps: Vec<CollectStep>,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline that collects `steps` for every repository.
    pub fn new(ctx: &'a RunContext, steps: Vec<CollectStep>) -> Result<Self> {
        for step in &steps {
            step.validate()?;
        }
        Ok(Self { ctx, steps })
    }

    /// Run each protocol in turn, stopping early once cancelled.
    pub async fn run(&self, protocols: &[&ProtocolConfig]) -> Vec<RunReport> {
        let mut reports = Vec::with_capacity(protocols.len());
        for protocol in protocols {
            if self.ctx.cancel.is_cancelled() {
                log::warn!(target: LOG_TARGET, "Cancelled before protocol '{}'", protocol.name);
                reports.push(RunReport {
                    protocol: protocol.name.clone(),
                    phases: vec![Phase::Configured],
                    cancelled: true,
                    ..RunReport::default()
                });
                continue;
            }
            reports.push(self.run_protocol(protocol).await);
        }
        self.ctx.progress.run_finished();
        reports
    }

    /// Run one protocol through every phase.
    pub async fn run_protocol(&self, protocol: &ProtocolConfig) -> RunReport {
        let mut report = RunReport {
            protocol: protocol.name.clone(),
            phases: vec![Phase::Configured],
            ..RunReport::default()
        };
        let mut state = ProtocolState::default();

        log::info!(target: LOG_TARGET, "Running protocol '{}'", protocol.name);

        'phases: for (phase, steps) in PLAN {
            for &step in steps {
                if self.ctx.cancel.is_cancelled() {
                    log::warn!(target: LOG_TARGET, "Protocol '{}' cancelled before step '{step}'", protocol.name);
                    report.cancelled = true;
                    break 'phases;
                }

                self.ctx.progress.step_started(&protocol.name, step);
                if let Err(e) = self.run_step(step, protocol, &mut state, &mut report).await {
                    log::error!(target: LOG_TARGET, "Step '{step}' failed for protocol '{}': {e:#}", protocol.name);
                    report.record_failure(step.to_string(), format!("{e:#}"));
                }
            }

            // a phase whose fan-out was interrupted is not reached
            if report.cancelled {
                break;
            }
            report.phases.push(phase);
        }

        if !report.cancelled {
            report.phases.push(Phase::Done);
        }

        report.valid = state.records.iter().filter(|r| r.valid).count();
        report.invalid = state.records.len() - report.valid;

        log::info!(target: LOG_TARGET, "{}", report.summary());
        report
    }

    async fn run_step(&self, step: Step, protocol: &ProtocolConfig, state: &mut ProtocolState, report: &mut RunReport) -> Result<()> {
        let store: &dyn DocumentStore = &*self.ctx.store;
        let actors = &self.ctx.actors;
        let collections = ProtocolCollections::new(&protocol.name);

        match step {
            Step::Crawl => {
                let crawler = Crawler::new(&actors.github_rest, &actors.manifests, store, self.ctx.settings.collect_concurrency);
                let adapter = protocol.adapter.as_ref().map(build_adapter);

                match crawler.run(protocol, adapter.as_deref()).await {
                    Ok(records) => state.records = records,
                    Err(e) => {
                        // keep going with whatever an earlier run persisted
                        state.records = read_records(store, &collections).unwrap_or_default();
                        return Err(e);
                    }
                }
            }

            Step::CollectRepositories => self.collect_repositories(protocol, &collections, state, report).await,

            Step::CollectForum => {
                if let Some(actor) = actors.forums.get(&protocol.name) {
                    let metrics = integrations::forum_metrics();
                    report.absorb_integration(integrations::collect(actor, store, &collections.forum(), &metrics).await);
                }
            }

            Step::CollectDevelopers => {
                if let Some(config) = &protocol.developer_report {
                    let metrics = integrations::developer_metrics(&config.ecosystem);
                    report.absorb_integration(
                        integrations::collect(&actors.developer_report, store, &collections.developers(), &metrics).await,
                    );
                }
            }

            Step::CollectGovernance => {
                if let Some(config) = &protocol.governance {
                    let metrics = integrations::governance_metrics(config);
                    report.absorb_integration(integrations::collect(&actors.governance, store, &collections.governance(), &metrics).await);
                }
            }

            Step::CollectAsset => {
                if let Some(config) = &protocol.asset {
                    let metrics = integrations::asset_metrics(&config.key);
                    report.absorb_integration(integrations::collect(&actors.asset_data, store, &collections.asset(), &metrics).await);
                }
            }

            Step::Score => {
                let _ = HealthScorer::new(store, self.ctx.now).score_protocol(&collections, &state.records)?;
            }

            Step::Aggregate => {
                let _ = Aggregator::new(store).aggregate(&collections, &state.records)?;
            }
        }

        Ok(())
    }

    async fn collect_repositories(
        &self,
        protocol: &ProtocolConfig,
        collections: &ProtocolCollections,
        state: &ProtocolState,
        report: &mut RunReport,
    ) {
        let valid: Vec<&RepositoryRecord> = state.records.iter().filter(|r| r.valid).collect();
        let collector = Collector::new(
            &self.ctx.actors.github_rest,
            &self.ctx.actors.github_graphql,
            &*self.ctx.store,
            &self.steps,
            self.ctx.settings.max_pages,
        );

        let total = valid.len();
        self.ctx.progress.collection_started(&protocol.name, total as u64);

        let collector = &collector;
        let outcomes: Vec<_> = stream::iter(valid)
            .map(|record| async move {
                if self.ctx.cancel.is_cancelled() {
                    return None;
                }
                let outcome = collector.collect_repository(collections, record).await;
                self.ctx.progress.repository_collected(&protocol.name, &outcome.key);
                Some(outcome)
            })
            .buffer_unordered(self.ctx.settings.collect_concurrency.max(1))
            .collect()
            .await;

        let collected = outcomes.iter().flatten().count();
        for outcome in outcomes {
            match outcome {
                Some(outcome) => {
                    for (metric, error) in outcome.failed {
                        report.record_failure(format!("{}/{metric}", outcome.key), error);
                    }
                }
                None => report.cancelled = true,
            }
        }

        if report.cancelled {
            log::warn!(
                target: LOG_TARGET,
                "Collection for protocol '{}' was cancelled after {collected} of {total} repositories",
                protocol.name
            );
        }
    }
}
