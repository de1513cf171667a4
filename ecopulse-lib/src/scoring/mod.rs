//! Repository health scoring.
//!
//! Raw sub-scores are computed from each repository's own snapshots and then normalized
//! into percentiles across every valid repository of the protocol, so a score only has
//! meaning relative to its ecosystem.

mod grade;
mod normalize;
mod raw;
mod stats;

pub use grade::Grade;
pub use normalize::{FALLBACK_PERCENTILE, NormalizedHealthScore, normalize, percentiles};
pub use raw::{RawHealthScore, ScoreInputs, commit_score, contribution_score, item_score, raw_score, release_score};

use crate::Result;
use crate::model::RepositoryRecord;
use crate::store::{DocumentStore, ProtocolCollections, read_snapshot, replace_snapshot, write_snapshot};
use chrono::{DateTime, Utc};
use ohno::EnrichableExt;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "   scoring";

pub const RAW_SCORE_METRIC: &str = "health_score_raw";
pub const SCORE_METRIC: &str = "health_score";
pub const SCORES_DOCUMENT: &str = "health_scores";

/// Scores every valid repository of a protocol and persists the results.
#[derive(Debug)]
pub struct HealthScorer<'a> {
    store: &'a dyn DocumentStore,
    now: DateTime<Utc>,
}

impl<'a> HealthScorer<'a> {
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }

    /// Read the snapshots a repository's raw score depends on. Missing snapshots are empty.
    pub fn inputs(&self, collection: &str) -> Result<ScoreInputs> {
        Ok(ScoreInputs {
            commit_activity: self.read(collection, "commit_activity")?,
            issues: self.read(collection, "issues")?,
            pull_requests: self.read(collection, "pull_requests")?,
            releases: self.read(collection, "releases")?,
            contributors: self.read(collection, "contributors")?,
        })
    }

    fn read<T: DeserializeOwned + Default>(&self, collection: &str, metric: &str) -> Result<T> {
        Ok(read_snapshot(self.store, collection, metric)?.unwrap_or_default())
    }

    /// Score the valid repositories among `records`.
    ///
    /// Writes `health_score_raw` and `health_score` for every scored repository, plus the
    /// protocol-wide `health_scores` map.
    pub fn score_protocol(
        &self,
        collections: &ProtocolCollections,
        records: &[RepositoryRecord],
    ) -> Result<BTreeMap<String, NormalizedHealthScore>> {
        let mut raw = BTreeMap::new();
        for record in records.iter().filter(|r| r.valid) {
            let key = record.key();
            let collection = collections.repository(&key);
            let inputs = self
                .inputs(&collection)
                .map_err(|e| e.enrich_with(|| format!("reading score inputs of '{key}'")))?;

            let score = raw_score(&inputs, self.now);
            log::debug!(target: LOG_TARGET, "Raw score of '{key}': {score:?}");

            let _ = write_snapshot(self.store, &collection, RAW_SCORE_METRIC, &score)?;
            let _ = raw.insert(key, score);
        }

        let normalized = normalize(&raw);
        for (key, score) in &normalized {
            let _ = write_snapshot(self.store, &collections.repository(key), SCORE_METRIC, score)?;
        }

        let _ = replace_snapshot(self.store, &collections.cumulative(), SCORES_DOCUMENT, &normalized)?;

        log::info!(
            target: LOG_TARGET,
            "Scored {} repositories of protocol '{}'",
            normalized.len(),
            collections.protocol()
        );

        Ok(normalized)
    }
}
