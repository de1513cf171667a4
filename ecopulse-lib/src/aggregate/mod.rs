//! Protocol-wide rollups of per-repository snapshots.
//!
//! The [`Aggregator`] folds the snapshots of every valid repository into cumulative
//! documents under `{protocol}-cumulative` and leaderboards under `{protocol}-leaderboard`.
//! Invalid repositories never contribute.

mod leaderboard;
mod ranked;
mod series;

pub use leaderboard::{ContributorEntry, LEADERBOARD_LIMIT, ProjectEntry, contributor_leaderboard, project_leaderboard};
pub use ranked::{RANKED_LIMIT, fold_top};
pub use series::{merge_code_frequency, merge_commit_activity, merge_punch_card};

use crate::Result;
use crate::model::{
    CodeFrequencyEntry, CommitItem, ContributorActivity, IssueItem, PunchCardEntry, ReleaseItem, RepoCounts, RepositoryRecord,
    WeeklyCommitActivity,
};
use crate::scoring::{NormalizedHealthScore, SCORES_DOCUMENT};
use crate::store::{DocumentStore, ProtocolCollections, read_snapshot, replace_snapshot};
use compact_str::CompactString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const LOG_TARGET: &str = " aggregate";

/// Per-repository issue lists and the key each is ranked by.
const ISSUE_LISTS: [(&str, IssueOrder); 5] = [
    ("most_active_issues", IssueOrder::Comments),
    ("recent_issues_created", IssueOrder::Created),
    ("recent_prs_created", IssueOrder::Created),
    ("recent_issues_updated", IssueOrder::Updated),
    ("recent_prs_updated", IssueOrder::Updated),
];

#[derive(Debug, Clone, Copy)]
enum IssueOrder {
    Comments,
    Created,
    Updated,
}

/// Additive scalars summed over valid repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub repositories: u64,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub disk_usage_kb: u64,
    pub open_issues: u64,
    pub closed_issues: u64,
    pub open_prs: u64,
    pub closed_prs: u64,
    pub merged_prs: u64,
    pub releases: u64,
}

impl Totals {
    fn add(&mut self, record: &RepositoryRecord, counts: Option<RepoCounts>) {
        self.repositories += 1;
        self.stars += record.stars.unwrap_or(0);
        self.forks += record.forks.unwrap_or(0);
        self.watchers += record.watchers.unwrap_or(0);

        if let Some(counts) = counts {
            self.disk_usage_kb += counts.disk_usage_kb;
            self.open_issues += counts.open_issues;
            self.closed_issues += counts.closed_issues;
            self.open_prs += counts.open_prs;
            self.closed_prs += counts.closed_prs;
            self.merged_prs += counts.merged_prs;
            self.releases += counts.releases;
        } else {
            self.disk_usage_kb += record.size_kb.unwrap_or(0);
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    totals: Totals,
    commit_activity: Vec<WeeklyCommitActivity>,
    code_frequency: Vec<CodeFrequencyEntry>,
    punch_card: Vec<PunchCardEntry>,
    issue_lists: BTreeMap<&'static str, Vec<IssueItem>>,
    recent_commits: Vec<CommitItem>,
    recent_releases: Vec<ReleaseItem>,
    contributor_commits: BTreeMap<CompactString, u64>,
}

/// Builds the cumulative documents of one protocol.
#[derive(Debug)]
pub struct Aggregator<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> Aggregator<'a> {
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Fold the valid repositories among `records` and write every rollup.
    ///
    /// Returns the names of the documents written. A rollup that would be empty is not
    /// written, and any copy left by an earlier run is removed.
    pub fn aggregate(&self, collections: &ProtocolCollections, records: &[RepositoryRecord]) -> Result<Vec<&'static str>> {
        let valid: Vec<&RepositoryRecord> = records.iter().filter(|r| r.valid).collect();

        let mut acc = Accumulator::default();
        for record in &valid {
            self.fold(&mut acc, &collections.repository(&record.key()), record)?;
        }

        let cumulative = collections.cumulative();
        let mut written = Vec::new();
        let mut write = |collection: &str, id: &'static str, payload: Value| -> Result<()> {
            if replace_snapshot(self.store, collection, id, &payload)? {
                written.push(id);
            }
            Ok(())
        };

        let totals = if acc.totals.repositories > 0 { serde_json::to_value(acc.totals)? } else { Value::Null };
        write(&cumulative, "totals", totals)?;
        write(&cumulative, "commit_activity", serde_json::to_value(&acc.commit_activity)?)?;
        write(&cumulative, "code_frequency", serde_json::to_value(&acc.code_frequency)?)?;
        write(&cumulative, "punch_card", serde_json::to_value(&acc.punch_card)?)?;
        for (name, _) in ISSUE_LISTS {
            let list = acc.issue_lists.get(name).map_or(Ok(Value::Null), serde_json::to_value)?;
            write(&cumulative, name, list)?;
        }
        write(&cumulative, "recent_commits", serde_json::to_value(&acc.recent_commits)?)?;
        write(&cumulative, "recent_releases", serde_json::to_value(&acc.recent_releases)?)?;

        let scores: BTreeMap<String, NormalizedHealthScore> =
            read_snapshot(self.store, &cumulative, SCORES_DOCUMENT)?.unwrap_or_default();
        let owned: Vec<RepositoryRecord> = valid.iter().map(|r| (*r).clone()).collect();

        let leaderboard = collections.leaderboard();
        write(&leaderboard, "projects", serde_json::to_value(project_leaderboard(&owned, &scores))?)?;
        write(&leaderboard, "contributors", serde_json::to_value(contributor_leaderboard(acc.contributor_commits))?)?;

        log::info!(
            target: LOG_TARGET,
            "Aggregated {} valid repositories of protocol '{}' into {} documents",
            valid.len(),
            collections.protocol(),
            written.len()
        );

        Ok(written)
    }

    fn fold(&self, acc: &mut Accumulator, collection: &str, record: &RepositoryRecord) -> Result<()> {
        acc.totals.add(record, self.read(collection, "counts")?);

        if let Some(weeks) = self.read::<Vec<WeeklyCommitActivity>>(collection, "commit_activity")? {
            merge_commit_activity(&mut acc.commit_activity, &weeks);
        }
        if let Some(entries) = self.read::<Vec<CodeFrequencyEntry>>(collection, "code_frequency")? {
            merge_code_frequency(&mut acc.code_frequency, &entries);
        }
        if let Some(cells) = self.read::<Vec<PunchCardEntry>>(collection, "punch_card")? {
            merge_punch_card(&mut acc.punch_card, &cells);
        }

        for (name, order) in ISSUE_LISTS {
            if let Some(items) = self.read::<Vec<IssueItem>>(collection, name)? {
                let list = acc.issue_lists.entry(name).or_default();
                match order {
                    IssueOrder::Comments => fold_top(list, items, RANKED_LIMIT, |i| i.comments),
                    IssueOrder::Created => fold_top(list, items, RANKED_LIMIT, |i| i.created_at),
                    IssueOrder::Updated => fold_top(list, items, RANKED_LIMIT, |i| i.updated_at),
                }
            }
        }

        if let Some(commits) = self.read::<Vec<CommitItem>>(collection, "recent_commits")? {
            fold_top(&mut acc.recent_commits, commits, RANKED_LIMIT, |c| c.date);
        }
        if let Some(releases) = self.read::<Vec<ReleaseItem>>(collection, "releases")? {
            fold_top(&mut acc.recent_releases, releases, RANKED_LIMIT, |r| r.published_at);
        }

        if let Some(contributors) = self.read::<Vec<ContributorActivity>>(collection, "contributors")? {
            for contributor in contributors {
                *acc.contributor_commits.entry(contributor.login).or_insert(0) += contributor.total;
            }
        }

        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, collection: &str, metric: &str) -> Result<Option<T>> {
        read_snapshot(self.store, collection, metric)
    }
}
