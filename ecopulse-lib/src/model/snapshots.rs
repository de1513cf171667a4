//! Payloads of per-repository metric snapshots.
//!
//! These are the normalized shapes the collector stores and the scorer and aggregator
//! read back. Provider wire formats are converted into them at collection time.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// The `{"data": ...}` envelope every metric document is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub data: T,
}

/// One week of commit activity, as reported by the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyCommitActivity {
    /// Commits per day, Sunday first.
    pub days: Vec<u64>,
    pub total: u64,
    /// Start of the week, epoch seconds.
    pub week: i64,
}

/// Additions and deletions for one week, keyed by the week's start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFrequencyEntry {
    /// `%Y-%m-%d`
    pub date: String,
    pub additions: u64,
    pub deletions: u64,
}

/// Commits made in one hour of one weekday, summed over the repository's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchCardEntry {
    pub day: u8,
    pub hour: u8,
    pub commits: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorWeek {
    /// Start of the week, epoch seconds.
    pub w: i64,
    /// Additions
    pub a: u64,
    /// Deletions
    pub d: u64,
    /// Commits
    pub c: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorActivity {
    pub login: CompactString,
    pub total: u64,
    /// Oldest week first.
    pub weeks: Vec<ContributorWeek>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
}

/// An issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueItem {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: ItemState,
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_pull_request: bool,
    /// Key of the repository the item belongs to.
    #[serde(default)]
    pub repository: String,
}

impl IssueItem {
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, ItemState::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseItem {
    pub tag_name: String,
    pub name: Option<String>,
    pub html_url: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repository: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitItem {
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
    pub html_url: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repository: String,
}

/// Totals that are cheaper to ask for directly than to count from item lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCounts {
    pub open_issues: u64,
    pub closed_issues: u64,
    pub open_prs: u64,
    pub closed_prs: u64,
    pub merged_prs: u64,
    pub releases: u64,
    pub disk_usage_kb: u64,
}
