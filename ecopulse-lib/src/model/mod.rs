//! Shared data types.

mod repo_spec;
mod repository;
mod snapshots;

pub use repo_spec::{RepoSpec, repository_key};
pub use repository::RepositoryRecord;
pub use snapshots::{
    CodeFrequencyEntry, CommitItem, ContributorActivity, ContributorWeek, IssueItem, ItemState, PunchCardEntry, ReleaseItem,
    RepoCounts, Snapshot, WeeklyCommitActivity,
};
