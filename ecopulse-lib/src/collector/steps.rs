use crate::Result;
use ohno::bail;
use strum::Display;

/// Which half of the issue tracker a step reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ItemKind {
    #[strum(serialize = "issues")]
    Issue,
    #[strum(serialize = "pull requests")]
    PullRequest,
}

/// Order of a "recent items" list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ListOrder {
    Created,
    Updated,
    /// Most discussed first. Only the issues listing can sort this way.
    Comments,
}

/// One metric snapshot collected for every repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectStep {
    /// Weekly commit totals for the last year
    CommitActivity,
    /// Weekly additions and deletions
    CodeFrequency,
    /// Commits per weekday and hour
    PunchCard,
    /// Per-contributor weekly activity
    Contributors,
    /// Every issue or pull request up to the page limit, used for scoring
    ScoringItems(ItemKind),
    /// The ten most recent or most discussed items
    RecentItems { kind: ItemKind, order: ListOrder },
    Releases,
    RecentCommits,
    /// Issue, pull request and release totals plus disk usage
    Counts,
}

impl CollectStep {
    /// Document id the snapshot is stored under.
    #[must_use]
    pub const fn metric_name(&self) -> &'static str {
        match self {
            Self::CommitActivity => "commit_activity",
            Self::CodeFrequency => "code_frequency",
            Self::PunchCard => "punch_card",
            Self::Contributors => "contributors",
            Self::ScoringItems(ItemKind::Issue) => "issues",
            Self::ScoringItems(ItemKind::PullRequest) => "pull_requests",
            Self::RecentItems { kind: ItemKind::Issue, order: ListOrder::Created } => "recent_issues_created",
            Self::RecentItems { kind: ItemKind::Issue, order: ListOrder::Updated } => "recent_issues_updated",
            Self::RecentItems { kind: ItemKind::Issue, order: ListOrder::Comments } => "most_active_issues",
            Self::RecentItems { kind: ItemKind::PullRequest, order: ListOrder::Created } => "recent_prs_created",
            Self::RecentItems { kind: ItemKind::PullRequest, order: ListOrder::Updated } => "recent_prs_updated",
            Self::RecentItems { kind: ItemKind::PullRequest, order: ListOrder::Comments } => "most_active_prs",
            Self::Releases => "releases",
            Self::RecentCommits => "recent_commits",
            Self::Counts => "counts",
        }
    }

    /// Reject parameter combinations the hosting provider cannot serve.
    pub fn validate(&self) -> Result<()> {
        if let Self::RecentItems {
            kind: ItemKind::PullRequest,
            order: ListOrder::Comments,
        } = self
        {
            bail!("pull requests cannot be listed by comment count");
        }
        Ok(())
    }
}

/// The steps run for every repository, in order.
#[must_use]
pub fn default_steps() -> Vec<CollectStep> {
    vec![
        CollectStep::CommitActivity,
        CollectStep::CodeFrequency,
        CollectStep::PunchCard,
        CollectStep::Contributors,
        CollectStep::ScoringItems(ItemKind::Issue),
        CollectStep::ScoringItems(ItemKind::PullRequest),
        CollectStep::RecentItems {
            kind: ItemKind::Issue,
            order: ListOrder::Created,
        },
        CollectStep::RecentItems {
            kind: ItemKind::Issue,
            order: ListOrder::Updated,
        },
        CollectStep::RecentItems {
            kind: ItemKind::Issue,
            order: ListOrder::Comments,
        },
        CollectStep::RecentItems {
            kind: ItemKind::PullRequest,
            order: ListOrder::Created,
        },
        CollectStep::RecentItems {
            kind: ItemKind::PullRequest,
            order: ListOrder::Updated,
        },
        CollectStep::Releases,
        CollectStep::RecentCommits,
        CollectStep::Counts,
    ]
}
