//! Conversion of GitHub payloads into snapshot types.
//!
//! Every function returns `None` when the payload does not have the expected shape, which
//! the collector treats the same as an absent resource.

use crate::model::{
    CodeFrequencyEntry, CommitItem, ContributorActivity, ContributorWeek, IssueItem, ItemState, PunchCardEntry, ReleaseItem,
    RepoCounts, WeeklyCommitActivity,
};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    html_url: String,
    state: ItemState,
    #[serde(default)]
    comments: u64,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    pull_request: Option<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    title: String,
    html_url: String,
    state: ItemState,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    name: Option<String>,
    html_url: String,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    draft: bool,
}

#[derive(Debug, Deserialize)]
struct Commit {
    sha: String,
    html_url: String,
    commit: CommitDetail,
    author: Option<Login>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitSignature>,
}

#[derive(Debug, Deserialize)]
struct CommitSignature {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Login {
    login: CompactString,
}

#[derive(Debug, Deserialize)]
struct Contributor {
    author: Option<Login>,
    total: u64,
    #[serde(default)]
    weeks: Vec<ContributorWeek>,
}

pub fn commit_activity(payload: Value) -> Option<Vec<WeeklyCommitActivity>> {
    serde_json::from_value(payload).ok()
}

/// `[[week, additions, deletions], ...]`, deletions reported as negative numbers.
pub fn code_frequency(payload: &Value) -> Option<Vec<CodeFrequencyEntry>> {
    payload
        .as_array()?
        .iter()
        .map(|row| {
            let row = row.as_array()?;
            let week = row.first()?.as_i64()?;
            let additions = row.get(1)?.as_i64()?;
            let deletions = row.get(2)?.as_i64()?;
            Some(CodeFrequencyEntry {
                date: DateTime::from_timestamp(week, 0)?.format("%Y-%m-%d").to_string(),
                additions: additions.unsigned_abs(),
                deletions: deletions.unsigned_abs(),
            })
        })
        .collect()
}

/// `[[day, hour, commits], ...]`
pub fn punch_card(payload: &Value) -> Option<Vec<PunchCardEntry>> {
    payload
        .as_array()?
        .iter()
        .map(|row| {
            let row = row.as_array()?;
            Some(PunchCardEntry {
                day: u8::try_from(row.first()?.as_u64()?).ok()?,
                hour: u8::try_from(row.get(1)?.as_u64()?).ok()?,
                commits: row.get(2)?.as_u64()?,
            })
        })
        .collect()
}

/// Contributors without a linked account are dropped.
pub fn contributors(payload: Value) -> Option<Vec<ContributorActivity>> {
    let contributors: Vec<Contributor> = serde_json::from_value(payload).ok()?;
    Some(
        contributors
            .into_iter()
            .filter_map(|c| {
                let mut weeks = c.weeks;
                weeks.sort_by_key(|w| w.w);
                Some(ContributorActivity {
                    login: c.author?.login,
                    total: c.total,
                    weeks,
                })
            })
            .collect(),
    )
}

/// Items of the issues listing that belong to `pull_requests` or not.
pub fn issues(items: Vec<Value>, repository: &str, pull_requests: bool) -> Vec<IssueItem> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Issue>(item).ok())
        .filter(|issue| issue.pull_request.is_some() == pull_requests)
        .map(|issue| IssueItem {
            number: issue.number,
            title: issue.title,
            html_url: issue.html_url,
            state: issue.state,
            comments: issue.comments,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            closed_at: issue.closed_at,
            is_pull_request: issue.pull_request.is_some(),
            repository: repository.to_string(),
        })
        .collect()
}

/// Items of the pulls listing, which carries no comment counts.
pub fn pull_requests(items: Vec<Value>, repository: &str) -> Vec<IssueItem> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<PullRequest>(item).ok())
        .map(|pr| IssueItem {
            number: pr.number,
            title: pr.title,
            html_url: pr.html_url,
            state: pr.state,
            comments: 0,
            created_at: pr.created_at,
            updated_at: pr.updated_at,
            closed_at: pr.closed_at,
            is_pull_request: true,
            repository: repository.to_string(),
        })
        .collect()
}

/// Published releases; drafts are skipped.
pub fn releases(items: Vec<Value>, repository: &str) -> Vec<ReleaseItem> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Release>(item).ok())
        .filter(|release| !release.draft)
        .map(|release| ReleaseItem {
            tag_name: release.tag_name,
            name: release.name,
            html_url: release.html_url,
            published_at: release.published_at,
            repository: repository.to_string(),
        })
        .collect()
}

pub fn commits(items: Vec<Value>, repository: &str) -> Vec<CommitItem> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Commit>(item).ok())
        .map(|commit| {
            let signature = commit.commit.author;
            CommitItem {
                sha: commit.sha,
                message: commit.commit.message,
                author: commit
                    .author
                    .map(|a| a.login.to_string())
                    .or_else(|| signature.as_ref().and_then(|s| s.name.clone())),
                html_url: commit.html_url,
                date: signature.and_then(|s| s.date),
                repository: repository.to_string(),
            }
        })
        .collect()
}

/// The `repository` object of the counts query.
pub fn counts(data: &Value) -> Option<RepoCounts> {
    let repo = data.get("repository")?;
    let total = |field: &str| repo.get(field).and_then(|f| f.get("totalCount")).and_then(Value::as_u64);

    Some(RepoCounts {
        open_issues: total("openIssues")?,
        closed_issues: total("closedIssues")?,
        open_prs: total("openPullRequests")?,
        closed_prs: total("closedPullRequests")?,
        merged_prs: total("mergedPullRequests")?,
        releases: total("releases")?,
        disk_usage_kb: repo.get("diskUsage").and_then(Value::as_u64).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn code_frequency_dates_weeks_and_flips_deletions() {
        let entries = code_frequency(&json!([[1_704_067_200, 120, -30], [1_704_672_000, 0, 0]])).unwrap();
        assert_eq!(
            entries[0],
            CodeFrequencyEntry {
                date: "2024-01-01".to_string(),
                additions: 120,
                deletions: 30
            }
        );
        assert_eq!(entries[1].date, "2024-01-08");
    }

    #[test]
    fn malformed_rows_reject_the_payload() {
        assert!(code_frequency(&json!([[1, 2]])).is_none());
        assert!(punch_card(&json!({"not": "a list"})).is_none());
        assert!(punch_card(&json!([[0, 300, 1]])).is_none());
    }

    #[test]
    fn punch_card_rows() {
        let entries = punch_card(&json!([[0, 0, 5], [6, 23, 1]])).unwrap();
        assert_eq!(entries[1], PunchCardEntry { day: 6, hour: 23, commits: 1 });
    }

    #[test]
    fn contributors_sorted_oldest_week_first_and_anonymous_dropped() {
        let list = contributors(json!([
            {"author": {"login": "alice"}, "total": 3, "weeks": [
                {"w": 200, "a": 1, "d": 0, "c": 1},
                {"w": 100, "a": 5, "d": 2, "c": 2}
            ]},
            {"author": null, "total": 9, "weeks": []}
        ]))
        .unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].login, "alice");
        assert_eq!(list[0].weeks[0].w, 100);
    }

    #[test]
    fn issues_listing_splits_pull_requests() {
        let items = vec![
            json!({"number": 1, "title": "bug", "html_url": "u1", "state": "open", "comments": 4,
                   "created_at": "2024-01-01T00:00:00Z", "updated_at": null, "closed_at": null}),
            json!({"number": 2, "title": "fix", "html_url": "u2", "state": "closed", "comments": 1,
                   "created_at": "2024-01-01T00:00:00Z", "updated_at": null, "closed_at": "2024-01-03T00:00:00Z",
                   "pull_request": {"merged_at": null}}),
        ];

        let only_issues = issues(items.clone(), "o#r", false);
        assert_eq!(only_issues.len(), 1);
        assert_eq!(only_issues[0].comments, 4);
        assert_eq!(only_issues[0].repository, "o#r");

        let only_prs = issues(items, "o#r", true);
        assert_eq!(only_prs.len(), 1);
        assert!(only_prs[0].is_closed());
        assert!(only_prs[0].is_pull_request);
    }

    #[test]
    fn release_drafts_are_skipped() {
        let list = releases(
            vec![
                json!({"tag_name": "v1", "name": "One", "html_url": "u", "published_at": "2024-01-01T00:00:00Z"}),
                json!({"tag_name": "v2", "name": null, "html_url": "u", "published_at": null, "draft": true}),
            ],
            "o#r",
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].tag_name, "v1");
    }

    #[test]
    fn commit_author_falls_back_to_signature_name() {
        let list = commits(
            vec![json!({
                "sha": "abc",
                "html_url": "u",
                "author": null,
                "commit": {"message": "init", "author": {"name": "Alice", "date": "2024-01-01T00:00:00Z"}}
            })],
            "o#r",
        );
        assert_eq!(list[0].author.as_deref(), Some("Alice"));
        assert!(list[0].date.is_some());
    }

    #[test]
    fn counts_from_graphql() {
        let data = json!({"repository": {
            "diskUsage": 1024,
            "openIssues": {"totalCount": 3},
            "closedIssues": {"totalCount": 7},
            "openPullRequests": {"totalCount": 1},
            "closedPullRequests": {"totalCount": 2},
            "mergedPullRequests": {"totalCount": 5},
            "releases": {"totalCount": 4}
        }});

        let counts = counts(&data).unwrap();
        assert_eq!(counts.closed_issues, 7);
        assert_eq!(counts.merged_prs, 5);
        assert_eq!(counts.disk_usage_kb, 1024);

        assert!(super::counts(&json!({"repository": null})).is_none());
    }
}
