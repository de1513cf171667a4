//! Per-repository metric collection.
//!
//! A [`Collector`] runs a fixed list of [`CollectStep`]s against one repository and
//! stores each result as a snapshot under `{protocol}-widgets/repositories/{owner#name}`.
//! Steps fail independently: an absent or failing metric is logged and the remaining
//! steps still run.

mod steps;
mod wire;

pub use steps::{CollectStep, ItemKind, ListOrder, default_steps};

use crate::actor::{Actor, ApiResult, Fetched};
use crate::model::{IssueItem, RepositoryRecord};
use crate::store::{DocumentStore, ProtocolCollections, write_snapshot};
use serde_json::{Value, json};

const LOG_TARGET: &str = " collector";

/// Size of every "recent items" list.
pub const RECENT_ITEMS: usize = 10;

/// Items requested per page for full listings.
const PER_PAGE: &str = "100";

const COUNTS_QUERY: &str = r"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    diskUsage
    openIssues: issues(states: OPEN) { totalCount }
    closedIssues: issues(states: CLOSED) { totalCount }
    openPullRequests: pullRequests(states: OPEN) { totalCount }
    closedPullRequests: pullRequests(states: CLOSED) { totalCount }
    mergedPullRequests: pullRequests(states: MERGED) { totalCount }
    releases { totalCount }
  }
}";

/// What happened to each step of one repository's collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub key: String,
    pub written: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

#[derive(Debug)]
pub struct Collector<'a> {
    rest: &'a Actor,
    graphql: &'a Actor,
    store: &'a dyn DocumentStore,
    steps: &'a [CollectStep],
    max_pages: u32,
}

/// State shared by the steps of one repository.
struct RepoContext<'r> {
    owner: &'r str,
    name: &'r str,
    key: String,

    // the issues listing feeds both issue and pull request scoring items
    issue_listing: Option<ApiResult<Vec<Value>>>,
}

impl<'a> Collector<'a> {
    #[must_use]
    pub fn new(rest: &'a Actor, graphql: &'a Actor, store: &'a dyn DocumentStore, steps: &'a [CollectStep], max_pages: u32) -> Self {
        Self {
            rest,
            graphql,
            store,
            steps,
            max_pages: max_pages.max(1),
        }
    }

    /// Collect every step for one repository.
    pub async fn collect_repository(&self, collections: &ProtocolCollections, record: &RepositoryRecord) -> CollectReport {
        let mut ctx = RepoContext {
            owner: &record.owner,
            name: &record.name,
            key: record.key(),
            issue_listing: None,
        };

        let collection = collections.repository(&ctx.key);
        let mut report = CollectReport {
            key: ctx.key.clone(),
            ..CollectReport::default()
        };

        for step in self.steps {
            let metric = step.metric_name();
            match self.fetch(*step, &mut ctx).await {
                ApiResult::Found(payload) => match write_snapshot(self.store, &collection, metric, &payload) {
                    Ok(true) => report.written.push(metric),
                    Ok(false) => {
                        log::debug!(target: LOG_TARGET, "No {metric} data for '{}'", ctx.key);
                        report.skipped.push(metric);
                    }
                    Err(e) => {
                        log::warn!(target: LOG_TARGET, "Could not store {metric} for '{}': {e:#}", ctx.key);
                        report.failed.push((metric, format!("{e:#}")));
                    }
                },
                ApiResult::Absent(reason) => {
                    log::debug!(target: LOG_TARGET, "Skipping {metric} for '{}': {reason}", ctx.key);
                    report.skipped.push(metric);
                }
                ApiResult::Error(e) => {
                    log::warn!(target: LOG_TARGET, "Could not collect {metric} for '{}': {e:#}", ctx.key);
                    report.failed.push((metric, format!("{e:#}")));
                }
            }
        }

        log::info!(
            target: LOG_TARGET,
            "Collected '{}': {} written, {} skipped, {} failed",
            report.key,
            report.written.len(),
            report.skipped.len(),
            report.failed.len()
        );

        report
    }

    async fn fetch(&self, step: CollectStep, ctx: &mut RepoContext<'_>) -> ApiResult<Value> {
        let repo = format!("repos/{}/{}", ctx.owner, ctx.name);

        match step {
            CollectStep::CommitActivity => self
                .single(&format!("{repo}/stats/commit_activity"), &[])
                .await
                .and_then(|payload| to_payload(wire::commit_activity(payload))),

            CollectStep::CodeFrequency => self
                .single(&format!("{repo}/stats/code_frequency"), &[])
                .await
                .and_then(|payload| to_payload(wire::code_frequency(&payload))),

            CollectStep::PunchCard => self
                .single(&format!("{repo}/stats/punch_card"), &[])
                .await
                .and_then(|payload| to_payload(wire::punch_card(&payload))),

            CollectStep::Contributors => self
                .single(&format!("{repo}/stats/contributors"), &[])
                .await
                .and_then(|payload| to_payload(wire::contributors(payload))),

            CollectStep::ScoringItems(kind) => {
                let listing = if let Some(listing) = &ctx.issue_listing {
                    listing.clone()
                } else {
                    let params = [("state", "all".to_string()), ("per_page", PER_PAGE.to_string())];
                    let listing = self.many(&format!("{repo}/issues"), &params).await;
                    ctx.issue_listing = Some(listing.clone());
                    listing
                };

                listing.and_then(|items| to_payload(Some(wire::issues(items, &ctx.key, kind == ItemKind::PullRequest))))
            }

            CollectStep::RecentItems { kind, order } => self.recent_items(&repo, &ctx.key, kind, order).await,

            CollectStep::Releases => self
                .many(&format!("{repo}/releases"), &[("per_page", PER_PAGE.to_string())])
                .await
                .and_then(|items| to_payload(Some(wire::releases(items, &ctx.key)))),

            CollectStep::RecentCommits => self
                .single(&format!("{repo}/commits"), &[("per_page", RECENT_ITEMS.to_string())])
                .await
                .and_then(|payload| {
                    let items = Fetched::Single(payload).into_items();
                    to_payload(Some(wire::commits(items, &ctx.key)))
                }),

            CollectStep::Counts => self
                .graphql
                .query(COUNTS_QUERY, &json!({ "owner": ctx.owner, "name": ctx.name }))
                .await
                .and_then(|data| to_payload(wire::counts(&data))),
        }
    }

    async fn recent_items(&self, repo: &str, key: &str, kind: ItemKind, order: ListOrder) -> ApiResult<Value> {
        let params = [
            ("state", "all".to_string()),
            ("sort", order.to_string()),
            ("direction", "desc".to_string()),
            // the issues listing interleaves pull requests, so over-fetch before filtering
            ("per_page", (RECENT_ITEMS * 3).to_string()),
        ];

        let items = match kind {
            ItemKind::Issue => self
                .single(&format!("{repo}/issues"), &params)
                .await
                .map(|payload| wire::issues(Fetched::Single(payload).into_items(), key, false)),
            ItemKind::PullRequest => self
                .single(&format!("{repo}/pulls"), &params)
                .await
                .map(|payload| wire::pull_requests(Fetched::Single(payload).into_items(), key)),
        };

        items.and_then(|mut items: Vec<IssueItem>| {
            items.truncate(RECENT_ITEMS);
            to_payload(Some(items))
        })
    }

    async fn single(&self, endpoint: &str, params: &[(&str, String)]) -> ApiResult<Value> {
        match self.rest.fetch_all(endpoint, params, 1).await {
            ApiResult::Found(fetched) => match fetched {
                Fetched::Single(value) => ApiResult::Found(value),
                Fetched::Many(items) => ApiResult::Found(Value::Array(items)),
            },
            ApiResult::Absent(reason) => ApiResult::Absent(reason),
            ApiResult::Error(e) => ApiResult::Error(e),
        }
    }

    async fn many(&self, endpoint: &str, params: &[(&str, String)]) -> ApiResult<Vec<Value>> {
        self.rest.fetch_all(endpoint, params, self.max_pages).await.map(Fetched::into_items)
    }
}

/// Serialize a converted payload, treating a failed conversion as malformed data.
fn to_payload<T: serde::Serialize>(converted: Option<T>) -> ApiResult<Value> {
    match converted.map(serde_json::to_value) {
        Some(Ok(value)) => ApiResult::Found(value),
        Some(Err(e)) => ApiResult::absent(format!("unserializable payload: {e}")),
        None => ApiResult::absent("malformed payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_payload_maps_conversion_failures_to_absent() {
        assert!(to_payload(Some(vec![1, 2])).is_found());
        assert!(matches!(to_payload::<Vec<u8>>(None), ApiResult::Absent(_)));
    }

    #[test]
    fn counts_query_aliases_match_wire_parser() {
        for alias in ["openIssues", "closedIssues", "openPullRequests", "closedPullRequests", "mergedPullRequests"] {
            assert!(COUNTS_QUERY.contains(alias), "{alias} missing from query");
        }
    }
}
