//! Protocol-level snapshots from providers other than the code host.
//!
//! Each integration is a fixed table of [`IntegrationMetric`]s. A table only runs when the
//! protocol configures the integration, and every metric is written independently of the
//! others through [`write_snapshot`], so a failing or empty metric never blocks the rest.

mod asset;
mod developers;
mod forum;
mod governance;

pub use asset::asset_metrics;
pub use developers::developer_metrics;
pub use forum::forum_metrics;
pub use governance::governance_metrics;

use crate::actor::{Actor, ApiResult, Fetched};
use crate::store::{DocumentStore, write_snapshot};
use serde_json::Value;

const LOG_TARGET: &str = " integrate";

/// How a metric is fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// A REST endpoint, following `Link` pagination up to `max_pages`.
    Rest {
        endpoint: String,
        params: Vec<(&'static str, String)>,
        max_pages: u32,
    },

    /// A GraphQL query. With a `connection` pointer the query is cursor-paginated and the
    /// connection's nodes are concatenated.
    Graph {
        document: &'static str,
        variables: Value,
        connection: Option<&'static str>,
        max_pages: u32,
    },
}

/// One snapshot produced by an integration.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationMetric {
    pub name: &'static str,
    pub request: Request,

    /// JSON pointer selecting the stored part of the response.
    pub pointer: Option<&'static str>,
}

impl IntegrationMetric {
    fn rest(name: &'static str, endpoint: impl Into<String>) -> Self {
        Self {
            name,
            request: Request::Rest {
                endpoint: endpoint.into(),
                params: Vec::new(),
                max_pages: 1,
            },
            pointer: None,
        }
    }

    fn graph(name: &'static str, document: &'static str, variables: Value) -> Self {
        Self {
            name,
            request: Request::Graph {
                document,
                variables,
                connection: None,
                max_pages: 1,
            },
            pointer: None,
        }
    }

    fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        if let Request::Rest { params, .. } = &mut self.request {
            params.push((key, value.into()));
        }
        self
    }

    fn pages(mut self, pages: u32) -> Self {
        match &mut self.request {
            Request::Rest { max_pages, .. } | Request::Graph { max_pages, .. } => *max_pages = pages,
        }
        self
    }

    fn connection(mut self, pointer: &'static str) -> Self {
        if let Request::Graph { connection, .. } = &mut self.request {
            *connection = Some(pointer);
        }
        self
    }

    fn select(mut self, pointer: &'static str) -> Self {
        self.pointer = Some(pointer);
        self
    }
}

/// What happened to each metric of one integration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrationReport {
    pub collection: String,
    pub written: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

/// Fetch every metric of a table with `actor` and store it under `collection`.
pub async fn collect(actor: &Actor, store: &dyn DocumentStore, collection: &str, metrics: &[IntegrationMetric]) -> IntegrationReport {
    let mut report = IntegrationReport {
        collection: collection.to_string(),
        ..IntegrationReport::default()
    };

    for metric in metrics {
        let fetched = fetch(actor, &metric.request).await.and_then(|value| extract(value, metric.pointer));

        match fetched {
            ApiResult::Found(value) => match write_snapshot(store, collection, metric.name, &value) {
                Ok(true) => report.written.push(metric.name),
                Ok(false) => report.skipped.push(metric.name),
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not store {collection}/{}: {e:#}", metric.name);
                    report.failed.push((metric.name, format!("{e:#}")));
                }
            },
            ApiResult::Absent(reason) => {
                log::debug!(target: LOG_TARGET, "Skipping {collection}/{}: {reason}", metric.name);
                report.skipped.push(metric.name);
            }
            ApiResult::Error(e) => {
                log::warn!(target: LOG_TARGET, "Could not collect {collection}/{}: {e:#}", metric.name);
                report.failed.push((metric.name, format!("{e:#}")));
            }
        }
    }

    log::info!(
        target: LOG_TARGET,
        "Collected '{collection}': {} written, {} skipped, {} failed",
        report.written.len(),
        report.skipped.len(),
        report.failed.len()
    );

    report
}

async fn fetch(actor: &Actor, request: &Request) -> ApiResult<Value> {
    match request {
        Request::Rest {
            endpoint,
            params,
            max_pages,
        } => actor.fetch_all(endpoint, params, *max_pages).await.map(|fetched| match fetched {
            Fetched::Single(value) => value,
            Fetched::Many(items) => Value::Array(items),
        }),

        Request::Graph {
            document,
            variables,
            connection: Some(connection),
            max_pages,
        } => actor.query_all(document, variables, connection, *max_pages).await.map(Value::Array),

        Request::Graph {
            document,
            variables,
            connection: None,
            ..
        } => actor.query(document, variables).await,
    }
}

fn extract(value: Value, pointer: Option<&str>) -> ApiResult<Value> {
    match pointer {
        None => ApiResult::Found(value),
        Some(pointer) => value
            .pointer(pointer)
            .cloned()
            .map_or_else(|| ApiResult::absent(format!("'{pointer}' missing from response")), ApiResult::Found),
    }
}
