//! The resilient API client.
//!
//! An [`Actor`] owns one HTTP client configured for a single provider, plus that
//! provider's shared [`RateBudget`]. All requests funnel through [`Actor::execute`],
//! which classifies each response and decides whether to return, wait or give up.

use super::classify::{Classification, classify, rate_limit_wait};
use super::pagination::{Cursor, Fetched, Page, extend_items, next_link};
use super::profile::{AuthScheme, ProviderKind, ProviderProfile, RetryPolicy};
use super::rate_budget::RateBudget;
use super::ApiResult;
use crate::Result;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, app_err};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use std::sync::Arc;

const LOG_TARGET: &str = "     actor";

/// Maximum number of GraphQL-level rate-limit retries for a single query.
const MAX_GRAPHQL_RATE_LIMIT_RETRIES: u32 = 5;

/// Resilient, paginated client for one upstream provider.
#[derive(Debug, Clone)]
pub struct Actor {
    kind: ProviderKind,
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
    budget: Arc<RateBudget>,
}

/// Query parameters for a REST request.
pub type Params<'a> = &'a [(&'a str, String)];

impl Actor {
    /// Create an actor for `profile`, optionally authenticated and pointed at a different base URL.
    pub fn new(profile: &ProviderProfile, credential: Option<&str>, base_url: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(credential) = credential.filter(|c| !c.is_empty()) {
            let (name, value) = match profile.auth {
                AuthScheme::Token => (AUTHORIZATION, format!("token {credential}")),
                AuthScheme::Bearer => (AUTHORIZATION, format!("Bearer {credential}")),
                AuthScheme::Header(header) => (
                    HeaderName::from_bytes(header.as_bytes()).into_app_err_with(|| format!("invalid {} auth header '{header}'", profile.kind))?,
                    credential.to_string(),
                ),
            };
            let mut value = HeaderValue::from_str(&value)?;
            value.set_sensitive(true);
            let _ = headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent("ecopulse")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            kind: profile.kind,
            client,
            base_url: base_url.unwrap_or(profile.base_url).trim_end_matches('/').to_string(),
            policy: profile.policy,
            budget: RateBudget::new(profile.base_url, profile.max_concurrent),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        self.kind
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolve an endpoint against the base URL. Absolute URLs pass through untouched.
    #[must_use]
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        }
    }

    /// Fetch a single REST page.
    pub async fn fetch_page(&self, endpoint: &str, params: Params<'_>) -> ApiResult<Page> {
        let url = self.url_for(endpoint);
        let response = match self.execute(&url, |client| client.get(&url).query(params)).await {
            ApiResult::Found(response) => response,
            ApiResult::Absent(reason) => return ApiResult::Absent(reason),
            ApiResult::Error(e) => return ApiResult::Error(e),
        };

        let next = next_link(response.headers());
        match response.json::<Value>().await {
            Ok(body) => ApiResult::Found(Page { body, next }),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Malformed {} response from '{url}': {e:#}", self.kind);
                ApiResult::absent(format!("malformed response from {url}"))
            }
        }
    }

    /// Fetch up to `max_pages` pages by following next links.
    ///
    /// With `max_pages == 1` the first page is returned as-is in [`Fetched::Single`].
    /// A failure after the first page keeps what was already fetched.
    pub async fn fetch_all(&self, endpoint: &str, params: Params<'_>, max_pages: u32) -> ApiResult<Fetched> {
        let first = match self.fetch_page(endpoint, params).await {
            ApiResult::Found(page) => page,
            ApiResult::Absent(reason) => return ApiResult::Absent(reason),
            ApiResult::Error(e) => return ApiResult::Error(e),
        };

        if max_pages <= 1 {
            return ApiResult::Found(Fetched::Single(first.body));
        }

        let mut items = Vec::new();
        extend_items(&mut items, first.body);

        let mut next = first.next;
        let mut pages = 1;
        while let Some(link) = next.take() {
            if pages >= max_pages {
                log::debug!(target: LOG_TARGET, "Reached page limit ({max_pages}) for '{endpoint}', stopping after {} items", items.len());
                break;
            }

            match self.fetch_page(&link, &[]).await {
                ApiResult::Found(page) => {
                    extend_items(&mut items, page.body);
                    next = page.next;
                    pages += 1;
                }
                ApiResult::Absent(reason) => {
                    log::warn!(target: LOG_TARGET, "Stopped paginating '{endpoint}' at page {}: {reason}", pages + 1);
                }
                ApiResult::Error(e) => {
                    log::warn!(target: LOG_TARGET, "Stopped paginating '{endpoint}' at page {}: {e:#}", pages + 1);
                }
            }
        }

        ApiResult::Found(Fetched::Many(items))
    }

    /// Fetch a raw text document, such as a manifest file.
    pub async fn fetch_text(&self, endpoint: &str) -> ApiResult<String> {
        let url = self.url_for(endpoint);
        let response = match self.execute(&url, |client| client.get(&url)).await {
            ApiResult::Found(response) => response,
            ApiResult::Absent(reason) => return ApiResult::Absent(reason),
            ApiResult::Error(e) => return ApiResult::Error(e),
        };

        match response.text().await {
            Ok(text) if text.trim().is_empty() => ApiResult::absent(format!("empty document at {url}")),
            Ok(text) => ApiResult::Found(text),
            Err(e) => ApiResult::error(app_err!("reading body of {url}: {e}")),
        }
    }

    /// Run a GraphQL query and return its `data` member.
    pub async fn query(&self, document: &str, variables: &Value) -> ApiResult<Value> {
        let url = self.base_url.clone();
        let body = json!({ "query": document, "variables": variables });

        let mut rate_limited = 0;
        loop {
            let response = match self.execute(&url, |client| client.post(&url).json(&body)).await {
                ApiResult::Found(response) => response,
                ApiResult::Absent(reason) => return ApiResult::Absent(reason),
                ApiResult::Error(e) => return ApiResult::Error(e),
            };

            let mut payload: Value = match response.json().await {
                Ok(payload) => payload,
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Malformed {} response: {e:#}", self.kind);
                    return ApiResult::absent("malformed GraphQL response");
                }
            };

            let errors = payload.get("errors").and_then(Value::as_array).cloned().unwrap_or_default();
            if errors.iter().any(is_rate_limit_error) {
                rate_limited += 1;
                if rate_limited > MAX_GRAPHQL_RATE_LIMIT_RETRIES {
                    return ApiResult::error(app_err!("{} still rate limited after {MAX_GRAPHQL_RATE_LIMIT_RETRIES} retries", self.kind));
                }
                log::warn!(target: LOG_TARGET, "{} query rate limited, waiting {}ms", self.kind, self.policy.rate_limit_delay.as_millis());
                let _ = self.budget.pause_for(self.policy.rate_limit_delay);
                continue;
            }

            let data = payload.get_mut("data").map(Value::take).unwrap_or(Value::Null);
            if data.is_null() {
                let message = errors
                    .first()
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("no data in GraphQL response");
                return ApiResult::absent(message);
            }

            if !errors.is_empty() {
                log::debug!(target: LOG_TARGET, "{} query returned partial data with {} error(s)", self.kind, errors.len());
            }

            return ApiResult::Found(data);
        }
    }

    /// Run a cursor-paginated GraphQL query and concatenate the `nodes` of the
    /// connection found at `connection` (a JSON pointer into `data`).
    ///
    /// The query must accept a `$cursor` variable.
    pub async fn query_all(&self, document: &str, variables: &Value, connection: &str, max_pages: u32) -> ApiResult<Vec<Value>> {
        let mut variables = variables.clone();
        let mut nodes = Vec::new();
        let mut pages = 0;

        loop {
            let data = match self.query(document, &variables).await {
                ApiResult::Found(data) => data,
                ApiResult::Absent(reason) if pages == 0 => return ApiResult::Absent(reason),
                ApiResult::Error(e) if pages == 0 => return ApiResult::Error(e),
                ApiResult::Absent(reason) => {
                    log::warn!(target: LOG_TARGET, "Stopped paginating {} connection '{connection}': {reason}", self.kind);
                    break;
                }
                ApiResult::Error(e) => {
                    log::warn!(target: LOG_TARGET, "Stopped paginating {} connection '{connection}': {e:#}", self.kind);
                    break;
                }
            };
            pages += 1;

            let Some(conn) = data.pointer(connection) else {
                if pages == 1 {
                    return ApiResult::absent(format!("connection '{connection}' missing from response"));
                }
                break;
            };

            if let Some(page_nodes) = conn.get("nodes").and_then(Value::as_array) {
                nodes.extend(page_nodes.iter().cloned());
            }

            let cursor = Cursor::from_connection(conn);
            match cursor.next() {
                Some(next) if pages < max_pages => variables["cursor"] = Value::String(next.to_string()),
                _ => break,
            }
        }

        ApiResult::Found(nodes)
    }

    /// Issue a request, classifying every response and retrying within the policy's bounds.
    async fn execute<F>(&self, url: &str, build: F) -> ApiResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut not_ready = 0;
        let mut rate_limited = 0;
        let mut server_retries = 0;

        loop {
            let (response, classification) = match self.send_once(&build).await {
                Ok(sent) => sent,
                Err(e) => {
                    server_retries += 1;
                    if server_retries > self.policy.max_server_retries {
                        log::warn!(target: LOG_TARGET, "Giving up on '{url}' after {} retries: {e:#}", self.policy.max_server_retries);
                        return ApiResult::error(app_err!("request to {url} failed: {e}"));
                    }
                    let delay = self.policy.server_backoff(server_retries);
                    log::debug!(target: LOG_TARGET, "Transport error for '{url}', retry {server_retries} in {}ms: {e:#}", delay.as_millis());
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            match classification {
                Classification::Ready => return ApiResult::Found(response),

                Classification::Empty => return ApiResult::absent(format!("no content at {url}")),

                Classification::ClientError(status) => {
                    log::debug!(target: LOG_TARGET, "{} returned {status} for '{url}'", self.kind);
                    return ApiResult::absent(status.to_string());
                }

                Classification::NotReady => {
                    not_ready += 1;
                    if not_ready >= self.policy.max_not_ready_attempts {
                        log::warn!(target: LOG_TARGET, "'{url}' was still not ready after {not_ready} attempts");
                        return ApiResult::error(app_err!("{url} not ready after {not_ready} attempts"));
                    }
                    log::debug!(target: LOG_TARGET, "'{url}' not ready yet, retrying in {}ms", self.policy.not_ready_delay.as_millis());
                    tokio::time::sleep(self.policy.not_ready_delay).await;
                }

                Classification::RateLimited { reset_at } => {
                    rate_limited += 1;
                    if rate_limited > self.policy.max_rate_limit_attempts {
                        log::warn!(target: LOG_TARGET, "Giving up on '{url}' after {rate_limited} rate-limited attempts");
                        return ApiResult::error(app_err!("{} rate limit persisted for {url}", self.kind));
                    }

                    self.pause_for_rate_limit(reset_at);
                }

                Classification::ServerError(status) => {
                    server_retries += 1;
                    if server_retries > self.policy.max_server_retries {
                        log::warn!(target: LOG_TARGET, "Giving up on '{url}' after {} retries: {status}", self.policy.max_server_retries);
                        return ApiResult::error(app_err!("{} returned {status} for {url}", self.kind));
                    }
                    let delay = self.policy.server_backoff(server_retries);
                    log::debug!(target: LOG_TARGET, "{status} from '{url}', retry {server_retries} in {}ms", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Send one request inside the provider's budget and classify the response.
    pub(super) async fn send_once<F>(&self, build: &F) -> reqwest::Result<(reqwest::Response, Classification)>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let permit = self.budget.acquire().await;
        let sent = build(&self.client).timeout(self.policy.request_timeout).send().await;
        drop(permit);

        let response = sent?;
        let classification = classify(response.status(), response.headers(), Utc::now());
        Ok((response, classification))
    }

    /// Park every worker on this provider until the rate-limit window reopens.
    pub(super) fn pause_for_rate_limit(&self, reset_at: Option<DateTime<Utc>>) {
        let wait = reset_at
            .map_or(self.policy.rate_limit_delay, |reset_at| rate_limit_wait(reset_at, Utc::now()))
            .min(self.policy.max_rate_limit_wait);

        if self.budget.pause_for(wait) {
            log::warn!(target: LOG_TARGET, "Hit {} rate limit, pausing requests for {}s", self.kind, wait.as_secs());
        }
    }
}

fn is_rate_limit_error(error: &Value) -> bool {
    error.get("type").and_then(Value::as_str) == Some("RATE_LIMITED")
        || error
            .get("extensions")
            .and_then(|x| x.get("code"))
            .and_then(Value::as_str)
            .is_some_and(|code| code.eq_ignore_ascii_case("RATE_LIMITED"))
}
