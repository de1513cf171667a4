//! GitHub repository metadata lookups.

use super::classify::Classification;
use super::{Actor, ApiResult};
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::Value;

const LOG_TARGET: &str = "    github";

/// Attempts made when checking a repository before giving up on it.
const MAX_VALIDITY_ATTEMPTS: u32 = 5;

/// Repository metadata as returned by `GET /repos/{owner}/{name}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[expect(clippy::struct_field_names, reason = "field names match GitHub API exactly")]
pub struct RepositoryDescription {
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<CompactString>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub subscribers_count: u64,
    #[serde(default)]
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub language: Option<CompactString>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
}

impl RepositoryDescription {
    /// GitHub reports a size of zero for repositories without any commits.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Actor {
    /// Look up a repository's metadata.
    ///
    /// Returns `None` when the repository does not exist or is unreachable. Only a
    /// not-ready or rate-limited response is waited out and retried, for at most five
    /// attempts. Every other failure, including a server error, ends the check at once.
    pub async fn check_repository_validity(&self, owner: &str, name: &str) -> Option<RepositoryDescription> {
        let url = self.url_for(&format!("repos/{owner}/{name}"));

        for attempt in 1..=MAX_VALIDITY_ATTEMPTS {
            let (response, classification) = match self.send_once(&|client: &reqwest::Client| client.get(&url)).await {
                Ok(sent) => sent,
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Repository {owner}/{name} is unreachable: {e:#}");
                    return None;
                }
            };

            match classification {
                Classification::Ready => {
                    return match response.json::<RepositoryDescription>().await {
                        Ok(description) => Some(description),
                        Err(e) => {
                            log::debug!(target: LOG_TARGET, "Unexpected metadata for {owner}/{name}: {e:#}");
                            None
                        }
                    };
                }
                Classification::NotReady => {
                    log::debug!(target: LOG_TARGET, "Attempt {attempt}/{MAX_VALIDITY_ATTEMPTS} for {owner}/{name}: not ready");
                    tokio::time::sleep(self.policy().not_ready_delay).await;
                }
                Classification::RateLimited { reset_at } => {
                    log::debug!(target: LOG_TARGET, "Attempt {attempt}/{MAX_VALIDITY_ATTEMPTS} for {owner}/{name}: rate limited");
                    self.pause_for_rate_limit(reset_at);
                }
                Classification::Empty | Classification::ClientError(_) | Classification::ServerError(_) => {
                    log::debug!(target: LOG_TARGET, "Repository {owner}/{name} is not accessible: {}", response.status());
                    return None;
                }
            }
        }

        log::warn!(target: LOG_TARGET, "Could not determine whether {owner}/{name} exists, treating it as invalid");
        None
    }

    /// Whether the repository exists and can be read with the current credentials.
    pub async fn is_repository_accessible(&self, owner: &str, name: &str) -> bool {
        self.check_repository_validity(owner, name).await.is_some()
    }

    /// Fetch a single numeric field from a GitHub REST response, such as a search `total_count`.
    pub async fn fetch_count(&self, endpoint: &str, params: &[(&str, String)], field: &str) -> ApiResult<u64> {
        self.fetch_page(endpoint, params).await.and_then(|page| {
            page.body
                .get(field)
                .and_then(Value::as_u64)
                .map_or_else(|| ApiResult::absent(format!("'{field}' missing from {endpoint}")), ApiResult::Found)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_repository_metadata() {
        let body = json!({
            "html_url": "https://github.com/acme/widget",
            "description": "A widget",
            "topics": ["defi", "wallet"],
            "stargazers_count": 120,
            "forks_count": 30,
            "subscribers_count": 7,
            "size": 2048,
            "created_at": "2021-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "pushed_at": "2024-01-02T00:00:00Z",
            "language": "Rust",
            "fork": false,
            "archived": false,
            "owner": {"login": "acme"}
        });

        let description: RepositoryDescription = serde_json::from_value(body).unwrap();
        assert_eq!(description.stargazers_count, 120);
        assert_eq!(description.topics.len(), 2);
        assert_eq!(description.language.as_deref(), Some("Rust"));
        assert!(!description.is_empty());
    }

    #[test]
    fn zero_size_is_empty() {
        let description: RepositoryDescription = serde_json::from_value(json!({
            "html_url": "https://github.com/acme/blank",
            "size": 0,
            "created_at": null,
            "updated_at": null,
            "pushed_at": null
        }))
        .unwrap();
        assert!(description.is_empty());
        assert!(description.topics.is_empty());
    }
}
