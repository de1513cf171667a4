//! Run configuration.
//!
//! Configuration lives in a TOML file with a `[settings]` table and one `[[protocol]]`
//! table per tracked ecosystem. A commented default is embedded in the binary and can
//! be written out with `ecopulse init`.

use crate::Result;
use crate::actor::RetryPolicy;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{EnrichableExt, IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../default_config.toml");

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "ecopulse.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub protocol: Vec<ProtocolConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Repositories collected at the same time
    #[serde(default = "default_collect_concurrency")]
    pub collect_concurrency: usize,

    /// Upper bound on pages fetched for any paginated list
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Where ecosystem manifests are fetched from
    #[serde(default = "default_manifest_base_url")]
    pub manifest_base_url: String,

    #[serde(default)]
    pub endpoints: EndpointOverrides,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// Base URLs that replace a provider's default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_rest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_graphql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_report: Option<String>,
}

/// Bounds on the retry loops of every provider.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSettings {
    /// Longest single wait for a rate-limit window to reopen
    #[serde(default = "default_max_wait", with = "humantime_serde")]
    pub max_wait: Duration,

    #[serde(default = "default_max_not_ready_attempts")]
    pub max_not_ready_attempts: u32,

    #[serde(default = "default_max_rate_limit_attempts")]
    pub max_rate_limit_attempts: u32,

    #[serde(default = "default_max_server_retries")]
    pub max_server_retries: u32,
}

impl RateLimitSettings {
    /// Apply these bounds to a provider's policy, keeping its delays.
    #[must_use]
    pub const fn apply(&self, policy: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_rate_limit_wait: self.max_wait,
            max_not_ready_attempts: self.max_not_ready_attempts,
            max_rate_limit_attempts: self.max_rate_limit_attempts,
            max_server_retries: self.max_server_retries,
            ..policy
        }
    }
}

/// A tracked ecosystem.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Identifier used in every collection name
    pub name: String,

    /// Ecosystem names whose manifests list the protocol's repositories
    pub manifests: Vec<String>,

    #[serde(default)]
    pub include_sub_ecosystems: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forum: Option<ForumConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance: Option<GovernanceConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_report: Option<DeveloperReportConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<AdapterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForumConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceConfig {
    /// CAIP-2 chain id, e.g. `eip155:1`
    pub chain_id: String,
    pub organization: String,
    #[serde(default)]
    pub governor_ids: Vec<String>,
    /// Treasury safe addresses
    #[serde(default)]
    pub safes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssetConfig {
    /// Asset slug or symbol known to the asset-data provider
    pub key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeveloperReportConfig {
    pub ecosystem: String,
}

/// Per-protocol hook applied to crawled repositories.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterConfig {
    /// Tag repositories whose URL appears in `urls`
    CuratedList { tag: String, urls: Vec<String> },
}

const fn default_collect_concurrency() -> usize {
    8
}

const fn default_max_pages() -> u32 {
    10
}

fn default_manifest_base_url() -> String {
    "https://raw.githubusercontent.com/electric-capital/crypto-ecosystems/master/data/ecosystems".to_string()
}

const fn default_max_wait() -> Duration {
    Duration::from_secs(3600)
}

const fn default_max_not_ready_attempts() -> u32 {
    30
}

const fn default_max_rate_limit_attempts() -> u32 {
    10
}

const fn default_max_server_retries() -> u32 {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collect_concurrency: default_collect_concurrency(),
            max_pages: default_max_pages(),
            manifest_base_url: default_manifest_base_url(),
            endpoints: EndpointOverrides::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_wait: default_max_wait(),
            max_not_ready_attempts: default_max_not_ready_attempts(),
            max_rate_limit_attempts: default_max_rate_limit_attempts(),
            max_server_retries: default_max_server_retries(),
        }
    }
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `ecopulse.toml` in `base_dir` is used when it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or fails validation
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading ecopulse configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading ecopulse configuration file '{path}'")),
            }
        };

        Self::parse(&text).map_err(|e| e.enrich_with(|| format!("loading configuration file '{final_path}'")))
    }

    /// Parse and validate configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// The protocols selected by name, or all of them when `names` is empty.
    pub fn select_protocols(&self, names: &[String]) -> Result<Vec<&ProtocolConfig>> {
        if names.is_empty() {
            return Ok(self.protocol.iter().collect());
        }

        names
            .iter()
            .map(|name| {
                self.protocol
                    .iter()
                    .find(|p| &p.name == name)
                    .ok_or_else(|| app_err!("no protocol named '{name}' in the configuration"))
            })
            .collect()
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a setting is out of range or a protocol is malformed
    pub fn validate(&self) -> Result<()> {
        if self.settings.collect_concurrency == 0 {
            return Err(app_err!("collect_concurrency must be at least 1"));
        }

        if self.settings.max_pages == 0 {
            return Err(app_err!("max_pages must be at least 1"));
        }

        if self.settings.manifest_base_url.trim().is_empty() {
            return Err(app_err!("manifest_base_url must not be empty"));
        }

        let mut seen = HashSet::new();
        for protocol in &self.protocol {
            protocol.validate()?;

            if !seen.insert(protocol.name.as_str()) {
                return Err(app_err!("protocol '{}' is defined more than once", protocol.name));
            }
        }

        Ok(())
    }
}

impl ProtocolConfig {
    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(app_err!("protocol name must not be empty"));
        }

        if !self.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(app_err!(
                "protocol name '{}' may only contain ASCII letters, digits, '-' and '_'",
                self.name
            ));
        }

        if self.manifests.is_empty() {
            return Err(app_err!("protocol '{}' must list at least one manifest", self.name));
        }

        if let Some(governance) = &self.governance
            && governance.organization.is_empty()
        {
            return Err(app_err!("protocol '{}' has an empty governance organization", self.name));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
