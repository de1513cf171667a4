//! Ecosystem manifest files.

use crate::actor::{Actor, ApiResult};
use futures_util::future::BoxFuture;
use serde::Deserialize;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "  manifest";

const MANIFEST_SUFFIX: &str = ".toml";

/// A parsed ecosystem manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub repo: Vec<ManifestRepo>,
    #[serde(default)]
    pub sub_ecosystems: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestRepo {
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Manifest {
    pub fn parse(text: &str) -> crate::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Turn an ecosystem name into the manifest file name used upstream.
///
/// `"Flow Foundation, Inc."` becomes `"flow-foundation-inc.toml"`. Names that already
/// carry the manifest suffix are normalized on their stem, so the function is idempotent.
#[must_use]
pub fn normalize_manifest_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stem = lowered.strip_suffix(MANIFEST_SUFFIX).unwrap_or(&lowered);

    let hyphenated = stem.replace([' ', ',', '@', '(', ')'], "-");
    let rejoined = hyphenated
        .split('-')
        .map(|segment| segment.trim_matches('-'))
        .collect::<Vec<_>>()
        .join("-");

    let mut normalized = String::with_capacity(rejoined.len() + MANIFEST_SUFFIX.len());
    for c in rejoined.chars() {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            continue;
        }
        if c == '-' && normalized.ends_with('-') {
            continue;
        }
        normalized.push(c);
    }

    normalized.push_str(MANIFEST_SUFFIX);
    normalized
}

/// Sharded location of a normalized manifest: `{first_char}/{name}`.
#[must_use]
pub fn manifest_path(normalized: &str) -> Option<String> {
    let stem = normalized.strip_suffix(MANIFEST_SUFFIX).unwrap_or(normalized);
    let first = stem.chars().next()?;
    Some(format!("{first}/{normalized}"))
}

/// Where manifest text comes from.
pub trait ManifestSource: Send + Sync {
    /// Fetch the raw manifest at a sharded path, or `None` if it is unavailable.
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Option<String>>;
}

impl ManifestSource for Actor {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            match self.fetch_text(path).await {
                ApiResult::Found(text) => Some(text),
                ApiResult::Absent(reason) => {
                    log::warn!(target: LOG_TARGET, "Manifest '{path}' is unavailable: {reason}");
                    None
                }
                ApiResult::Error(e) => {
                    log::warn!(target: LOG_TARGET, "Could not fetch manifest '{path}': {e:#}");
                    None
                }
            }
        })
    }
}

/// Manifests held in memory, keyed by sharded path.
impl ManifestSource for BTreeMap<String, String> {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move { self.get(path).cloned() })
    }
}
