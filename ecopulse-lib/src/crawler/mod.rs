//! Ecosystem crawling.
//!
//! The crawler turns a protocol's manifests into persisted [`RepositoryRecord`]s:
//!
//! 1. Resolve the manifest tree into a set of repository URLs.
//! 2. Check every URL against the hosting provider and build its record.
//! 3. Run the protocol's [`Adapter`], if any, over the valid records.
//! 4. Sort by stars and merge the records into `{protocol}-projects`.

mod adapter;
mod manifest;
mod resolve;

pub use adapter::{Adapter, CuratedListAdapter, build_adapter};
pub use manifest::{Manifest, ManifestRepo, ManifestSource, manifest_path, normalize_manifest_name};
pub use resolve::{MAX_MANIFEST_DEPTH, resolve_all, resolve_manifest};

use crate::Result;
use crate::actor::Actor;
use crate::config::ProtocolConfig;
use crate::model::{RepoSpec, RepositoryRecord};
use crate::store::{DocumentStore, ProtocolCollections};
use core::cmp::Reverse;
use core::fmt::{Debug, Formatter};
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::{BTreeSet, HashSet};

const LOG_TARGET: &str = "   crawler";

const GITHUB_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

pub struct Crawler<'a> {
    hosting: &'a Actor,
    manifests: &'a dyn ManifestSource,
    store: &'a dyn DocumentStore,
    concurrency: usize,
}

impl Debug for Crawler<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Crawler")
            .field("hosting", &self.hosting)
            .field("manifests", &"<manifests>")
            .field("store", &self.store)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl<'a> Crawler<'a> {
    #[must_use]
    pub fn new(hosting: &'a Actor, manifests: &'a dyn ManifestSource, store: &'a dyn DocumentStore, concurrency: usize) -> Self {
        Self {
            hosting,
            manifests,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// The de-duplicated URLs listed by the protocol's manifest tree.
    pub async fn resolve_repositories(&self, protocol: &ProtocolConfig) -> BTreeSet<String> {
        let urls = resolve_all(self.manifests, &protocol.manifests, protocol.include_sub_ecosystems).await;
        log::info!(target: LOG_TARGET, "Resolved {} repositories for protocol '{}'", urls.len(), protocol.name);
        urls
    }

    /// Resolve, validate, adapt and persist the protocol's repositories.
    ///
    /// Records come back sorted by stars, most starred first.
    pub async fn run(&self, protocol: &ProtocolConfig, adapter: Option<&dyn Adapter>) -> Result<Vec<RepositoryRecord>> {
        let urls = self.resolve_repositories(protocol).await;

        let candidates = dedupe_by_key(urls);

        let mut records: Vec<RepositoryRecord> = stream::iter(candidates)
            .map(|(url, spec)| self.check(url, spec))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        if let Some(adapter) = adapter {
            for record in records.iter_mut().filter(|r| r.valid) {
                adapter.adapt(record);
            }
        }

        sort_by_stars(&mut records);

        let collections = ProtocolCollections::new(&protocol.name);
        let projects = collections.projects();
        for record in &records {
            self.store.merge_document(&projects, &record.key(), &serde_json::to_value(record)?)?;
        }

        let valid = records.iter().filter(|r| r.valid).count();
        log::info!(
            target: LOG_TARGET,
            "Persisted {} repositories for protocol '{}' ({valid} valid, {} invalid)",
            records.len(),
            protocol.name,
            records.len() - valid
        );

        Ok(records)
    }

    async fn check(&self, url: String, spec: Option<RepoSpec>) -> RepositoryRecord {
        let Some(spec) = spec else {
            return RepositoryRecord::unparsable(&url);
        };

        if !GITHUB_HOSTS.contains(&spec.host()) {
            log::debug!(target: LOG_TARGET, "Repository '{url}' is not hosted on GitHub, marking it invalid");
            return RepositoryRecord::inaccessible(&url, spec.owner(), spec.name());
        }

        match self.hosting.check_repository_validity(spec.owner(), spec.name()).await {
            Some(description) => {
                let record = RepositoryRecord::from_description(&spec, description);
                if !record.valid {
                    log::debug!(target: LOG_TARGET, "Repository '{}' is archived, a fork or empty", record.key());
                }
                record
            }
            None => RepositoryRecord::inaccessible(&url, spec.owner(), spec.name()),
        }
    }
}

/// Pair every URL with its parsed form, keeping only the first URL of each `owner#name`.
///
/// URLs that do not parse are kept so they can be recorded as invalid.
fn dedupe_by_key(urls: BTreeSet<String>) -> Vec<(String, Option<RepoSpec>)> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter_map(|url| match RepoSpec::parse(&url) {
            Ok(spec) => {
                if seen.insert(spec.key()) {
                    Some((url, Some(spec)))
                } else {
                    log::debug!(target: LOG_TARGET, "'{url}' names an already listed repository, skipping it");
                    None
                }
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Repository URL '{url}' cannot be parsed, recording it as invalid: {e:#}");
                Some((url, None))
            }
        })
        .collect()
}

/// Most starred first; ties by key so the order is stable across runs.
pub fn sort_by_stars(records: &mut [RepositoryRecord]) {
    records.sort_by_cached_key(|r| (Reverse(r.stars.unwrap_or(0)), r.key()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owner: &str, stars: Option<u64>) -> RepositoryRecord {
        RepositoryRecord {
            stars,
            ..RepositoryRecord::inaccessible("https://github.com/x/y", owner, "repo")
        }
    }

    #[test]
    fn duplicate_repositories_are_checked_once() {
        let urls = BTreeSet::from([
            "https://github.com/acme/widget".to_string(),
            "https://github.com/acme/widget/tree/main/contracts".to_string(),
            "https://github.com/acme/widget.git".to_string(),
            "https://github.com/acme/gadget".to_string(),
            "not a url".to_string(),
        ]);

        let candidates = dedupe_by_key(urls);
        let keys: Vec<_> = candidates.iter().map(|(url, spec)| (url.as_str(), spec.as_ref().map(RepoSpec::key))).collect();
        assert_eq!(
            keys,
            vec![
                ("https://github.com/acme/gadget", Some("acme#gadget".to_string())),
                ("https://github.com/acme/widget", Some("acme#widget".to_string())),
                ("not a url", None),
            ]
        );
    }

    #[test]
    fn sorts_by_stars_descending_then_key() {
        let mut records = vec![record("b", Some(5)), record("c", None), record("a", Some(5)), record("d", Some(50))];
        sort_by_stars(&mut records);

        let owners: Vec<_> = records.iter().map(|r| r.owner.as_str()).collect();
        assert_eq!(owners, vec!["d", "a", "b", "c"]);
    }
}
