use crate::config::AdapterConfig;
use crate::model::{RepoSpec, RepositoryRecord};
use compact_str::CompactString;
use std::collections::HashSet;
use std::sync::Mutex;

/// A protocol-specific hook that may amend a record before it is persisted.
pub trait Adapter: Send + Sync {
    fn adapt(&self, record: &mut RepositoryRecord);
}

/// Tags records whose URL appears in a curated list.
///
/// Listed URLs are compared in their canonical `scheme://host/owner/name` form, the same
/// form a crawled record carries. Matched URLs are removed from the list, so each URL is
/// tagged at most once per run even when several records share it.
#[derive(Debug)]
pub struct CuratedListAdapter {
    tag: CompactString,
    urls: Mutex<HashSet<String>>,
}

impl CuratedListAdapter {
    #[must_use]
    pub fn new(tag: impl Into<CompactString>, urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            tag: tag.into(),
            urls: Mutex::new(urls.into_iter().map(|url| canonical(&url).unwrap_or(url)).collect()),
        }
    }

    /// URLs not matched yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.urls.lock().expect("lock not poisoned").len()
    }
}

impl Adapter for CuratedListAdapter {
    fn adapt(&self, record: &mut RepositoryRecord) {
        if self.urls.lock().expect("lock not poisoned").remove(&record.url) && !record.categories.contains(&self.tag) {
            record.categories.push(self.tag.clone());
        }
    }
}

fn canonical(url: &str) -> Option<String> {
    RepoSpec::parse(url).ok().map(|spec| spec.url().to_string())
}

/// Instantiate the adapter a protocol configures.
#[must_use]
pub fn build_adapter(config: &AdapterConfig) -> Box<dyn Adapter> {
    match config {
        AdapterConfig::CuratedList { tag, urls } => Box::new(CuratedListAdapter::new(tag.as_str(), urls.iter().cloned())),
    }
}
