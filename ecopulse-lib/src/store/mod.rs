//! Document store abstraction.
//!
//! The pipeline persists everything as JSON documents grouped in hierarchical
//! collections. Metric documents are always wrapped as `{"data": <payload>}` and are
//! never written empty, so readers can tell "no data yet" apart from "empty data".

mod file_store;
mod memory_store;
mod path_utils;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use crate::Result;
use crate::model::{RepositoryRecord, Snapshot};
use core::fmt::Debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Persistent storage for pipeline documents.
pub trait DocumentStore: Send + Sync + Debug {
    /// Replace a document.
    fn put_document(&self, collection: &str, id: &str, value: &Value) -> Result<()>;

    /// Shallow-merge an object into a document, creating it if needed.
    ///
    /// Top-level fields of `value` that are `null` leave the stored value untouched.
    fn merge_document(&self, collection: &str, id: &str, value: &Value) -> Result<()>;

    /// Read a document, returning `None` if it does not exist.
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// The ids of every document in a collection, sorted.
    fn list_documents(&self, collection: &str) -> Result<Vec<String>>;

    /// Remove a document. Returns `false` if there was nothing to remove.
    fn delete_document(&self, collection: &str, id: &str) -> Result<bool>;
}

/// Whether a payload carries no data worth storing.
#[must_use]
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Write a metric snapshot as `{"data": payload}`.
///
/// Returns `Ok(false)` without touching the store when the payload is empty.
pub fn write_snapshot<T: Serialize + ?Sized>(store: &dyn DocumentStore, collection: &str, id: &str, payload: &T) -> Result<bool> {
    let data = serde_json::to_value(payload)?;
    if is_empty_payload(&data) {
        return Ok(false);
    }

    store.put_document(collection, id, &serde_json::to_value(Snapshot { data })?)?;
    Ok(true)
}

/// Write a snapshot that is fully recomputed every run.
///
/// An empty payload removes whatever an earlier run stored under `id`, so a rollup that
/// has nothing left to report does not keep serving stale numbers.
pub fn replace_snapshot<T: Serialize + ?Sized>(store: &dyn DocumentStore, collection: &str, id: &str, payload: &T) -> Result<bool> {
    if write_snapshot(store, collection, id, payload)? {
        return Ok(true);
    }

    let _ = store.delete_document(collection, id)?;
    Ok(false)
}

/// Read a metric snapshot's `data` member.
///
/// A missing document, a document without `data`, or one whose payload does not
/// decode as `T` all yield `None`.
pub fn read_snapshot<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str, id: &str) -> Result<Option<T>> {
    let Some(mut document) = store.get_document(collection, id)? else {
        return Ok(None);
    };

    let Some(data) = document.get_mut("data").map(Value::take) else {
        return Ok(None);
    };

    Ok(serde_json::from_value(data).ok())
}

/// Every repository record persisted for a protocol, in key order.
///
/// Documents that no longer decode as a record are skipped.
pub fn read_records(store: &dyn DocumentStore, collections: &ProtocolCollections) -> Result<Vec<RepositoryRecord>> {
    let projects = collections.projects();
    let mut records = Vec::new();
    for id in store.list_documents(&projects)? {
        if let Some(document) = store.get_document(&projects, &id)?
            && let Ok(record) = serde_json::from_value::<RepositoryRecord>(document)
        {
            records.push(record);
        }
    }
    Ok(records)
}

/// Shallow merge of `patch` into `target`, skipping `null` fields of the patch.
pub(crate) fn merge_into(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        if !patch.is_null() {
            *target = patch.clone();
        }
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if !value.is_null() {
                let _ = target_fields.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Collection names for one protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolCollections {
    protocol: String,
}

impl ProtocolCollections {
    #[must_use]
    pub fn new(protocol: impl Into<String>) -> Self {
        Self { protocol: protocol.into() }
    }

    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Repository records, keyed by `owner#name`.
    #[must_use]
    pub fn projects(&self) -> String {
        format!("{}-projects", self.protocol)
    }

    /// Metric snapshots of one repository.
    #[must_use]
    pub fn repository(&self, key: &str) -> String {
        format!("{}-widgets/repositories/{key}", self.protocol)
    }

    #[must_use]
    pub fn cumulative(&self) -> String {
        format!("{}-cumulative", self.protocol)
    }

    #[must_use]
    pub fn leaderboard(&self) -> String {
        format!("{}-leaderboard", self.protocol)
    }

    #[must_use]
    pub fn forum(&self) -> String {
        format!("{}-discourse", self.protocol)
    }

    #[must_use]
    pub fn developers(&self) -> String {
        format!("{}-developers", self.protocol)
    }

    #[must_use]
    pub fn governance(&self) -> String {
        format!("{}-governance", self.protocol)
    }

    #[must_use]
    pub fn asset(&self) -> String {
        format!("{}-messari", self.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_payloads() {
        assert!(is_empty_payload(&Value::Null));
        assert!(is_empty_payload(&json!([])));
        assert!(is_empty_payload(&json!({})));
        assert!(!is_empty_payload(&json!(0)));
        assert!(!is_empty_payload(&json!([0])));
        assert!(!is_empty_payload(&json!({"a": null})));
    }

    #[test]
    fn write_snapshot_wraps_payload() {
        let store = MemoryStore::new();
        assert!(write_snapshot(&store, "c", "m", &vec![1, 2, 3]).unwrap());
        assert_eq!(store.get_document("c", "m").unwrap(), Some(json!({"data": [1, 2, 3]})));

        let back: Option<Vec<u32>> = read_snapshot(&store, "c", "m").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[test]
    fn write_snapshot_skips_empty_payloads() {
        let store = MemoryStore::new();
        assert!(!write_snapshot(&store, "c", "list", &Vec::<u32>::new()).unwrap());
        assert!(!write_snapshot(&store, "c", "null", &Value::Null).unwrap());
        assert!(store.list_documents("c").unwrap().is_empty());
    }

    #[test]
    fn replace_snapshot_clears_stale_documents() {
        let store = MemoryStore::new();
        assert!(replace_snapshot(&store, "c", "totals", &json!({"stars": 3})).unwrap());
        assert!(!replace_snapshot(&store, "c", "totals", &json!({})).unwrap());
        assert_eq!(store.get_document("c", "totals").unwrap(), None);

        // nothing stored and nothing to write is fine
        assert!(!replace_snapshot(&store, "c", "series", &Vec::<u32>::new()).unwrap());
    }

    #[test]
    fn read_snapshot_tolerates_missing_and_mismatched_documents() {
        let store = MemoryStore::new();
        assert_eq!(read_snapshot::<Vec<u32>>(&store, "c", "missing").unwrap(), None);

        store.put_document("c", "odd", &json!({"other": 1})).unwrap();
        assert_eq!(read_snapshot::<Vec<u32>>(&store, "c", "odd").unwrap(), None);

        store.put_document("c", "wrong", &json!({"data": "text"})).unwrap();
        assert_eq!(read_snapshot::<Vec<u32>>(&store, "c", "wrong").unwrap(), None);
    }

    #[test]
    fn read_records_skips_undecodable_documents() {
        let store = MemoryStore::new();
        let c = ProtocolCollections::new("p");
        let record = RepositoryRecord::inaccessible("https://github.com/a/b", "a", "b");
        store.put_document(&c.projects(), "a#b", &serde_json::to_value(&record).unwrap()).unwrap();
        store.put_document(&c.projects(), "junk", &json!({"nope": true})).unwrap();

        let records = read_records(&store, &c).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn merge_skips_nulls_and_keeps_existing_fields() {
        let mut target = json!({"a": 1, "b": 2});
        merge_into(&mut target, &json!({"b": null, "c": 3}));
        assert_eq!(target, json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn merge_into_non_object_replaces_it() {
        let mut target = json!(5);
        merge_into(&mut target, &json!({"a": 1}));
        assert_eq!(target, json!({"a": 1}));
    }

    #[test]
    fn collection_names() {
        let c = ProtocolCollections::new("uniswap");
        assert_eq!(c.projects(), "uniswap-projects");
        assert_eq!(c.repository("acme#widget"), "uniswap-widgets/repositories/acme#widget");
        assert_eq!(c.cumulative(), "uniswap-cumulative");
        assert_eq!(c.leaderboard(), "uniswap-leaderboard");
        assert_eq!(c.forum(), "uniswap-discourse");
        assert_eq!(c.developers(), "uniswap-developers");
        assert_eq!(c.governance(), "uniswap-governance");
        assert_eq!(c.asset(), "uniswap-messari");
    }
}
