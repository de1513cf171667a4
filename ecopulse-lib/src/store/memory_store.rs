use super::{DocumentStore, merge_into};
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-process document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<(String, String), Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().expect("lock not poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    fn put_document(&self, collection: &str, id: &str, value: &Value) -> Result<()> {
        let _ = self
            .documents
            .lock()
            .expect("lock not poisoned")
            .insert((collection.to_string(), id.to_string()), value.clone());
        Ok(())
    }

    fn merge_document(&self, collection: &str, id: &str, value: &Value) -> Result<()> {
        let mut documents = self.documents.lock().expect("lock not poisoned");
        let entry = documents.entry((collection.to_string(), id.to_string())).or_insert(Value::Null);
        merge_into(entry, value);
        Ok(())
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .documents
            .lock()
            .expect("lock not poisoned")
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    fn list_documents(&self, collection: &str) -> Result<Vec<String>> {
        Ok(self
            .documents
            .lock()
            .expect("lock not poisoned")
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect())
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self
            .documents
            .lock()
            .expect("lock not poisoned")
            .remove(&(collection.to_string(), id.to_string()))
            .is_some())
    }
}
