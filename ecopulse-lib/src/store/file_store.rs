//! A document store backed by JSON files.
//!
//! Each collection path segment maps to a directory under the store root and each
//! document to `{id}.json` inside it.

use super::path_utils::sanitize_path_component;
use super::{DocumentStore, merge_into};
use crate::Result;
use ohno::IntoAppError;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_TARGET: &str = "     store";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,

    // serializes read-modify-write merges
    merge_lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            merge_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        collection
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |dir, segment| dir.join(sanitize_path_component(segment)))
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", sanitize_path_component(id)))
    }

    fn read(path: &Path) -> Result<Option<Value>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).into_app_err_with(|| format!("opening document '{}'", path.display())),
        };

        let value = serde_json::from_reader(BufReader::new(file))
            .into_app_err_with(|| format!("parsing document '{}'", path.display()))?;
        Ok(Some(value))
    }

    fn write(path: &Path, value: &Value) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
        }

        let file = File::create(path).into_app_err_with(|| format!("creating document '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);

        #[cfg(debug_assertions)]
        let result = serde_json::to_writer_pretty(&mut writer, value);
        #[cfg(not(debug_assertions))]
        let result = serde_json::to_writer(&mut writer, value);

        result.into_app_err_with(|| format!("writing document '{}'", path.display()))?;
        writer
            .flush()
            .into_app_err_with(|| format!("flushing document '{}'", path.display()))?;

        log::trace!(target: LOG_TARGET, "Wrote '{}'", path.display());
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn put_document(&self, collection: &str, id: &str, value: &Value) -> Result<()> {
        Self::write(&self.document_path(collection, id), value)
    }

    fn merge_document(&self, collection: &str, id: &str, value: &Value) -> Result<()> {
        let _guard = self.merge_lock.lock().expect("lock not poisoned");
        let path = self.document_path(collection, id);

        let mut document = Self::read(&path)?.unwrap_or(Value::Null);
        merge_into(&mut document, value);
        Self::write(&path, &document)
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Self::read(&self.document_path(collection, id))
    }

    fn list_documents(&self, collection: &str) -> Result<Vec<String>> {
        let dir = self.collection_dir(collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).into_app_err_with(|| format!("listing '{}'", dir.display())),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.into_app_err_with(|| format!("listing '{}'", dir.display()))?.path();
            if !path.is_file() {
                continue;
            }

            if let Some(id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(".json"))
            {
                ids.push(id.to_string());
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        let path = self.document_path(collection, id);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!(target: LOG_TARGET, "Removed '{}'", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).into_app_err_with(|| format!("removing document '{}'", path.display())),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn put_and_get_nested_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());

        store
            .put_document("uni-widgets/repositories/acme#widget", "commit_activity", &json!({"data": [1]}))
            .unwrap();

        assert!(
            tmp.path()
                .join("uni-widgets/repositories/acme#widget/commit_activity.json")
                .is_file()
        );
        assert_eq!(
            store
                .get_document("uni-widgets/repositories/acme#widget", "commit_activity")
                .unwrap(),
            Some(json!({"data": [1]}))
        );
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn missing_document_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        assert_eq!(store.get_document("nothing", "here").unwrap(), None);
        assert!(store.list_documents("nothing").unwrap().is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn merge_keeps_previous_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());

        store
            .merge_document("p-projects", "a#b", &json!({"stars": 3, "language": "Go"}))
            .unwrap();
        store
            .merge_document("p-projects", "a#b", &json!({"stars": 4, "language": null}))
            .unwrap();

        assert_eq!(
            store.get_document("p-projects", "a#b").unwrap(),
            Some(json!({"stars": 4, "language": "Go"}))
        );
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn list_returns_sorted_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        store.put_document("p-projects", "z#z", &json!({})).unwrap();
        store.put_document("p-projects", "a#a", &json!({})).unwrap();
        store.put_document("p-projects/nested", "x", &json!({})).unwrap();

        assert_eq!(store.list_documents("p-projects").unwrap(), vec!["a#a", "z#z"]);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn delete_removes_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        store.put_document("p-cumulative", "totals", &json!({"data": {"stars": 1}})).unwrap();

        assert!(store.delete_document("p-cumulative", "totals").unwrap());
        assert_eq!(store.get_document("p-cumulative", "totals").unwrap(), None);
        assert!(!store.delete_document("p-cumulative", "totals").unwrap());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn corrupt_document_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        fs::create_dir_all(tmp.path().join("c")).unwrap();
        fs::write(tmp.path().join("c/bad.json"), "{ not json").unwrap();

        let _ = store.get_document("c", "bad").unwrap_err();
    }
}
