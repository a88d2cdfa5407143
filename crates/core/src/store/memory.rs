use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use parking_lot::RwLock;
use serde_json::Value;

use super::DocumentStore;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// Thread-safe in-memory document store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .read()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Whether a collection has no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Remove a document, returning whether it existed.
    pub fn remove(&self, collection: &str, key: &str) -> bool {
        self.inner
            .write()
            .get_mut(collection)
            .map(|docs| docs.remove(key).is_some())
            .unwrap_or(false)
    }
}

impl DocumentStore for MemoryStore {
    fn get_document(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .inner
            .read()
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    fn put_document(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        self.inner
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document.clone());
        Ok(())
    }

    fn list_keys(&self, collection: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .read()
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }
}
