use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::debug;

use super::DocumentStore;

/// Stores each collection as a directory of `{key}.json` files.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        validate_component(collection)?;
        Ok(self.root.join(collection))
    }

    fn document_path(&self, collection: &str, key: &str) -> Result<PathBuf> {
        validate_component(key)?;
        Ok(self.collection_path(collection)?.join(format!("{key}.json")))
    }
}

impl DocumentStore for FileStore {
    fn get_document(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let path = self.document_path(collection, key)?;
        if !path.is_file() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read document {}", path.display()))?;
        let document = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse document {}", path.display()))?;
        Ok(Some(document))
    }

    fn put_document(&self, collection: &str, key: &str, document: &Value) -> Result<()> {
        let path = self.document_path(collection, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let serialized = serde_json::to_vec_pretty(document)
            .with_context(|| format!("failed to serialize document {collection}/{key}"))?;
        fs::write(&path, serialized)
            .with_context(|| format!("failed to write document {}", path.display()))?;
        debug!(collection, key, "document written");
        Ok(())
    }

    fn list_keys(&self, collection: &str) -> Result<Vec<String>> {
        let dir = self.collection_path(collection)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed to read collection {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn validate_component(value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(|ch: char| matches!(ch, '/' | '\\' | '\0'))
    {
        return Err(anyhow!("invalid document path component '{value}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn documents_round_trip_through_disk() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path().join("store"));

        assert!(store.get_document("movies", "Alien_1979_tt0078748")?.is_none());
        assert!(store.list_keys("movies")?.is_empty());

        store.put_document("movies", "Alien_1979_tt0078748", &json!({"title": "Alien"}))?;
        store.put_document("movies", "Up_2009_tt1049413", &json!({"title": "Up"}))?;
        fs::write(dir.path().join("store/movies/notes.txt"), "ignored")?;

        assert_eq!(
            store.get_document("movies", "Alien_1979_tt0078748")?,
            Some(json!({"title": "Alien"}))
        );
        assert_eq!(
            store.list_keys("movies")?,
            vec!["Alien_1979_tt0078748", "Up_2009_tt1049413"]
        );
        Ok(())
    }

    #[test]
    fn rejects_path_traversal() {
        let store = FileStore::new("/tmp/unused");
        assert!(store.get_document("movies", "../secrets").is_err());
        assert!(store.get_document("..", "titleMapping").is_err());
        assert!(store.put_document("movies", "", &json!({})).is_err());
    }

    #[test]
    fn corrupt_document_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("movies"))?;
        fs::write(dir.path().join("movies/broken.json"), "{ not json")?;
        let store = FileStore::new(dir.path());
        assert!(store.get_document("movies", "broken").is_err());
        Ok(())
    }
}
