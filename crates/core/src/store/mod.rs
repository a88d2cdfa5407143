//! Document store abstraction.
//!
//! Published data lives in two collections: [`MOVIES_COLLECTION`] holds one
//! document per movie and [`METADATA_COLLECTION`] holds the title mapping
//! under [`TITLE_MAPPING_KEY`].

/// Directory-backed store.
pub mod file;
/// In-process store for fixtures.
pub mod memory;

use anyhow::Result;
use serde_json::Value;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Collection holding movie documents.
pub const MOVIES_COLLECTION: &str = "movies";
/// Collection holding side-index documents.
pub const METADATA_COLLECTION: &str = "metadata";
/// Well-known key of the title mapping document.
pub const TITLE_MAPPING_KEY: &str = "titleMapping";

/// Key-value document access shared by the publisher and the game client.
pub trait DocumentStore: Send + Sync {
    /// Read a document, returning `None` when it does not exist.
    fn get_document(&self, collection: &str, key: &str) -> Result<Option<Value>>;

    /// Create or overwrite a document.
    fn put_document(&self, collection: &str, key: &str, document: &Value) -> Result<()>;

    /// List document keys in a collection, sorted.
    fn list_keys(&self, collection: &str) -> Result<Vec<String>>;
}
