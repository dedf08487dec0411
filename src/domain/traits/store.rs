use async_trait::async_trait;
use serde_json::Value;

use crate::application::errors::StorageError;

/// Mutation applied to a document under its lock
pub type DocumentUpdate<'a> = Box<dyn FnOnce(&mut Value) + Send + 'a>;

/// Store trait - abstraction for persisted configuration
///
/// `get`/`set` address the per-guild prefix mapping. Documents are named JSON values.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    // Prefix mapping
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    // Documents
    async fn load_document(&self, name: &str) -> Result<Value, StorageError>;
    async fn save_document(&self, name: &str, data: &Value) -> Result<(), StorageError>;

    /// Load, mutate and save a document. Implementations serialize calls per document
    /// and never write when the load failed.
    async fn update_document(&self, name: &str, update: DocumentUpdate<'_>) -> Result<Value, StorageError>;
}
