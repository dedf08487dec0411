//! File-based storage implementation

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::errors::StorageError;
use crate::domain::traits::{ConfigStore, DocumentUpdate};

/// Document holding the guild id -> prefix mapping
pub const PREFIX_DOCUMENT: &str = "guild";

/// JSON file-based store. Each document is `<base_path>/<name>.json`.
pub struct JsonStore {
    base_path: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    fn path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StorageError::NotFound(format!("invalid document name: {}", name)));
        }
        Ok(self.base_path.join(format!("{}.json", name)))
    }

    async fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    async fn read(&self, name: &str) -> Result<Value, StorageError> {
        let path = self.path(name)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Value::Object(Map::new()))
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(format!("{}: {}", path.display(), e)))
    }

    async fn write(&self, name: &str, data: &Value) -> Result<(), StorageError> {
        let path = self.path(name)?;
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        tokio::fs::create_dir_all(&self.base_path).await?;
        // write then rename so a crash never leaves a truncated document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let doc = self.load_document(PREFIX_DOCUMENT).await?;
        Ok(doc.get(key).and_then(Value::as_str).map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        let value = value.to_string();
        self.update_document(
            PREFIX_DOCUMENT,
            Box::new(move |doc| {
                if !doc.is_object() {
                    *doc = Value::Object(Map::new());
                }
                if let Value::Object(map) = doc {
                    map.insert(key, Value::String(value));
                }
            }),
        )
        .await?;
        Ok(())
    }

    async fn load_document(&self, name: &str) -> Result<Value, StorageError> {
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;
        self.read(name).await
    }

    async fn save_document(&self, name: &str, data: &Value) -> Result<(), StorageError> {
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;
        self.write(name, data).await
    }

    async fn update_document(&self, name: &str, update: DocumentUpdate<'_>) -> Result<Value, StorageError> {
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;
        let mut doc = self.read(name).await?;
        update(&mut doc);
        self.write(name, &doc).await?;
        tracing::debug!("Updated document {}", name);
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert_eq!(store.load_document("tags").await.unwrap(), serde_json::json!({}));
        assert_eq!(store.get("123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prefix_roundtrip_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.set("123", "!").await.unwrap();

        let reopened = JsonStore::new(dir.path());
        assert_eq!(reopened.get("123").await.unwrap().as_deref(), Some("!"));
        assert!(dir.path().join("guild.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonStore::new(dir.path());

        let result = store
            .update_document("tags", Box::new(|doc| doc["x"] = Value::from(1)))
            .await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn test_concurrent_updates_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonStore::new(dir.path()));
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update_document(
                        "counts",
                        Box::new(move |doc| {
                            doc[format!("user{}", i)] = Value::from(i);
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let doc = store.load_document("counts").await.unwrap();
        assert_eq!(doc.as_object().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(store.load_document("../etc/passwd").await.is_err());
    }
}
