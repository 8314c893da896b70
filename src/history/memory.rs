use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::RwLock;
use crate::history::{ DocumentStore, StoreError };

/// Process-local store, used with `--store-type memory` and in tests.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, JsonValue>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, key: &str, default: JsonValue) -> Result<JsonValue, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.get(key).cloned().unwrap_or(default))
    }

    async fn put(&self, key: &str, document: &JsonValue) -> Result<(), StoreError> {
        self.documents.write().await.insert(key.to_string(), document.clone());
        Ok(())
    }
}
