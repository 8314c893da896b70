mod memory;
mod redis;

pub use memory::MemoryDocumentStore;
pub use self::redis::RedisDocumentStore;

use async_trait::async_trait;
use log::{ info, warn };
use serde_json::{ Map, Value as JsonValue };
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;
use crate::cli::Args;
use crate::models::interview::Interview;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document '{key}' is not a JSON object")]
    InvalidDocument {
        key: String,
    },
}

/// Key-value document store holding whole JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the document stored under `key`, or `default` when there is none.
    async fn get(&self, key: &str, default: JsonValue) -> Result<JsonValue, StoreError>;

    async fn put(&self, key: &str, document: &JsonValue) -> Result<(), StoreError>;
}

pub fn create_document_store(
    args: &Args
) -> Result<Arc<dyn DocumentStore>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "redis" => {
            let store = RedisDocumentStore::new(&args.store_host, &args.store_key_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryDocumentStore::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_transcript_store(
    args: &Args
) -> Result<TranscriptStore, Box<dyn Error + Send + Sync>> {
    info!(
        "Interviews will be stored in: {} at {} (document '{}')",
        args.store_type,
        args.store_host,
        args.store_document
    );
    let store = create_document_store(args)?;
    Ok(TranscriptStore::new(store, &args.store_document))
}

/// Interview records kept as a single document mapping interview id to record.
#[derive(Clone)]
pub struct TranscriptStore {
    store: Arc<dyn DocumentStore>,
    document_key: String,
}

impl TranscriptStore {
    pub fn new(store: Arc<dyn DocumentStore>, document_key: &str) -> Self {
        Self {
            store,
            document_key: document_key.to_string(),
        }
    }

    async fn load_document(&self) -> Result<Map<String, JsonValue>, StoreError> {
        let document = self.store.get(&self.document_key, JsonValue::Object(Map::new())).await?;
        match document {
            JsonValue::Object(map) => Ok(map),
            JsonValue::Null => Ok(Map::new()),
            _ => Err(StoreError::InvalidDocument { key: self.document_key.clone() }),
        }
    }

    /// All readable interviews keyed by id. Read failures degrade to an empty
    /// set and malformed records are skipped.
    pub async fn load_interviews(&self) -> BTreeMap<String, Interview> {
        let document = match self.load_document().await {
            Ok(document) => document,
            Err(e) => {
                warn!("Error reading interviews: {}", e);
                return BTreeMap::new();
            }
        };

        let mut interviews = BTreeMap::new();
        for (id, record) in document {
            match serde_json::from_value::<Interview>(record) {
                Ok(interview) => {
                    interviews.insert(id, interview);
                }
                Err(e) => warn!("Skipping unreadable interview '{}': {}", id, e),
            }
        }
        interviews
    }

    pub async fn list_interviews(&self) -> Vec<Interview> {
        self.load_interviews().await.into_values().collect()
    }

    pub async fn get_interview(&self, interview_id: &str) -> Option<Interview> {
        self.load_interviews().await.remove(interview_id)
    }

    /// Creates or overwrites the record under `interview.id`. Other records,
    /// readable or not, are written back untouched.
    pub async fn save_interview(&self, interview: &Interview) -> Result<(), StoreError> {
        let mut document = self.load_document().await?;
        document.insert(interview.id.clone(), serde_json::to_value(interview)?);
        self.store.put(&self.document_key, &JsonValue::Object(document)).await
    }
}
