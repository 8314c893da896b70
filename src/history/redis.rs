use async_trait::async_trait;
use crate::history::{ DocumentStore, StoreError };
use log::debug;
use redis::{ AsyncCommands, Client };
use serde_json::Value as JsonValue;

/// Stores each document as a JSON string under `<prefix><key>`.
pub struct RedisDocumentStore {
    client: Client,
    key_prefix: String,
}

impl RedisDocumentStore {
    pub fn new(host: &str, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn get(&self, key: &str, default: JsonValue) -> Result<JsonValue, StoreError> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.get(self.redis_key(key)).await?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => {
                debug!("No document under '{}', using default", self.redis_key(key));
                Ok(default)
            }
        }
    }

    async fn put(&self, key: &str, document: &JsonValue) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let json = serde_json::to_string(document)?;
        conn.set::<_, _, ()>(self.redis_key(key), json).await?;
        Ok(())
    }
}
