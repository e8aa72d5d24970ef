//! Durable key-value storage port.
//!
//! Values are JSON documents under string keys (`stats`, `settings`). Every
//! successful `set` is announced on a broadcast channel so observers (status
//! surfaces, other components) can react to changes.

mod memory;
mod sqlite;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Capacity of the change-notification channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A key was written.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub value: serde_json::Value,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Receive a [`StorageChange`] for every successful `set` from now on.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Read and deserialize `key`. `Ok(None)` when absent.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(v) => {
            let parsed = serde_json::from_value(v).with_context(|| format!("parse stored {key}"))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Serialize and write `value` under `key`.
pub async fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let v = serde_json::to_value(value).with_context(|| format!("serialize {key}"))?;
    store.set(key, v).await
}
