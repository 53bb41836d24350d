//! Task-result store
//!
//! Key-value storage with expiring entries. Each key belongs to exactly
//! one task execution, so single-key upserts are all that is needed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::ControllerError;

/// Store operations the task engine relies on
#[async_trait]
pub trait TaskStoreExt: Send + Sync {
    /// Value for `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ControllerError>;

    /// Atomically replace `key` and reset its expiry
    async fn set_with_ttl(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), ControllerError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Task store held in process memory; expired entries are dropped on read
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    data: RwLock<HashMap<String, Entry>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write().await;
        let before = data.len();
        data.retain(|_, entry| entry.expires_at > now);
        before - data.len()
    }
}

#[async_trait]
impl TaskStoreExt for MemoryTaskStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ControllerError> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Ok(Some(entry.value.clone())),
            Some(_) => {
                drop(data);
                self.data.write().await.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), ControllerError> {
        let mut data = self.data.write().await;
        data.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
