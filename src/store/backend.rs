//! Key/value persistence backends for the store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{AppError, Result};

/// Persistent key/value storage the store serializes into.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the value stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    /// Fails with `AppError::QuotaExceeded` when the backend is full.
    async fn save(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key` (no-op if absent).
    async fn remove(&self, key: &str) -> Result<()>;

    /// Get the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// Check whether replacing one entry keeps the total stored size within quota.
pub(crate) fn check_quota(quota: Option<usize>, other_entries: usize, new_value: usize) -> Result<()> {
    match quota {
        Some(limit) if other_entries + new_value > limit => {
            tracing::warn!(
                "Refusing write of {} bytes: {} bytes already stored, quota is {}",
                new_value,
                other_entries,
                limit
            );
            Err(AppError::quota_exceeded())
        }
        _ => Ok(()),
    }
}

/// In-process backend, used for tests and ephemeral stores.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    /// Create an empty backend without quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend limited to `quota` bytes in total.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Total number of bytes currently stored.
    pub fn used_bytes(&self) -> usize {
        self.entries.read().values().map(String::len).sum()
    }

    /// Overwrite a raw entry, bypassing the quota.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn save(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write();
        let others: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        check_quota(self.quota, others, value.len())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
