use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use stratus_types::FileResponse;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Key-value store with per-entry expiry backing the listing cache.
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError>;

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> std::result::Result<(), CacheError>;

    async fn delete(&self, key: &str) -> std::result::Result<(), CacheError>;
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache store. Expired entries read as misses and are
/// replaced on the next write to the same key.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> std::result::Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

/// Read-through cache for per-user file listings. Every operation
/// fails open: a store problem downgrades to a miss and the database
/// stays authoritative.
#[derive(Clone)]
pub struct ListingCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(user_id: i32) -> String {
        format!("files:{}", user_id)
    }

    /// Cached listing for a user, if present and fresh
    pub async fn get(&self, user_id: i32) -> Option<Vec<FileResponse>> {
        let key = Self::key(user_id);
        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(files) => Some(files),
                Err(e) => {
                    tracing::warn!("Discarding malformed cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Store a listing for a user
    pub async fn put(&self, user_id: i32, files: &[FileResponse]) {
        let key = Self::key(user_id);
        let raw = match serde_json::to_string(files) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize listing for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(&key, raw, self.ttl).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Drop a user's cached listing. Every mutation of a user's records
    /// calls this before returning.
    pub async fn invalidate(&self, user_id: i32) {
        let key = Self::key(user_id);
        if let Err(e) = self.store.delete(&key).await {
            tracing::warn!("Cache invalidation failed for {}: {}", key, e);
        }
    }
}
