//! Credential storage with per-key expiry.
//!
//! The store is the single source of truth for a token's remaining life:
//! providers never keep their own copy of the expiry instant.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::error::TokenError;

/// Async key-value store with TTL semantics (Redis-shaped).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Value under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, TokenError>;

    /// Store `value` under `key`. `ttl_secs` of `None` never expires.
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), TokenError>;

    /// Remaining whole seconds for `key`; `None` when absent or without expiry.
    async fn ttl(&self, key: &str) -> Result<Option<u64>, TokenError>;

    /// Remove keys. Missing keys are ignored.
    async fn del(&self, keys: &[&str]) -> Result<(), TokenError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process [`CredentialStore`] on the tokio clock.
///
/// Expired entries are dropped lazily on access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().await.values().filter(|e| e.is_live(now)).count()
    }

    /// Whether the store holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, TokenError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // A concurrent `set` may have replaced the expired entry since the
        // read lock was dropped.
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), TokenError> {
        let mut entries = self.entries.write().await;
        if ttl_secs == Some(0) {
            entries.remove(key);
            return Ok(());
        }
        let expires_at = ttl_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, TokenError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(key).filter(|e| e.is_live(now)) else {
            return Ok(None);
        };
        Ok(entry.expires_at.map(|at| {
            let left = at - now;
            // Round partial seconds up so a fresh 50 s entry reports 50.
            left.as_secs() + u64::from(left.subsec_nanos() > 0)
        }))
    }

    async fn del(&self, keys: &[&str]) -> Result<(), TokenError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_get_and_expiry() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(50)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.ttl("k").await.unwrap(), Some(50));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(store.ttl("k").await.unwrap(), Some(30));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_no_expiry() {
        let store = MemoryStore::new();
        store.set("ticket", "t", None).await.unwrap();
        assert_eq!(store.get("ticket").await.unwrap().as_deref(), Some("t"));
        assert_eq!(store.ttl("ticket").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_removes() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        store.set("k", "w", Some(0)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_get_keeps_concurrent_set() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.set("k", "OLD", Some(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        // Queue a get behind a set on the expired key.
        let guard = store.entries.write().await;
        let reader = tokio::spawn({
            let store = store.clone();
            async move { store.get("k").await }
        });
        tokio::task::yield_now().await;
        let writer = tokio::spawn({
            let store = store.clone();
            async move { store.set("k", "FRESH", Some(7100)).await }
        });
        tokio::task::yield_now().await;
        drop(guard);

        let seen = reader.await.unwrap().unwrap();
        writer.await.unwrap().unwrap();
        assert!(seen.is_none() || seen.as_deref() == Some("FRESH"));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("FRESH"));
        assert_eq!(store.ttl("k").await.unwrap(), Some(7100));
    }

    #[tokio::test]
    async fn test_del_many() {
        let store = MemoryStore::new();
        store.set("a", "1", None).await.unwrap();
        store.set("b", "2", Some(10)).await.unwrap();
        store.set("c", "3", None).await.unwrap();
        store.del(&["a", "b", "missing"]).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("c").await.unwrap().as_deref(), Some("3"));
    }
}
