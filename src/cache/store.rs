//! Cache storage backends.
//!
//! [`RedisCacheStore`] is the production backend. The connection is
//! established lazily and re-established after a failure, so the process can
//! start (and keep serving from the database) while the cache host is down.
//! [`InMemoryCacheStore`] backs tests with the same observable semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// String-keyed cache store with expiring entries.
///
/// Values are text: JSON payloads or flag sentinels. Implementations must be
/// safe to share across request handlers.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a key. `Ok(None)` means the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a key with an expiry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
    -> Result<(), CacheError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key matching a glob pattern, returning how many went.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

// ============================================================================
// Redis backend
// ============================================================================

pub struct RedisCacheStore {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    op_timeout: Duration,
}

impl RedisCacheStore {
    /// Create a store for the given connection URL.
    ///
    /// Only the URL is validated here; the connection itself is established
    /// on first use so a cache outage cannot block process startup.
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(CacheError::backend)?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            op_timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let connect = self.client.get_multiplexed_async_connection();
        let conn = timeout(self.op_timeout, connect)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
            .map_err(CacheError::backend)?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the cached connection so the next operation reconnects.
    async fn reset(&self) {
        *self.conn.lock().await = None;
    }

    async fn run<T>(
        &self,
        op: impl Future<Output = Result<T, redis::RedisError>>,
    ) -> Result<T, CacheError> {
        match timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                self.reset().await;
                Err(CacheError::backend(err))
            }
            Err(_) => {
                self.reset().await;
                Err(CacheError::Timeout(self.op_timeout))
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let key = key.to_string();
        self.run(async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let key = key.to_string();
        let value = value.to_string();
        let seconds = ttl.as_secs().max(1);
        self.run(async move { conn.set_ex::<_, _, ()>(key, value, seconds).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let key = key.to_string();
        self.run(async move { conn.del::<_, ()>(key).await }).await
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let pattern = pattern.to_string();
        self.run(async move {
            let keys: Vec<String> = conn.keys(pattern).await?;
            if keys.is_empty() {
                return Ok(0);
            }
            conn.del::<_, u64>(keys).await
        })
        .await
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}

/// Deterministic in-process store with the same semantics as the Redis
/// backend. Used by tests and single-node deployments without a cache host.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|entry| !entry.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().await;
        let matching: Vec<String> = entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        let removed = matching.len() as u64;
        for key in matching {
            entries.remove(&key);
        }
        Ok(removed)
    }
}

/// Match a key against a glob pattern where `*` spans any run of characters.
fn glob_match(pattern: &str, key: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == key;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = segments
        .split_first()
        .expect("split always yields at least one segment");
    if !key.starts_with(first) {
        return false;
    }
    let (last, middle) = rest
        .split_last()
        .expect("a pattern containing `*` yields at least two segments");

    let mut pos = first.len();
    for segment in middle {
        if segment.is_empty() {
            continue;
        }
        match key[pos..].find(segment) {
            Some(offset) => pos += offset + segment.len(),
            None => return false,
        }
    }

    if last.is_empty() {
        return true;
    }
    key.len() >= pos + last.len() && key.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = InMemoryCacheStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store
            .set_with_ttl("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_expires_entries() {
        let store = InMemoryCacheStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn memory_store_deletes_by_pattern() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store
            .set_with_ttl("v1:user:a:lesson:x:completed", "true", ttl)
            .await
            .unwrap();
        store
            .set_with_ttl("v2:user:b:lesson:x:completed", "false", ttl)
            .await
            .unwrap();
        store
            .set_with_ttl("v1:user:a:lesson:y:completed", "true", ttl)
            .await
            .unwrap();

        let removed = store
            .delete_pattern("*:user:*:lesson:x:completed")
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            store.get("v1:user:a:lesson:y:completed").await.unwrap(),
            Some("true".to_string())
        );
    }

    #[test]
    fn glob_matching_anchors_both_ends() {
        assert!(glob_match("v1:lesson:42", "v1:lesson:42"));
        assert!(!glob_match("v1:lesson:42", "v1:lesson:420"));
        assert!(glob_match("*:lesson:42", "anything:lesson:42"));
        assert!(glob_match("v1:*", "v1:lesson:42"));
        assert!(glob_match(
            "*:user:*:lesson:42:completed",
            "v1:user:7:lesson:42:completed"
        ));
        assert!(!glob_match(
            "*:user:*:lesson:42:completed",
            "v1:user:7:lesson:43:completed"
        ));
    }
}
