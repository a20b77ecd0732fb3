//! Aula cache system.
//!
//! A remote key-value cache (Redis) sits beside the relational store and
//! absorbs repeated lesson-content and completion-status reads. The cache is
//! strictly an accelerator: every value it holds can be recomputed from the
//! database, and a cache outage must never surface to a request handler.
//!
//! - [`store`] defines the `CacheStore` trait plus the Redis-backed and
//!   in-memory implementations.
//! - [`keys`] builds the versioned key namespace.
//! - [`codec`] encodes and decodes the typed payloads.
//! - [`CacheHandle`] is the best-effort facade the application layer talks
//!   to; it converts every backend failure into a logged miss or no-op.

pub mod codec;
pub mod config;
pub mod keys;
pub mod store;

pub use config::CacheConfig;
pub use store::{CacheError, CacheStore, InMemoryCacheStore, RedisCacheStore};

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::warn;

const SOURCE: &str = "aula::cache";

/// Best-effort facade over a [`CacheStore`].
///
/// Callers of this type cannot observe cache failures: a failed read is a
/// miss, a failed write or eviction is a no-op. Failures are logged with the
/// key and operation and counted in metrics so a degraded cache is visible
/// to operators without ever failing a request.
#[derive(Clone)]
pub struct CacheHandle {
    store: Arc<dyn CacheStore>,
}

impl CacheHandle {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Read a key, treating every backend failure as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                counter!("aula_cache_hit_total").increment(1);
                Some(value)
            }
            Ok(None) => {
                counter!("aula_cache_miss_total").increment(1);
                None
            }
            Err(err) => {
                counter!("aula_cache_error_total", "operation" => "get").increment(1);
                warn!(target: SOURCE, key, operation = "get", error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write a key with an expiry, ignoring backend failures.
    pub async fn put(&self, key: &str, value: &str, ttl: Duration) {
        if let Err(err) = self.store.set_with_ttl(key, value, ttl).await {
            counter!("aula_cache_error_total", "operation" => "set").increment(1);
            warn!(target: SOURCE, key, operation = "set", error = %err, "cache write failed, entry not stored");
        }
    }

    /// Remove a key, ignoring backend failures. The next read recomputes.
    pub async fn evict(&self, key: &str) {
        if let Err(err) = self.store.delete(key).await {
            counter!("aula_cache_error_total", "operation" => "delete").increment(1);
            warn!(target: SOURCE, key, operation = "delete", error = %err, "cache eviction failed, entry may serve stale until expiry");
        }
    }

    /// Remove every key matching a glob pattern, ignoring backend failures.
    pub async fn evict_pattern(&self, pattern: &str) {
        match self.store.delete_pattern(pattern).await {
            Ok(removed) => {
                tracing::debug!(target: SOURCE, pattern, removed, "bulk cache eviction");
            }
            Err(err) => {
                counter!("aula_cache_error_total", "operation" => "delete_pattern").increment(1);
                warn!(target: SOURCE, pattern, operation = "delete_pattern", error = %err, "bulk cache eviction failed");
            }
        }
    }
}
