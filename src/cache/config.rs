//! Cache behavior configuration.

use std::time::Duration;

use crate::config::CacheSettings;

/// Resolved cache tuning derived from deployment settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expiry for lesson content bundles.
    pub lesson_ttl: Duration,
    /// Expiry for completion flags.
    pub completion_ttl: Duration,
    /// Ceiling on any single cache operation; a slow cache dependency must
    /// not stall the request path.
    pub op_timeout: Duration,
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            lesson_ttl: Duration::from_secs(settings.lesson_ttl_seconds.get()),
            completion_ttl: Duration::from_secs(settings.completion_ttl_seconds.get()),
            op_timeout: Duration::from_millis(settings.op_timeout_ms.get()),
        }
    }
}
