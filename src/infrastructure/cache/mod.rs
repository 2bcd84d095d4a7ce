//! Cache Module
//!
//! Redis connection management and key naming. Redis only backs the
//! request rate limiter; without a configured URL the server runs
//! without it.
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_backend::infrastructure::cache::create_redis_client;
//!
//! let conn = create_redis_client(&settings.redis).await?;
//! if let Some(conn) = conn {
//!     // rate limiting enabled
//! }
//! ```

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument, warn};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// Returns `Ok(None)` when no URL is configured.
#[instrument(skip(settings))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<Option<ConnectionManager>, redis::RedisError> {
    let Some(url) = settings.url.as_deref().filter(|u| !u.trim().is_empty()) else {
        warn!("Redis URL not configured; rate limiting disabled");
        return Ok(None);
    };

    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(Some(manager))
}

/// Cache key prefixes.
pub mod keys {
    /// Prefix for rate limiting windows (e.g., "ratelimit:auth:203.0.113.7")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Generates a rate limit key for a client and endpoint class
    #[inline]
    pub fn rate_limit(endpoint: &str, client: impl std::fmt::Display) -> String {
        format!("{}{}:{}", RATE_LIMIT, endpoint, client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(keys::rate_limit("auth", "10.0.0.1"), "ratelimit:auth:10.0.0.1");
    }

    #[tokio::test]
    async fn test_missing_url_disables_redis() {
        let settings = RedisSettings { url: None };
        let conn = create_redis_client(&settings).await.unwrap();
        assert!(conn.is_none());
    }
}
