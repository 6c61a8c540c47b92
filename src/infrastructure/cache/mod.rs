//! Token cache — the external store for refresh-token rotation records and
//! the access-token blacklist.
//!
//! The backend is chosen once at startup (`redis`, `memory` or `none`).
//! Every caller treats the cache as advisory: a get/set/del failure is
//! logged and the primary operation continues, so an unreachable Redis
//! never takes the API down with it.

pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CacheConfig;

pub use memory::InMemoryTokenCache;
pub use self::redis::RedisTokenCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("token cache backend error: {0}")]
    Backend(String),
}

/// Key/value store with per-key TTL. `set_ex` overwrites unconditionally,
/// which is what gives "one live refresh token per user" its semantics.
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Build the configured token cache backend. Returns `None` when the cache
/// is disabled or the redis backend cannot be reached at startup; callers
/// then skip revocation/rotation bookkeeping entirely.
pub async fn init_token_cache(config: &CacheConfig) -> Option<Arc<dyn TokenCache>> {
    match config.backend.as_str() {
        "redis" => {
            let url = config.connection_url();
            match RedisTokenCache::connect(&url).await {
                Ok(cache) => {
                    info!("Token cache: redis at {}", url);
                    Some(Arc::new(cache))
                }
                Err(e) => {
                    warn!("Token cache unavailable ({e}); revocation and refresh rotation checks are disabled");
                    None
                }
            }
        }
        "memory" => {
            info!("Token cache: in-process memory");
            Some(Arc::new(InMemoryTokenCache::new()))
        }
        "none" => None,
        other => {
            warn!("Unknown token cache backend '{other}'; cache disabled");
            None
        }
    }
}
