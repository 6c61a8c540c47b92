//! Redis-backed token cache.

use async_trait::async_trait;

use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};

use super::{CacheError, TokenCache};

fn backend_err(e: ::redis::RedisError) -> CacheError {
    CacheError::Backend(e.to_string())
}

/// Token cache on a shared [`ConnectionManager`], which multiplexes one
/// connection and reconnects on its own after network failures.
pub struct RedisTokenCache {
    conn: ConnectionManager,
}

impl RedisTokenCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(backend_err)?;
        let conn = client.get_connection_manager().await.map_err(backend_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(backend_err)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await.map_err(backend_err)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(backend_err)?;
        Ok(())
    }
}
