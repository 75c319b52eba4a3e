//! Cache invalidation port. The service only computes keys and asks for eviction;
//! whatever caches placement reads lives outside this crate.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

pub fn placement_key(id: Uuid) -> String {
    format!("placement:{id}")
}

pub fn book_list_key(booklet_id: Uuid) -> String {
    format!("placements-by-book:{booklet_id}")
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn evict(&self, key: &str) -> Result<(), AppError>;

    /// Evicts every key of one mutation. Adapters override this to batch.
    async fn evict_all(&self, keys: &[String]) -> Result<(), AppError> {
        for key in keys {
            self.evict(key).await?;
        }
        Ok(())
    }
}

/// Evicts keys with `DEL` on a Redis instance, one command per mutation.
pub struct RedisCacheInvalidator {
    client: redis::Client,
}

impl RedisCacheInvalidator {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheInvalidator for RedisCacheInvalidator {
    async fn evict(&self, key: &str) -> Result<(), AppError> {
        self.evict_all(&[key.to_string()]).await
    }

    async fn evict_all(&self, keys: &[String]) -> Result<(), AppError> {
        if keys.is_empty() {
            return Ok(());
        }
        let joined = keys.join(" ");
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Cache(format!("connect for DEL {joined}: {e}")))?;

        let removed: i64 = conn
            .del(keys)
            .await
            .map_err(|e| AppError::Cache(format!("DEL {joined}: {e}")))?;

        debug!("Evicted cache keys {joined} ({removed} removed)");
        Ok(())
    }
}
