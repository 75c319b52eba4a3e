//! Booklet Lifecycle Authority — read-only view of booklet status.
//!
//! The printing workflow owns booklet transitions; this service never writes them.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::booklet::Booklet;

#[async_trait]
pub trait BookletLifecycle: Send + Sync {
    async fn find_booklet(&self, id: Uuid) -> Result<Option<Booklet>, AppError>;
}

pub struct PgBookletLifecycle {
    pool: PgPool,
}

impl PgBookletLifecycle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookletLifecycle for PgBookletLifecycle {
    async fn find_booklet(&self, id: Uuid) -> Result<Option<Booklet>, AppError> {
        sqlx::query_as("SELECT id, status, is_active FROM booklets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store("find_booklet", id, e))
    }
}
