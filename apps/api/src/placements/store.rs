//! Placement Store — persistence port for placements.
//!
//! `PlacementService` holds an `Arc<dyn PlacementStore>`; production wires in
//! `PgPlacementStore`, tests use `placements::testing::InMemoryPlacementStore`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::placement::{PageRef, Placement, PlacementDraft, PlacementPatch, ReorderEntry};

#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Placement>, AppError>;

    /// All placements of a booklet, ordered by `(page_number, display_order)`.
    async fn find_by_book_id(&self, booklet_id: Uuid) -> Result<Vec<Placement>, AppError>;

    /// All placements on one page, active or not.
    async fn find_by_page(&self, page: PageRef) -> Result<Vec<Placement>, AppError>;

    async fn create(&self, draft: PlacementDraft) -> Result<Placement, AppError>;

    async fn update(&self, id: Uuid, patch: &PlacementPatch) -> Result<Placement, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Applies every new display order or none of them.
    async fn reorder_batch(
        &self,
        booklet_id: Uuid,
        entries: &[ReorderEntry],
    ) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL adapter
// ────────────────────────────────────────────────────────────────────────────

pub struct PgPlacementStore {
    pool: PgPool,
}

impl PgPlacementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlacementStore for PgPlacementStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Placement>, AppError> {
        sqlx::query_as("SELECT * FROM booklet_placements WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store("find_by_id", id, e))
    }

    async fn find_by_book_id(&self, booklet_id: Uuid) -> Result<Vec<Placement>, AppError> {
        sqlx::query_as(
            r#"
            SELECT * FROM booklet_placements
            WHERE booklet_id = $1
            ORDER BY page_number ASC, display_order ASC
            "#,
        )
        .bind(booklet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::store("find_by_book_id", booklet_id, e))
    }

    async fn find_by_page(&self, page: PageRef) -> Result<Vec<Placement>, AppError> {
        sqlx::query_as(
            r#"
            SELECT * FROM booklet_placements
            WHERE booklet_id = $1 AND page_number = $2
            ORDER BY display_order ASC
            "#,
        )
        .bind(page.booklet_id)
        .bind(page.page_number)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::store("find_by_page", page, e))
    }

    async fn create(&self, draft: PlacementDraft) -> Result<Placement, AppError> {
        let PlacementDraft {
            id,
            placement,
            display_order,
        } = draft;

        sqlx::query_as(
            r#"
            INSERT INTO booklet_placements
                (id, booklet_id, page_number, size_tier, content_type,
                 title, description, link_url, image_url, body_text,
                 display_order, is_active, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE, $12)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(placement.booklet_id)
        .bind(placement.page_number)
        .bind(placement.size_tier)
        .bind(placement.content_type)
        .bind(placement.content.title)
        .bind(placement.content.description)
        .bind(placement.content.link_url)
        .bind(placement.content.image_url)
        .bind(placement.content.body_text)
        .bind(display_order)
        .bind(placement.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::store("create", id, e))
    }

    async fn update(&self, id: Uuid, patch: &PlacementPatch) -> Result<Placement, AppError> {
        // Text fields: NULL keeps the column, a blank string clears it.
        let updated: Option<Placement> = sqlx::query_as(
            r#"
            UPDATE booklet_placements SET
                page_number   = COALESCE($2, page_number),
                size_tier     = COALESCE($3, size_tier),
                content_type  = COALESCE($4, content_type),
                title         = CASE WHEN $5::text IS NULL THEN title
                                     WHEN BTRIM($5) = '' THEN NULL ELSE $5 END,
                description   = CASE WHEN $6::text IS NULL THEN description
                                     WHEN BTRIM($6) = '' THEN NULL ELSE $6 END,
                link_url      = CASE WHEN $7::text IS NULL THEN link_url
                                     WHEN BTRIM($7) = '' THEN NULL ELSE $7 END,
                image_url     = CASE WHEN $8::text IS NULL THEN image_url
                                     WHEN BTRIM($8) = '' THEN NULL ELSE $8 END,
                body_text     = CASE WHEN $9::text IS NULL THEN body_text
                                     WHEN BTRIM($9) = '' THEN NULL ELSE $9 END,
                display_order = COALESCE($10, display_order),
                is_active     = COALESCE($11, is_active),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.page_number)
        .bind(patch.size_tier)
        .bind(patch.content_type)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.link_url.as_deref())
        .bind(patch.image_url.as_deref())
        .bind(patch.body_text.as_deref())
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::store("update", id, e))?;

        updated.ok_or_else(|| AppError::NotFound(format!("Placement {id} not found")))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM booklet_placements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store("delete", id, e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Placement {id} not found")));
        }
        Ok(())
    }

    async fn reorder_batch(
        &self,
        booklet_id: Uuid,
        entries: &[ReorderEntry],
    ) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::store("reorder_batch", booklet_id, e))?;

        for entry in entries {
            let result = sqlx::query(
                r#"
                UPDATE booklet_placements
                SET display_order = $1, updated_at = NOW()
                WHERE id = $2 AND booklet_id = $3
                "#,
            )
            .bind(entry.display_order)
            .bind(entry.id)
            .bind(booklet_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::store("reorder_batch", booklet_id, e))?;

            // Dropping `tx` without commit rolls every earlier update back.
            if result.rows_affected() != 1 {
                return Err(AppError::Validation(format!(
                    "Placement {} does not belong to booklet {booklet_id}",
                    entry.id
                )));
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::store("reorder_batch", booklet_id, e))?;
        Ok(())
    }
}
