//! In-memory adapters for the placement ports, used by service and router tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::booklet::{Booklet, BookletStatus};
use crate::models::placement::{
    ContentType, PageRef, Placement, PlacementContent, PlacementDraft, PlacementPatch,
    ReorderEntry, SizeTier,
};
use crate::placements::cache::CacheInvalidator;
use crate::placements::lifecycle::BookletLifecycle;
use crate::placements::store::PlacementStore;

#[derive(Default)]
pub struct InMemoryPlacementStore {
    rows: Mutex<HashMap<Uuid, Placement>>,
}

impl InMemoryPlacementStore {
    fn rows(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Placement>> {
        self.rows.lock().unwrap()
    }

    fn sorted(mut placements: Vec<Placement>) -> Vec<Placement> {
        placements.sort_by_key(|p| (p.page_number, p.display_order, p.id));
        placements
    }

    /// Writes a row without any capacity check, to simulate a corrupt page.
    pub fn insert_raw(
        &self,
        booklet_id: Uuid,
        page_number: i32,
        size_tier: SizeTier,
        display_order: i32,
    ) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.rows().insert(
            id,
            Placement {
                id,
                booklet_id,
                page_number,
                size_tier,
                content_type: ContentType::Voucher,
                content: PlacementContent::default(),
                display_order,
                is_active: true,
                created_by: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }
}

#[async_trait]
impl PlacementStore for InMemoryPlacementStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Placement>, AppError> {
        Ok(self.rows().get(&id).cloned())
    }

    async fn find_by_book_id(&self, booklet_id: Uuid) -> Result<Vec<Placement>, AppError> {
        let found = self
            .rows()
            .values()
            .filter(|p| p.booklet_id == booklet_id)
            .cloned()
            .collect();
        Ok(Self::sorted(found))
    }

    async fn find_by_page(&self, page: PageRef) -> Result<Vec<Placement>, AppError> {
        let found = self
            .rows()
            .values()
            .filter(|p| p.page() == page)
            .cloned()
            .collect();
        Ok(Self::sorted(found))
    }

    async fn create(&self, draft: PlacementDraft) -> Result<Placement, AppError> {
        let now = Utc::now();
        let data = draft.placement;
        let placement = Placement {
            id: draft.id,
            booklet_id: data.booklet_id,
            page_number: data.page_number,
            size_tier: data.size_tier,
            content_type: data.content_type,
            content: data.content,
            display_order: draft.display_order,
            is_active: true,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        };
        self.rows().insert(placement.id, placement.clone());
        Ok(placement)
    }

    async fn update(&self, id: Uuid, patch: &PlacementPatch) -> Result<Placement, AppError> {
        let mut rows = self.rows();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Placement {id} not found")))?;
        let mut next = row.merged_with(patch);
        next.updated_at = Utc::now();
        *row = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.rows()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Placement {id} not found")))
    }

    async fn reorder_batch(
        &self,
        booklet_id: Uuid,
        entries: &[ReorderEntry],
    ) -> Result<(), AppError> {
        let mut rows = self.rows();
        if let Some(stray) = entries
            .iter()
            .find(|e| rows.get(&e.id).map_or(true, |p| p.booklet_id != booklet_id))
        {
            return Err(AppError::Validation(format!(
                "Placement {} does not belong to booklet {booklet_id}",
                stray.id
            )));
        }
        for entry in entries {
            if let Some(p) = rows.get_mut(&entry.id) {
                p.display_order = entry.display_order;
                p.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBooklets {
    booklets: Mutex<HashMap<Uuid, Booklet>>,
}

impl InMemoryBooklets {
    pub fn insert(&self, id: Uuid, status: BookletStatus) {
        self.booklets.lock().unwrap().insert(
            id,
            Booklet {
                id,
                status,
                is_active: true,
            },
        );
    }

    pub fn set_status(&self, id: Uuid, status: BookletStatus) {
        if let Some(b) = self.booklets.lock().unwrap().get_mut(&id) {
            b.status = status;
        }
    }

    pub fn deactivate(&self, id: Uuid) {
        if let Some(b) = self.booklets.lock().unwrap().get_mut(&id) {
            b.is_active = false;
        }
    }
}

#[async_trait]
impl BookletLifecycle for InMemoryBooklets {
    async fn find_booklet(&self, id: Uuid) -> Result<Option<Booklet>, AppError> {
        Ok(self.booklets.lock().unwrap().get(&id).cloned())
    }
}

/// Records every eviction batch; can be switched to fail every eviction.
#[derive(Default)]
pub struct RecordingCache {
    batches: Mutex<Vec<Vec<String>>>,
    failing: Mutex<bool>,
}

impl RecordingCache {
    /// Every evicted key, in eviction order.
    pub fn evicted(&self) -> Vec<String> {
        self.batches.lock().unwrap().concat()
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.batches.lock().unwrap().clear();
    }

    pub fn fail_evictions(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl CacheInvalidator for RecordingCache {
    async fn evict(&self, key: &str) -> Result<(), AppError> {
        self.evict_all(&[key.to_string()]).await
    }

    async fn evict_all(&self, keys: &[String]) -> Result<(), AppError> {
        if *self.failing.lock().unwrap() {
            return Err(AppError::Cache(format!(
                "DEL {}: connection refused",
                keys.join(" ")
            )));
        }
        self.batches.lock().unwrap().push(keys.to_vec());
        Ok(())
    }
}
