//! Placement Orchestrator — the operations exposed to handlers.
//!
//! # Mutation pipeline
//! 1. Booklet exists and its lifecycle allows mutation (`DRAFT` / `READY_FOR_PRINT`).
//! 2. Content contract holds for the (merged) content type and payload.
//! 3. Under the page lock(s): reload the page, run the conflict detector, write.
//! 4. Evict `placement:<id>` and `placements-by-book:<bookletId>`.
//!
//! Read-only operations (`validate`, `suggest`, `page_occupancy`) never fail on an
//! infeasible placement; that is reported inside the result.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::{detect_conflicts, replay_page, suggest_tiers, PageConfig, PageLayout, ValidationResult};
use crate::models::booklet::Booklet;
use crate::models::placement::{
    ContentType, NewPlacement, PageRef, Placement, PlacementContent, PlacementDraft,
    PlacementPatch, ReorderEntry, SizeTier,
};
use crate::placements::cache::{book_list_key, placement_key, CacheInvalidator};
use crate::placements::lifecycle::BookletLifecycle;
use crate::placements::locks::PageLocks;
use crate::placements::store::PlacementStore;

pub struct PlacementService {
    store: Arc<dyn PlacementStore>,
    booklets: Arc<dyn BookletLifecycle>,
    cache: Arc<dyn CacheInvalidator>,
    locks: PageLocks,
    page_config: PageConfig,
}

/// Parses a raw placement id. Malformed ids are reported as not found.
pub fn parse_placement_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(format!("Placement {raw} not found")))
}

/// Parses a raw booklet id. Malformed ids are reported as not found.
pub fn parse_booklet_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(format!("Booklet {raw} not found")))
}

impl PlacementService {
    pub fn new(
        store: Arc<dyn PlacementStore>,
        booklets: Arc<dyn BookletLifecycle>,
        cache: Arc<dyn CacheInvalidator>,
        page_config: PageConfig,
    ) -> Self {
        Self {
            store,
            booklets,
            cache,
            locks: PageLocks::new(),
            page_config,
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Reads
    // ────────────────────────────────────────────────────────────────────────

    pub async fn get(&self, id: Uuid) -> Result<Placement, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Placement {id} not found")))
    }

    pub async fn list_for_book(&self, booklet_id: Uuid) -> Result<Vec<Placement>, AppError> {
        self.require_booklet(booklet_id).await?;
        self.store.find_by_book_id(booklet_id).await
    }

    pub async fn validate(
        &self,
        page: PageRef,
        tier: SizeTier,
        exclude_id: Option<Uuid>,
    ) -> Result<ValidationResult, AppError> {
        check_page_number(page.page_number)?;
        self.require_booklet(page.booklet_id).await?;
        let existing = self.store.find_by_page(page).await?;
        Ok(detect_conflicts(
            self.page_config.capacity,
            &existing,
            tier,
            exclude_id,
        )?)
    }

    pub async fn suggest(
        &self,
        page: PageRef,
        content_type: ContentType,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<SizeTier>, AppError> {
        check_page_number(page.page_number)?;
        self.require_booklet(page.booklet_id).await?;
        let existing = self.store.find_by_page(page).await?;
        Ok(suggest_tiers(
            self.page_config.capacity,
            &existing,
            content_type,
            exclude_id,
        )?)
    }

    pub async fn page_occupancy(&self, page: PageRef) -> Result<PageLayout, AppError> {
        check_page_number(page.page_number)?;
        self.require_booklet(page.booklet_id).await?;
        let existing = self.store.find_by_page(page).await?;
        Ok(replay_page(self.page_config.capacity, &existing, None)?)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Mutations
    // ────────────────────────────────────────────────────────────────────────

    pub async fn create(&self, data: NewPlacement) -> Result<Placement, AppError> {
        check_page_number(data.page_number)?;
        self.require_mutable_booklet(data.booklet_id).await?;
        check_content_contract(data.content_type, &data.content)?;

        let page = PageRef {
            booklet_id: data.booklet_id,
            page_number: data.page_number,
        };
        let _guard = self.locks.acquire(&[page]).await;

        let existing = self.store.find_by_page(page).await?;
        self.ensure_fits(page, &existing, data.size_tier, None)?;

        let draft = PlacementDraft {
            id: Uuid::new_v4(),
            display_order: next_display_order(page, &existing)?,
            placement: data,
        };
        let placement = self.store.create(draft).await?;

        info!(
            "Created placement {} ({} {}) on page {page} at order {}",
            placement.id, placement.content_type, placement.size_tier, placement.display_order
        );
        self.invalidate(&[placement_key(placement.id), book_list_key(placement.booklet_id)])
            .await;
        Ok(placement)
    }

    pub async fn update(&self, id: Uuid, mut patch: PlacementPatch) -> Result<Placement, AppError> {
        if let Some(page_number) = patch.page_number {
            check_page_number(page_number)?;
        }
        // Display order only changes through reorder or a page move.
        patch.display_order = None;
        let snapshot = self.get(id).await?;
        self.require_mutable_booklet(snapshot.booklet_id).await?;

        let source = snapshot.page();
        let target = snapshot.merged_with(&patch).page();
        let _guard = self.locks.acquire(&[source, target]).await;

        let current = self.get(id).await?;
        if current.page() != source {
            return Err(AppError::Validation(format!(
                "Placement {id} moved to another page during the update; retry"
            )));
        }
        let mut merged = current.merged_with(&patch);

        if patch.touches_payload() {
            check_content_contract(merged.content_type, &merged.content)?;
        }

        let moved = target != source;
        let resized = merged.size_tier != current.size_tier;
        let reactivated = merged.is_active && !current.is_active;

        if moved || (merged.is_active && (resized || reactivated)) {
            let destination = self.store.find_by_page(target).await?;
            if moved {
                let order = next_display_order(target, &destination)?;
                patch.display_order = Some(order);
                merged.display_order = order;
            }
            if merged.is_active {
                self.ensure_fits(target, &destination, merged.size_tier, Some(id))?;
                let after = with_replacement(&destination, &merged);
                self.ensure_replayable(target, &after)?;
            }
        }

        let updated = self.store.update(id, &patch).await?;

        info!(
            "Updated placement {id} on page {} ({} {}, active={})",
            updated.page(),
            updated.content_type,
            updated.size_tier,
            updated.is_active
        );
        self.invalidate(&[placement_key(id), book_list_key(updated.booklet_id)])
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let placement = self.get(id).await?;
        self.require_mutable_booklet(placement.booklet_id).await?;

        let _guard = self.locks.acquire(&[placement.page()]).await;
        self.store.delete(id).await?;

        info!("Deleted placement {id} from page {}", placement.page());
        self.invalidate(&[placement_key(id), book_list_key(placement.booklet_id)])
            .await;
        Ok(())
    }

    /// Reassigns display orders for placements of one booklet, all or nothing.
    pub async fn reorder(&self, booklet_id: Uuid, entries: &[ReorderEntry]) -> Result<(), AppError> {
        self.require_mutable_booklet(booklet_id).await?;
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(bad) = entries.iter().find(|e| e.display_order < 1) {
            return Err(AppError::Validation(format!(
                "display_order must be 1 or greater, got {} for placement {}",
                bad.display_order, bad.id
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = entries.iter().find(|e| !seen.insert(e.id)) {
            return Err(AppError::Validation(format!(
                "Placement {} appears more than once in the reorder batch",
                dup.id
            )));
        }

        let snapshot = self.store.find_by_book_id(booklet_id).await?;
        let locked_pages = affected_pages(&snapshot, entries, booklet_id)?;
        let pages: Vec<PageRef> = locked_pages.iter().copied().collect();
        let _guard = self.locks.acquire(&pages).await;

        let current = self.store.find_by_book_id(booklet_id).await?;
        let touched = affected_pages(&current, entries, booklet_id)?;
        if !touched.is_subset(&locked_pages) {
            return Err(AppError::Validation(format!(
                "Placements of booklet {booklet_id} moved during the reorder; retry"
            )));
        }

        let new_orders: HashMap<Uuid, i32> =
            entries.iter().map(|e| (e.id, e.display_order)).collect();
        for page in &touched {
            let after: Vec<Placement> = current
                .iter()
                .filter(|p| p.page() == *page)
                .map(|p| {
                    let mut p = p.clone();
                    if let Some(order) = new_orders.get(&p.id) {
                        p.display_order = *order;
                    }
                    p
                })
                .collect();

            let mut orders = HashSet::new();
            if let Some(clash) = after.iter().find(|p| !orders.insert(p.display_order)) {
                return Err(AppError::Validation(format!(
                    "Display order {} is used twice on page {page}",
                    clash.display_order
                )));
            }
            self.ensure_replayable(*page, &after)?;
        }

        self.store.reorder_batch(booklet_id, entries).await?;

        info!(
            "Reordered {} placements across {} page(s) of booklet {booklet_id}",
            entries.len(),
            touched.len()
        );
        let mut keys = vec![book_list_key(booklet_id)];
        keys.extend(entries.iter().map(|e| placement_key(e.id)));
        self.invalidate(&keys).await;
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ────────────────────────────────────────────────────────────────────────

    async fn require_booklet(&self, booklet_id: Uuid) -> Result<Booklet, AppError> {
        match self.booklets.find_booklet(booklet_id).await? {
            Some(booklet) if booklet.is_active => Ok(booklet),
            _ => Err(AppError::NotFound(format!("Booklet {booklet_id} not found"))),
        }
    }

    async fn require_mutable_booklet(&self, booklet_id: Uuid) -> Result<Booklet, AppError> {
        let booklet = self.require_booklet(booklet_id).await?;
        if !booklet.status.allows_mutation() {
            warn!(
                "Rejected placement mutation on booklet {booklet_id}: status is {}",
                booklet.status
            );
            return Err(AppError::BusinessRule(format!(
                "Booklet {booklet_id} is {}; its placements can no longer be modified",
                booklet.status
            )));
        }
        Ok(booklet)
    }

    fn ensure_fits(
        &self,
        page: PageRef,
        existing: &[Placement],
        tier: SizeTier,
        exclude_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let result = detect_conflicts(self.page_config.capacity, existing, tier, exclude_id)?;
        if result.is_valid {
            return Ok(());
        }

        let conflicts = result
            .conflicting_placement_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        warn!("Rejected {tier} on page {page}: {}", result.errors.join("; "));
        Err(AppError::Validation(format!(
            "{tier} does not fit on page {page}: {}; conflicting placements: [{conflicts}]",
            result.errors.join("; ")
        )))
    }

    /// Rejects a change that would leave the page impossible to replay in order.
    fn ensure_replayable(&self, page: PageRef, after: &[Placement]) -> Result<(), AppError> {
        replay_page(self.page_config.capacity, after, None)
            .map(|_| ())
            .map_err(|e| {
                AppError::Validation(format!("change would leave page {page} unplaceable: {e}"))
            })
    }

    /// Evicts cache keys in one batch. The write has already committed, so
    /// failures are logged only.
    async fn invalidate(&self, keys: &[String]) {
        if let Err(e) = self.cache.evict_all(keys).await {
            warn!("Cache eviction failed for {}: {e}", keys.join(", "));
        }
    }
}

fn check_page_number(page_number: i32) -> Result<(), AppError> {
    if page_number < 1 {
        return Err(AppError::Validation(format!(
            "page_number must be 1 or greater, got {page_number}"
        )));
    }
    Ok(())
}

fn check_content_contract(
    content_type: ContentType,
    content: &PlacementContent,
) -> Result<(), AppError> {
    let missing = content.missing_fields(content_type);
    if missing.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
    Err(AppError::Validation(format!(
        "{content_type} placements require: {}",
        names.join(", ")
    )))
}

/// One past the highest order on the page, or 1 on an empty page.
fn next_display_order(page: PageRef, existing: &[Placement]) -> Result<i32, AppError> {
    existing
        .iter()
        .map(|p| p.display_order)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "page {page} has no display order left after {}; reorder its placements first",
                i32::MAX
            ))
        })
}

/// The page as it would be stored once `updated` replaces (or joins) it.
fn with_replacement(page: &[Placement], updated: &Placement) -> Vec<Placement> {
    let mut after: Vec<Placement> = page.iter().filter(|p| p.id != updated.id).cloned().collect();
    after.push(updated.clone());
    after
}

/// Pages touched by a reorder batch. Fails on the first id outside the booklet.
fn affected_pages(
    placements: &[Placement],
    entries: &[ReorderEntry],
    booklet_id: Uuid,
) -> Result<BTreeSet<PageRef>, AppError> {
    let by_id: HashMap<Uuid, &Placement> = placements.iter().map(|p| (p.id, p)).collect();
    entries
        .iter()
        .map(|entry| {
            by_id.get(&entry.id).map(|p| p.page()).ok_or_else(|| {
                AppError::Validation(format!(
                    "Placement {} does not belong to booklet {booklet_id}",
                    entry.id
                ))
            })
        })
        .collect()
}
