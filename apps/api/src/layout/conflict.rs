//! Conflict Detector — validates a candidate placement against a page's true occupancy.
//!
//! # Algorithm
//! 1. Keep the page's active placements (minus an optional excluded id) and sort
//!    them by `(display_order, id)`. This canonical order is the only replay order.
//! 2. Replay them through the allocator into a fresh grid. A failure here means the
//!    persisted page is already corrupt and is reported as `ReplayError`.
//! 3. Allocate the candidate last.
//!
//! "Does not fit" is a normal `ValidationResult`, never an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::layout::allocator::{allocate, find_placement, AllocationError};
use crate::layout::grid::{Grid, SlotSpan};
use crate::models::placement::{Placement, SizeTier};

pub const EMPTY_PAGE_WARNING: &str =
    "page is otherwise empty; consider FULL for maximum visibility";
pub const PAGE_FILLED_WARNING: &str = "placement fills the page; no capacity remains";

/// Raised when previously accepted placements can no longer be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("replay of placement {placement_id} ({tier}) failed: {source}")]
pub struct ReplayError {
    pub placement_id: Uuid,
    pub tier: SizeTier,
    #[source]
    pub source: AllocationError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Existing placements blocking the candidate, in replay order.
    pub conflicting_placement_ids: Vec<Uuid>,
    /// Where the candidate would land if it fits.
    pub candidate_slot: Option<SlotSpan>,
    /// Free units left on the page: after the candidate when valid, before it otherwise.
    pub remaining_units: usize,
}

/// A placement's position after replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedSlot {
    pub placement_id: Uuid,
    pub size_tier: SizeTier,
    pub display_order: i32,
    pub span: SlotSpan,
}

/// Reconstructed occupancy of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub capacity: usize,
    pub slots: Vec<PlacedSlot>,
    pub free_runs: Vec<SlotSpan>,
    pub used_units: usize,
    pub free_units: usize,
}

/// Active placements minus `exclude_id`, sorted into canonical replay order.
pub fn canonical_order(existing: &[Placement], exclude_id: Option<Uuid>) -> Vec<&Placement> {
    let mut ordered: Vec<&Placement> = existing
        .iter()
        .filter(|p| p.is_active && Some(p.id) != exclude_id)
        .collect();
    ordered.sort_by_key(|p| (p.display_order, p.id));
    ordered
}

fn replay(
    capacity: usize,
    ordered: &[&Placement],
) -> Result<(Grid, Vec<PlacedSlot>), ReplayError> {
    let mut grid = Grid::new(capacity);
    let mut slots = Vec::with_capacity(ordered.len());

    for p in ordered {
        let span = allocate(&mut grid, p.size_tier, p.id).map_err(|source| ReplayError {
            placement_id: p.id,
            tier: p.size_tier,
            source,
        })?;
        slots.push(PlacedSlot {
            placement_id: p.id,
            size_tier: p.size_tier,
            display_order: p.display_order,
            span,
        });
    }
    Ok((grid, slots))
}

/// Replays the page and reports where every active placement sits.
pub fn replay_page(
    capacity: usize,
    existing: &[Placement],
    exclude_id: Option<Uuid>,
) -> Result<PageLayout, ReplayError> {
    let ordered = canonical_order(existing, exclude_id);
    let (grid, slots) = replay(capacity, &ordered)?;
    Ok(PageLayout {
        capacity,
        slots,
        free_runs: grid.free_runs(),
        used_units: grid.used_units(),
        free_units: grid.free_units(),
    })
}

/// Validates placing `candidate` on a page holding `existing`.
pub fn detect_conflicts(
    capacity: usize,
    existing: &[Placement],
    candidate: SizeTier,
    exclude_id: Option<Uuid>,
) -> Result<ValidationResult, ReplayError> {
    let ordered = canonical_order(existing, exclude_id);
    let (mut grid, _) = replay(capacity, &ordered)?;

    let mut warnings = Vec::new();
    if ordered.is_empty() && candidate != SizeTier::Full {
        warnings.push(EMPTY_PAGE_WARNING.to_string());
    }

    let result = match allocate(&mut grid, candidate, Uuid::nil()) {
        Ok(span) => {
            let remaining_units = grid.free_units();
            if remaining_units == 0 {
                warnings.push(PAGE_FILLED_WARNING.to_string());
            }
            ValidationResult {
                is_valid: true,
                errors: vec![],
                warnings,
                conflicting_placement_ids: vec![],
                candidate_slot: Some(span),
                remaining_units,
            }
        }
        Err(e) => ValidationResult {
            is_valid: false,
            errors: vec![e.to_string()],
            warnings,
            conflicting_placement_ids: attribute_conflicts(capacity, &ordered, candidate),
            candidate_slot: None,
            remaining_units: grid.free_units(),
        },
    };
    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Conflict attribution
// ────────────────────────────────────────────────────────────────────────────

/// Picks the existing placements to blame for a rejected candidate.
///
/// - An existing `FULL` placement conflicts with everything, so it alone is blamed.
/// - A `FULL` candidate is blocked by every existing placement.
/// - Otherwise a placement is blamed when removing it alone lets the candidate fit.
///   When no single removal is enough, the combined occupancy of all of them blocks
///   the candidate and all are reported.
fn attribute_conflicts(
    capacity: usize,
    ordered: &[&Placement],
    candidate: SizeTier,
) -> Vec<Uuid> {
    let all_ids = || ordered.iter().map(|p| p.id).collect::<Vec<_>>();

    let full_ids: Vec<Uuid> = ordered
        .iter()
        .filter(|p| p.size_tier == SizeTier::Full)
        .map(|p| p.id)
        .collect();
    if !full_ids.is_empty() {
        return full_ids;
    }
    if candidate == SizeTier::Full {
        return all_ids();
    }

    let blockers: Vec<Uuid> = ordered
        .iter()
        .enumerate()
        .filter(|(skip, _)| {
            let without: Vec<&Placement> = ordered
                .iter()
                .enumerate()
                .filter(|(i, _)| i != skip)
                .map(|(_, p)| *p)
                .collect();
            fits_after_replay(capacity, &without, candidate)
        })
        .map(|(_, p)| p.id)
        .collect();

    if blockers.is_empty() {
        all_ids()
    } else {
        blockers
    }
}

fn fits_after_replay(capacity: usize, ordered: &[&Placement], candidate: SizeTier) -> bool {
    replay(capacity, ordered)
        .map(|(grid, _)| find_placement(&grid, candidate).is_ok())
        .unwrap_or(false)
}
