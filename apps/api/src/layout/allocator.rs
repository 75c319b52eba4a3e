//! Slot Allocator — deterministic first-fit placement over a page grid.
//!
//! # Rules
//! - Free runs are scanned in ascending start order; the first run long enough wins.
//! - `FULL` only fits an entirely empty page and then owns every unit of it.
//! - The same sequence of calls always yields the same slots, which is what makes
//!   replaying a page in `display_order` reproducible.

use thiserror::Error;
use uuid::Uuid;

use crate::layout::grid::{Grid, GridError, SlotSpan};
use crate::models::placement::SizeTier;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error(
        "insufficient capacity for {tier}: needs {required} contiguous units, \
         largest free run is {largest_free_run} ({free_units} units free)"
    )]
    InsufficientCapacity {
        tier: SizeTier,
        required: usize,
        largest_free_run: usize,
        free_units: usize,
    },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Fixed unit cost of each size tier.
pub fn required_units(tier: SizeTier) -> usize {
    match tier {
        SizeTier::Single => 1,
        SizeTier::Quarter => 2,
        SizeTier::Half => 4,
        SizeTier::Full => 8,
    }
}

/// Units the tier actually occupies on this grid. `FULL` takes the whole page.
pub fn occupied_units(grid: &Grid, tier: SizeTier) -> usize {
    match tier {
        SizeTier::Full => grid.capacity(),
        other => required_units(other),
    }
}

/// Finds the start index where `tier` would be placed, without mutating the grid.
pub fn find_placement(grid: &Grid, tier: SizeTier) -> Result<usize, AllocationError> {
    let runs = grid.free_runs();
    let needed = occupied_units(grid, tier);

    let found = match tier {
        SizeTier::Full => grid.is_empty().then_some(0),
        _ => runs.iter().find(|r| r.len >= needed).map(|r| r.start),
    };

    found.ok_or_else(|| AllocationError::InsufficientCapacity {
        tier,
        required: required_units(tier),
        largest_free_run: runs.iter().map(|r| r.len).max().unwrap_or(0),
        free_units: grid.free_units(),
    })
}

/// Finds a slot for `tier` and records `owner` there.
pub fn allocate(
    grid: &mut Grid,
    tier: SizeTier,
    owner: Uuid,
) -> Result<SlotSpan, AllocationError> {
    let start = find_placement(grid, tier)?;
    let len = occupied_units(grid, tier);
    grid.occupy(start, len, owner)?;
    Ok(SlotSpan { start, len })
}
