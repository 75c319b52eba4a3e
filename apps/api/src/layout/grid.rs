//! Grid Model — occupancy ledger for a single page.
//!
//! A page is a flat array of capacity units, each free or owned by exactly one
//! placement. The grid holds no placement rules; the allocator decides where
//! things go and the grid only records it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A contiguous span of units, used both for free runs and for occupied slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpan {
    pub start: usize,
    pub len: usize,
}

impl SlotSpan {
    /// Index one past the last unit of the span.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("span {start}..{end} is outside a page of {capacity} units")]
    OutOfBounds {
        start: usize,
        end: usize,
        capacity: usize,
    },

    #[error("unit {index} is already owned by placement {owner}")]
    AlreadyOccupied { index: usize, owner: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    units: Vec<Option<Uuid>>,
}

impl Grid {
    pub fn new(capacity: usize) -> Self {
        Self {
            units: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.units.len()
    }

    pub fn owner_at(&self, index: usize) -> Option<Uuid> {
        self.units.get(index).copied().flatten()
    }

    pub fn used_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_some()).count()
    }

    pub fn free_units(&self) -> usize {
        self.capacity() - self.used_units()
    }

    pub fn is_empty(&self) -> bool {
        self.units.iter().all(Option::is_none)
    }

    /// Contiguous free spans in ascending start order.
    pub fn free_runs(&self) -> Vec<SlotSpan> {
        let mut runs = Vec::new();
        let mut run_start: Option<usize> = None;

        for (i, unit) in self.units.iter().enumerate() {
            match (unit, run_start) {
                (None, None) => run_start = Some(i),
                (Some(_), Some(start)) => {
                    runs.push(SlotSpan {
                        start,
                        len: i - start,
                    });
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            runs.push(SlotSpan {
                start,
                len: self.capacity() - start,
            });
        }
        runs
    }

    /// Marks `len` units starting at `start` as owned by `owner`.
    /// Nothing is written unless the whole span is free.
    pub fn occupy(&mut self, start: usize, len: usize, owner: Uuid) -> Result<(), GridError> {
        let end = start + len;
        if end > self.capacity() {
            return Err(GridError::OutOfBounds {
                start,
                end,
                capacity: self.capacity(),
            });
        }
        if let Some((index, existing)) =
            (start..end).find_map(|i| self.owner_at(i).map(|o| (i, o)))
        {
            return Err(GridError::AlreadyOccupied {
                index,
                owner: existing,
            });
        }
        for unit in &mut self.units[start..end] {
            *unit = Some(owner);
        }
        Ok(())
    }

    /// Frees every unit owned by `owner` and returns how many were freed.
    pub fn release(&mut self, owner: Uuid) -> usize {
        let mut freed = 0;
        for unit in self.units.iter_mut().filter(|u| **u == Some(owner)) {
            *unit = None;
            freed += 1;
        }
        freed
    }
}
