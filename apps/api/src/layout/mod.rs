// Page layout allocation engine.
// Pure, synchronous and deterministic: every decision is recomputed from the page's
// active placements, so nothing here holds state between requests.

pub mod allocator;
pub mod conflict;
pub mod grid;
pub mod suggest;

use serde::{Deserialize, Serialize};

// Re-export the public API consumed by the placement service and handlers.
pub use conflict::{detect_conflicts, replay_page, PageLayout, ReplayError, ValidationResult};
pub use suggest::suggest_tiers;

/// Units on a page when nothing else is configured.
pub const DEFAULT_PAGE_CAPACITY: usize = 8;

/// Layout parameters shared by every page the service allocates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Units per page. Never below `allocator::required_units(SizeTier::Full)`.
    pub capacity: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_PAGE_CAPACITY,
        }
    }
}
