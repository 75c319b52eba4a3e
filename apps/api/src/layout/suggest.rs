//! Suggestion Ranker — which size tiers fit a page, best choice first.

use uuid::Uuid;

use crate::layout::conflict::{detect_conflicts, ReplayError};
use crate::models::placement::{ContentType, Placement, SizeTier};

/// Preferred tier order per content type.
pub fn preference_order(content_type: ContentType) -> [SizeTier; 4] {
    use SizeTier::*;
    match content_type {
        ContentType::Voucher => [Single, Quarter, Half, Full],
        ContentType::Ad => [Quarter, Half, Single, Full],
        ContentType::Image => [Half, Full, Quarter, Single],
        ContentType::Text => [Single, Quarter, Half, Full],
    }
}

/// Evaluates every tier as a hypothetical candidate and returns the feasible ones
/// ordered by `preference_order`. Empty when nothing fits.
pub fn suggest_tiers(
    capacity: usize,
    existing: &[Placement],
    content_type: ContentType,
    exclude_id: Option<Uuid>,
) -> Result<Vec<SizeTier>, ReplayError> {
    let preferences = preference_order(content_type);

    let mut feasible = Vec::new();
    for &tier in SizeTier::ALL {
        if detect_conflicts(capacity, existing, tier, exclude_id)?.is_valid {
            feasible.push(tier);
        }
    }

    feasible.sort_by_key(|tier| {
        preferences
            .iter()
            .position(|p| p == tier)
            .unwrap_or(preferences.len())
    });
    Ok(feasible)
}
