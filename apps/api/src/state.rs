use std::sync::Arc;

use crate::placements::service::PlacementService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Placement orchestrator. Its store, booklet lookup and cache ports are
    /// chosen at startup (Postgres + Redis in production, in-memory in tests).
    pub placements: Arc<PlacementService>,
}
