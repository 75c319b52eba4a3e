pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::placements::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Placements
        .route("/api/v1/placements", post(handlers::handle_create))
        .route(
            "/api/v1/placements/:id",
            get(handlers::handle_get)
                .patch(handlers::handle_update)
                .delete(handlers::handle_delete),
        )
        // Booklet-scoped views
        .route(
            "/api/v1/booklets/:booklet_id/placements",
            get(handlers::handle_list_for_book),
        )
        .route(
            "/api/v1/booklets/:booklet_id/placements/reorder",
            post(handlers::handle_reorder),
        )
        .route(
            "/api/v1/booklets/:booklet_id/pages/:page/validate",
            post(handlers::handle_validate),
        )
        .route(
            "/api/v1/booklets/:booklet_id/pages/:page/suggestions",
            get(handlers::handle_suggest),
        )
        .route(
            "/api/v1/booklets/:booklet_id/pages/:page/occupancy",
            get(handlers::handle_occupancy),
        )
        .with_state(state)
}
