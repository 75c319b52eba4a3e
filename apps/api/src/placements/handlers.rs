use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::layout::{PageLayout, ValidationResult};
use crate::models::placement::{
    ContentType, NewPlacement, PageRef, Placement, PlacementPatch, ReorderEntry, SizeTier,
};
use crate::placements::service::{parse_booklet_id, parse_placement_id};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub placements: Vec<ReorderEntry>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub size_tier: SizeTier,
    #[serde(default)]
    pub exclude_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct SuggestQuery {
    pub content_type: ContentType,
    #[serde(default)]
    pub exclude_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub content_type: ContentType,
    pub tiers: Vec<SizeTier>,
}

fn page_ref(booklet_id: &str, page_number: i32) -> Result<PageRef, AppError> {
    Ok(PageRef {
        booklet_id: parse_booklet_id(booklet_id)?,
        page_number,
    })
}

/// POST /api/v1/placements
pub async fn handle_create(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewPlacement>,
) -> Result<(StatusCode, Json<Placement>), AppError> {
    let placement = state.placements.create(req).await?;
    Ok((StatusCode::CREATED, Json(placement)))
}

/// GET /api/v1/placements/:id
pub async fn handle_get(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<Json<Placement>, AppError> {
    let id = parse_placement_id(&id)?;
    Ok(Json(state.placements.get(id).await?))
}

/// PATCH /api/v1/placements/:id
pub async fn handle_update(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
    AppJson(patch): AppJson<PlacementPatch>,
) -> Result<Json<Placement>, AppError> {
    let id = parse_placement_id(&id)?;
    Ok(Json(state.placements.update(id, patch).await?))
}

/// DELETE /api/v1/placements/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_placement_id(&id)?;
    state.placements.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/booklets/:booklet_id/placements
pub async fn handle_list_for_book(
    State(state): State<AppState>,
    AppPath(booklet_id): AppPath<String>,
) -> Result<Json<Vec<Placement>>, AppError> {
    let booklet_id = parse_booklet_id(&booklet_id)?;
    Ok(Json(state.placements.list_for_book(booklet_id).await?))
}

/// POST /api/v1/booklets/:booklet_id/placements/reorder
pub async fn handle_reorder(
    State(state): State<AppState>,
    AppPath(booklet_id): AppPath<String>,
    AppJson(req): AppJson<ReorderRequest>,
) -> Result<StatusCode, AppError> {
    let booklet_id = parse_booklet_id(&booklet_id)?;
    state.placements.reorder(booklet_id, &req.placements).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/booklets/:booklet_id/pages/:page/validate
pub async fn handle_validate(
    State(state): State<AppState>,
    AppPath((booklet_id, page)): AppPath<(String, i32)>,
    AppJson(req): AppJson<ValidateRequest>,
) -> Result<Json<ValidationResult>, AppError> {
    let page = page_ref(&booklet_id, page)?;
    let result = state
        .placements
        .validate(page, req.size_tier, req.exclude_id)
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/booklets/:booklet_id/pages/:page/suggestions?content_type=
pub async fn handle_suggest(
    State(state): State<AppState>,
    AppPath((booklet_id, page)): AppPath<(String, i32)>,
    AppQuery(params): AppQuery<SuggestQuery>,
) -> Result<Json<SuggestResponse>, AppError> {
    let page = page_ref(&booklet_id, page)?;
    let tiers = state
        .placements
        .suggest(page, params.content_type, params.exclude_id)
        .await?;
    Ok(Json(SuggestResponse {
        content_type: params.content_type,
        tiers,
    }))
}

/// GET /api/v1/booklets/:booklet_id/pages/:page/occupancy
pub async fn handle_occupancy(
    State(state): State<AppState>,
    AppPath((booklet_id, page)): AppPath<(String, i32)>,
) -> Result<Json<PageLayout>, AppError> {
    let page = page_ref(&booklet_id, page)?;
    Ok(Json(state.placements.page_occupancy(page).await?))
}
