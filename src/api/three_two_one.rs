//! 3-2-1 reflection API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use super::{deindex_content, index_content, parse_csv_filter, success, ApiResult, ListQuery};
use crate::auth::resolve_viewer;
use crate::errors::AppError;
use crate::models::{
    ContentKind, CreateThreeTwoOneRequest, ThreeTwoOne, ThreeTwoOneListItem,
    UpdateThreeTwoOneRequest,
};
use crate::AppState;

/// GET /api/three-two-one - List 3-2-1 entries visible to the viewer,
/// optionally filtered by `?themes=slug,slug` (OR semantics).
pub async fn list_three_two_ones(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListQuery>,
) -> ApiResult<Vec<ThreeTwoOneListItem>> {
    let viewer = resolve_viewer(&state, &headers).await?;
    let slugs = parse_csv_filter(params.themes.as_deref());

    let entries = state
        .repo
        .list_three_two_ones_by_themes(&viewer, slugs.as_deref())
        .await?;
    success(entries)
}

/// GET /api/three-two-one/:id - Get a single 3-2-1 entry.
pub async fn get_three_two_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ThreeTwoOneListItem> {
    let viewer = resolve_viewer(&state, &headers).await?;

    match state.repo.get_three_two_one(&id, &viewer).await? {
        Some(entry) => success(entry),
        None => Err(AppError::NotFound(format!("3-2-1 entry {} not found", id))),
    }
}

/// POST /api/three-two-one - Create a new 3-2-1 entry.
pub async fn create_three_two_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateThreeTwoOneRequest>,
) -> ApiResult<ThreeTwoOne> {
    let viewer = resolve_viewer(&state, &headers).await?;

    let entry = state.repo.create_three_two_one(&viewer.id, &request).await?;
    index_content(&state, ContentKind::ThreeTwoOne, &entry.id).await;
    success(entry)
}

/// PUT /api/three-two-one/:id - Update a 3-2-1 entry (author only).
pub async fn update_three_two_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateThreeTwoOneRequest>,
) -> ApiResult<ThreeTwoOne> {
    let viewer = resolve_viewer(&state, &headers).await?;

    let entry = state
        .repo
        .update_three_two_one(&id, &viewer.id, &request)
        .await?;
    index_content(&state, ContentKind::ThreeTwoOne, &id).await;
    success(entry)
}

/// DELETE /api/three-two-one/:id - Delete a 3-2-1 entry (author only).
pub async fn delete_three_two_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let viewer = resolve_viewer(&state, &headers).await?;

    state.repo.delete_three_two_one(&id, &viewer.id).await?;
    deindex_content(&state, &id).await;
    success(())
}
