//! Takeover API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use super::{deindex_content, index_content, parse_csv_filter, success, ApiResult, ListQuery};
use crate::auth::resolve_viewer;
use crate::errors::AppError;
use crate::models::{
    ContentKind, CreateTakeoverRequest, Takeover, TakeoverListItem, UpdateTakeoverRequest,
};
use crate::AppState;

/// GET /api/takeovers - List takeovers visible to the viewer, optionally
/// filtered by `?themes=slug,slug` (OR semantics).
pub async fn list_takeovers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListQuery>,
) -> ApiResult<Vec<TakeoverListItem>> {
    let viewer = resolve_viewer(&state, &headers).await?;
    let slugs = parse_csv_filter(params.themes.as_deref());

    let takeovers = state
        .repo
        .list_takeovers_by_themes(&viewer, slugs.as_deref())
        .await?;
    success(takeovers)
}

/// GET /api/takeovers/:id - Get a single takeover.
pub async fn get_takeover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<TakeoverListItem> {
    let viewer = resolve_viewer(&state, &headers).await?;

    match state.repo.get_takeover(&id, &viewer).await? {
        Some(takeover) => success(takeover),
        None => Err(AppError::NotFound(format!("Takeover {} not found", id))),
    }
}

/// POST /api/takeovers - Create a new takeover.
pub async fn create_takeover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTakeoverRequest>,
) -> ApiResult<Takeover> {
    let viewer = resolve_viewer(&state, &headers).await?;

    let takeover = state.repo.create_takeover(&viewer.id, &request).await?;
    index_content(&state, ContentKind::Takeover, &takeover.id).await;
    success(takeover)
}

/// PUT /api/takeovers/:id - Update a takeover (presenter only).
pub async fn update_takeover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateTakeoverRequest>,
) -> ApiResult<Takeover> {
    let viewer = resolve_viewer(&state, &headers).await?;

    let takeover = state.repo.update_takeover(&id, &viewer.id, &request).await?;
    index_content(&state, ContentKind::Takeover, &id).await;
    success(takeover)
}

/// DELETE /api/takeovers/:id - Delete a takeover (presenter only).
pub async fn delete_takeover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let viewer = resolve_viewer(&state, &headers).await?;

    state.repo.delete_takeover(&id, &viewer.id).await?;
    deindex_content(&state, &id).await;
    success(())
}
