//! Postcard API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use super::{deindex_content, index_content, parse_csv_filter, success, ApiResult, ListQuery};
use crate::auth::resolve_viewer;
use crate::errors::AppError;
use crate::models::{
    ContentKind, CreatePostcardRequest, Postcard, PostcardListItem, UpdatePostcardRequest,
};
use crate::AppState;

/// GET /api/postcards - List postcards visible to the viewer, optionally
/// filtered by `?themes=slug,slug` (OR semantics).
pub async fn list_postcards(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListQuery>,
) -> ApiResult<Vec<PostcardListItem>> {
    let viewer = resolve_viewer(&state, &headers).await?;
    let slugs = parse_csv_filter(params.themes.as_deref());

    let postcards = state
        .repo
        .list_postcards_by_themes(&viewer, slugs.as_deref())
        .await?;
    success(postcards)
}

/// GET /api/postcards/:id - Get a single postcard.
pub async fn get_postcard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<PostcardListItem> {
    let viewer = resolve_viewer(&state, &headers).await?;

    match state.repo.get_postcard(&id, &viewer).await? {
        Some(postcard) => success(postcard),
        None => Err(AppError::NotFound(format!("Postcard {} not found", id))),
    }
}

/// POST /api/postcards - Create a new postcard.
pub async fn create_postcard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreatePostcardRequest>,
) -> ApiResult<Postcard> {
    let viewer = resolve_viewer(&state, &headers).await?;

    let postcard = state.repo.create_postcard(&viewer.id, &request).await?;
    index_content(&state, ContentKind::Postcard, &postcard.id).await;
    success(postcard)
}

/// PUT /api/postcards/:id - Update a postcard (author only).
pub async fn update_postcard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdatePostcardRequest>,
) -> ApiResult<Postcard> {
    let viewer = resolve_viewer(&state, &headers).await?;

    let postcard = state.repo.update_postcard(&id, &viewer.id, &request).await?;
    index_content(&state, ContentKind::Postcard, &id).await;
    success(postcard)
}

/// DELETE /api/postcards/:id - Delete a postcard (author only).
pub async fn delete_postcard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let viewer = resolve_viewer(&state, &headers).await?;

    state.repo.delete_postcard(&id, &viewer.id).await?;
    deindex_content(&state, &id).await;
    success(())
}
