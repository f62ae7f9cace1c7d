//! Theme API endpoints.

use axum::{extract::State, http::HeaderMap, Json};

use super::{success, ApiResult};
use crate::auth::resolve_viewer;
use crate::models::{CreateThemeRequest, Theme};
use crate::AppState;

/// GET /api/themes - List all themes, ordered by name.
pub async fn list_themes(State(state): State<AppState>) -> ApiResult<Vec<Theme>> {
    let themes = state.repo.list_themes().await?;
    success(themes)
}

/// POST /api/themes - Find or create a theme by name.
///
/// Idempotent: posting an existing name (in any casing) returns the
/// existing theme rather than erroring.
pub async fn create_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateThemeRequest>,
) -> ApiResult<Theme> {
    resolve_viewer(&state, &headers).await?;

    let theme = state.repo.find_or_create_theme(&request.name).await?;
    success(theme)
}
