//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod auth;
mod postcards;
mod profiles;
mod search;
mod takeovers;
mod teams;
mod themes;
mod three_two_one;

pub use auth::*;
pub use postcards::*;
pub use profiles::*;
pub use search::*;
pub use takeovers::*;
pub use teams::*;
pub use themes::*;
pub use three_two_one::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::ContentKind;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Query parameters for theme-filtered list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Comma-separated theme slugs; absent or empty means no filter.
    #[serde(default)]
    pub themes: Option<String>,
}

/// Parse a comma-separated filter value into a slug list.
pub(crate) fn parse_csv_filter(raw: Option<&str>) -> Option<Vec<String>> {
    let values: Vec<String> = raw?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Re-index one content item after a write; index failures are logged, not
/// surfaced, since the store is the source of truth.
pub(crate) async fn index_content(state: &AppState, kind: ContentKind, id: &str) {
    match state.repo.hydrate_search_hit(kind, id).await {
        Ok(Some(hit)) => {
            if let Err(e) = state.search.index_item(&hit).await {
                tracing::warn!("Failed to index {} {}: {}", kind.as_str(), id, e);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to load {} {} for indexing: {}", kind.as_str(), id, e),
    }
}

/// Drop one content item from the search index after deletion.
pub(crate) async fn deindex_content(state: &AppState, id: &str) {
    if let Err(e) = state.search.remove_item(id).await {
        tracing::warn!("Failed to remove {} from index: {}", id, e);
    }
}
