//! Global search API endpoints.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use super::{parse_csv_filter, success, ApiResult};
use crate::auth::resolve_viewer;
use crate::db::SearchHitData;
use crate::models::{ContentKind, Theme};
use crate::policy::{self, ItemScope, Viewer};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Comma-separated theme ids; matches items tagged with at least one.
    #[serde(default)]
    pub themes: Option<String>,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search result with hits and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub themes: Vec<Theme>,
    pub score: f32,
}

/// Maximum number of search results allowed per page.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Search across all content kinds.
///
/// Candidates are ranked first, then filtered for visibility and theme
/// overlap, and only then paginated, so a limit never hides matching items
/// behind filtered-out ones.
pub async fn global_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let viewer = resolve_viewer(&state, &headers).await?;
    let limit = params.limit.min(MAX_SEARCH_LIMIT);
    let theme_ids = parse_csv_filter(params.themes.as_deref());
    let term = params.q.trim();

    let mut filtered: Vec<SearchResultItem> = Vec::new();

    if !term.is_empty() {
        let candidates = state.search.search(term)?;
        for candidate in candidates {
            let Some(hit) = state
                .repo
                .hydrate_search_hit(candidate.kind, &candidate.id)
                .await?
            else {
                // Deleted since the index last committed
                continue;
            };
            if !hit_matches(&viewer, &hit, theme_ids.as_deref()) {
                continue;
            }
            filtered.push(result_item(hit, candidate.score));
        }
    } else if theme_ids.is_some() {
        // Theme-only search: no text relevance, newest first.
        let mut hits: Vec<SearchHitData> = state
            .repo
            .all_search_hits()
            .await?
            .into_iter()
            .filter(|hit| hit_matches(&viewer, hit, theme_ids.as_deref()))
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        filtered = hits.into_iter().map(|hit| result_item(hit, 0.0)).collect();
    }

    let total = filtered.len();
    let results: Vec<SearchResultItem> =
        filtered.into_iter().skip(params.offset).take(limit).collect();

    success(SearchResponse {
        results,
        total,
        limit,
        offset: params.offset,
    })
}

/// Visibility and theme-overlap filter for one hydrated hit.
fn hit_matches(viewer: &Viewer, hit: &SearchHitData, theme_ids: Option<&[String]>) -> bool {
    let scope = ItemScope {
        owner_id: &hit.owner_id,
        visibility: hit.visibility,
        team_id: hit.team_id.as_deref(),
    };
    if !policy::visible(viewer, &scope) {
        return false;
    }
    match theme_ids {
        Some(ids) => hit.themes.iter().any(|theme| ids.contains(&theme.id)),
        None => true,
    }
}

fn result_item(hit: SearchHitData, score: f32) -> SearchResultItem {
    SearchResultItem {
        id: hit.id,
        kind: hit.kind,
        title: hit.title,
        preview: hit.preview,
        themes: hit.themes,
        score,
    }
}
