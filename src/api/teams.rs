//! Team API endpoints.

use axum::{extract::State, http::HeaderMap, Json};

use super::{success, ApiResult};
use crate::auth::resolve_viewer;
use crate::models::{CreateTeamRequest, Team};
use crate::AppState;

/// GET /api/teams - List all teams.
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Vec<Team>> {
    let teams = state.repo.list_teams().await?;
    success(teams)
}

/// POST /api/teams - Create a new team.
pub async fn create_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<Team> {
    resolve_viewer(&state, &headers).await?;

    let team = state.repo.create_team(&request).await?;
    success(team)
}
