//! Profile API endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use super::{success, ApiResult};
use crate::auth::resolve_viewer_profile;
use crate::errors::AppError;
use crate::models::{CreateProfileRequest, Profile, Role, UpdateProfileRequest};
use crate::AppState;

/// GET /api/profiles - List all profiles.
pub async fn list_profiles(State(state): State<AppState>) -> ApiResult<Vec<Profile>> {
    let profiles = state.repo.list_profiles().await?;
    success(profiles)
}

/// GET /api/profiles/:id - Get a single profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Profile> {
    match state.repo.get_profile(&id).await? {
        Some(profile) => success(profile),
        None => Err(AppError::NotFound(format!("Profile {} not found", id))),
    }
}

/// POST /api/profiles - Create a profile.
///
/// Part of the first-login flow, so no viewer header is required yet; the
/// PSK still gates the call.
pub async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> ApiResult<Profile> {
    let profile = state.repo.create_profile(&request).await?;
    success(profile)
}

/// PUT /api/profiles/:id - Update a profile (self or admin).
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Profile> {
    let caller = resolve_viewer_profile(&state, &headers).await?;
    if caller.id != id && caller.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only the profile owner or an admin can modify a profile".to_string(),
        ));
    }

    let profile = state.repo.update_profile(&id, &request).await?;
    success(profile)
}
