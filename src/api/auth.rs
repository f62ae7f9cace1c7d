//! Auth-adjacent API endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::is_allowed_email;
use crate::errors::AppError;
use crate::AppState;

/// Request body for the sign-up email check.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateEmailRequest {
    pub email: String,
}

/// Response for the sign-up email check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateEmailResponse {
    pub allowed: bool,
    pub domain: String,
}

/// POST /api/auth/validate-email - Check an email against the allow-listed
/// sign-up domain. Called before a profile exists, so no viewer header is
/// required.
pub async fn validate_email(
    State(state): State<AppState>,
    Json(request): Json<ValidateEmailRequest>,
) -> ApiResult<ValidateEmailResponse> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    let domain = state.config.allowed_email_domain.clone();
    let allowed = is_allowed_email(email, &domain);
    success(ValidateEmailResponse { allowed, domain })
}
