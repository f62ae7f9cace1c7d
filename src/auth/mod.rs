//! Authentication module.
//!
//! Service-level PSK auth with constant-time comparison to mitigate timing
//! attacks, viewer identification from the gateway-supplied profile header,
//! and the email-domain allow-list used at sign-up.

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::errors::{codes, AppError, ErrorDetails, ErrorResponse};
use crate::policy::Viewer;
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the authenticated viewer's profile id. The identity
/// proxy in front of this service sets it; the PSK authenticates the proxy.
pub const PROFILE_ID_HEADER: &str = "x-profile-id";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    // Get the API key from the request header
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match provided {
        Some(provided_key) => {
            // Constant-time comparison to prevent timing attacks
            if constant_time_compare(&provided_key, &expected) {
                next.run(request).await
            } else {
                unauthorized_response("Invalid API key")
            }
        }
        None => {
            // Also check Authorization header as bearer token
            let bearer = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string());

            match bearer {
                Some(bearer_key) if constant_time_compare(&bearer_key, &expected) => {
                    next.run(request).await
                }
                _ => unauthorized_response("Missing or invalid API key"),
            }
        }
    }
}

/// Resolve the full profile of the caller from the profile header. Scoped
/// reads and all mutations require a known profile.
pub async fn resolve_viewer_profile(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<crate::models::Profile, AppError> {
    let profile_id = headers
        .get(PROFILE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized(format!("Missing {} header", PROFILE_ID_HEADER))
        })?;

    state
        .repo
        .get_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("Unknown profile {}", profile_id)))
}

/// Resolve the viewer attributes the visibility policy consumes.
pub async fn resolve_viewer(state: &AppState, headers: &HeaderMap) -> Result<Viewer, AppError> {
    let profile = resolve_viewer_profile(state, headers).await?;
    Ok(Viewer {
        id: profile.id,
        team_id: profile.team_id,
    })
}

/// Whether an email address belongs to the allowed sign-up domain.
pub fn is_allowed_email(email: &str, allowed_domain: &str) -> bool {
    email
        .to_lowercase()
        .ends_with(&format!("@{}", allowed_domain.to_lowercase()))
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Constant-time comparison
    a_bytes.ct_eq(b_bytes).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
        },
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }

    #[test]
    fn test_allowed_email_domain() {
        assert!(is_allowed_email("jo@example.org", "example.org"));
        assert!(is_allowed_email("Jo@Example.ORG", "example.org"));
        assert!(!is_allowed_email("jo@elsewhere.com", "example.org"));
        assert!(!is_allowed_email("jo@notexample.org.evil.com", "example.org"));
    }
}
