//! # Authentication Module
//!
//! Optional API key authentication for the grader HTTP API.
//!
//! Enabled when `[server] api_key` (or `GRADER_API_KEY`) is set. Every route
//! except `/health` then requires:
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Expected API key shared with the middleware.
pub type ApiKey = Arc<str>;

/// Constant-time key comparison.
///
/// Both keys are padded to the same length so the comparison always covers
/// the same number of bytes regardless of where they differ.
#[must_use]
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
///
/// Accepts both `Bearer <key>` and a raw `<key>` header value.
pub async fn api_key_auth_middleware(
    State(expected): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    // Load balancers probe /health without credentials.
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) => {
            let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);
            if keys_match(provided, &expected) {
                Ok(next.run(request).await)
            } else {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "invalid_api_key",
                    "Authentication failed: invalid API key"
                );
                Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}
