//! API key authentication middleware for the trigger API.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::handlers::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests missing a valid `X-Api-Key` header.
///
/// The comparison against the configured key is constant-time: a timing
/// side-channel that reveals how many leading bytes of a guessed key
/// matched would let an attacker recover the key byte by byte.
pub async fn require_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected = state.app_config.api_key.as_bytes();
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.len() != expected.len() || provided.as_bytes().ct_eq(expected).unwrap_u8() != 1 {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
