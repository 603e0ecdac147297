use super::AppState;
use crate::error::Error;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

const API_KEY_HEADER: &str = "x-api-key";

/// Checks `X-API-Key` against the key loaded at startup. Applied to every
/// route except `GET /health` (§6.1).
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() || provided != state.api_key.as_ref() {
        return Err(Error::Unauthorized);
    }
    Ok(next.run(request).await)
}
