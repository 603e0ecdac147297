use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Crate-wide error taxonomy. Every component surfaces one of these kinds;
/// the HTTP layer is the only place that turns a kind into a status code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("fatal: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Invalid(_) => StatusCode::BAD_REQUEST,
            Error::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::SearchUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("row not found".to_string()),
            other => Error::Transient(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Transient(format!("blocking task panicked: {e}"))
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Transient("operation timed out".to_string())
    }
}
