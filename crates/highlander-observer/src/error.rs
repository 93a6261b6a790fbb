//! Error types for the operator API.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use highlander_core::ManagerError;

/// Errors that can occur in the operator API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// No simulation has been started yet.
    #[error("no simulation has been started")]
    NotRunning,

    /// The request body or parameters were rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Health locks could not be acquired in time.
    #[error("immortal locks unavailable: {0}")]
    LocksUnavailable(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ManagerError> for ObserverError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::InvalidParams(msg) => Self::InvalidRequest(msg),
            ManagerError::NoRuntime(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotRunning => (StatusCode::CONFLICT, self.to_string()),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::LocksUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
