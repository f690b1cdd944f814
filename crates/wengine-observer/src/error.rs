//! Interface-level failures.
//!
//! [`ObserverError`] unifies [`wengine_session::SessionError`] and local
//! request-parsing failures into a single enum with an
//! [`IntoResponse`](axum::response::IntoResponse) impl that renders the
//! `{success:false, error}` body shape, never leaking an internal stack
//! trace.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use wengine_session::SessionError;

/// Errors that can occur in the observer HTTP/WS layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// Delegated to [`wengine_session::SessionManager`].
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A query parameter or request body didn't parse.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A path segment wasn't a valid UUID.
    #[error("invalid id: {0}")]
    InvalidUuid(String),
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Session(SessionError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Session(SessionError::InvalidTransition { .. } | SessionError::InvalidParams(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Session(SessionError::Engine(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequest(_) | Self::InvalidUuid(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
