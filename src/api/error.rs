//! Mapping of engine errors onto HTTP responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::catalog::DeleteReport;
use crate::error::GateError;

/// Everything a handler can fail with. Bodies are always JSON objects with a
/// `message` field.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or rejected Basic credentials.
    Unauthorized,
    /// Body that could not be parsed.
    BadRequest(String),
    /// Some parts of a message could not be deleted.
    PartialDelete(DeleteReport),
    /// Blocking task panicked or was cancelled.
    Internal(String),
    Gate(GateError),
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        Self::Gate(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PartialDelete(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Gate(e) => match e {
                GateError::Validation(_) | GateError::NotFound(_) => StatusCode::NOT_FOUND,
                GateError::Encoding(_) => StatusCode::BAD_REQUEST,
                GateError::GateTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "Request failed");
        }
        match self {
            Self::Unauthorized => (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"smsgate\"")],
                Json(json!({ "message": "Unauthorized Access" })),
            )
                .into_response(),
            Self::PartialDelete(report) => (
                status,
                Json(json!({
                    "message": "Some parts of the message could not be deleted",
                    "deleted": report.deleted,
                    "failed": report.failed,
                })),
            )
                .into_response(),
            Self::BadRequest(message) | Self::Internal(message) => {
                (status, Json(json!({ "message": message }))).into_response()
            }
            Self::Gate(e) => (status, Json(json!({ "message": e.to_string() }))).into_response(),
        }
    }
}
