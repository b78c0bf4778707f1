//! JSON error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

/// An error returned to the client as a JSON object with a single field.
///
/// Account endpoints use `{"detail": ...}`; the ask endpoint uses
/// `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    field: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn detail(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            field: "detail",
            message: message.into(),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            field: "error",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}: {}", self.status, self.message);
        }
        let mut body = Map::new();
        body.insert(self.field.to_string(), Value::String(self.message));
        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl From<docrag_core::AppError> for ApiError {
    fn from(err: docrag_core::AppError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::error(rejection.status(), rejection.body_text())
    }
}
