// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub code: &'static str,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code.to_string(),
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert relay_core errors to HTTP errors
impl From<relay_core::Error> for AppError {
    fn from(err: relay_core::Error) -> Self {
        use relay_core::Error;

        let code = err.code();
        match err {
            Error::Unauthenticated(msg) => Self::new(StatusCode::UNAUTHORIZED, code, msg),
            Error::InvalidMessage(msg) => Self::new(StatusCode::BAD_REQUEST, code, msg),
            Error::PermissionDenied(msg) => Self::new(StatusCode::FORBIDDEN, code, msg),
            Error::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, code, msg),
            err @ Error::NoActiveStream(_) => Self::new(StatusCode::CONFLICT, code, err.to_string()),
            err if err.is_retryable() => {
                tracing::error!("Backing store error: {}", err);
                Self::service_unavailable("Service temporarily unavailable")
            }
            err => {
                tracing::error!("Internal error: {}", err);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

/// Undecodable protobuf bodies
impl From<prost::DecodeError> for AppError {
    fn from(err: prost::DecodeError) -> Self {
        Self::bad_request(format!("Invalid protobuf body: {err}"))
    }
}
