use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::types::ErrorResponse;
use crate::error::ExecError;

/// Error returned by a handler, rendered as `{"success": false, "error": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request body: missing field, unknown enum value, no commands.
    #[error("{0}")]
    BadRequest(String),

    #[error("Result not found")]
    NotFound,

    /// Anything raised while talking to a device.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ExecError> for ApiError {
    fn from(err: ExecError) -> Self {
        if err.is_validation() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_errors_map_to_status_codes() {
        let bad: ApiError = ExecError::validation("No commands specified").into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.to_string(), "No commands specified");

        let failed: ApiError = ExecError::Connection("auth failed".to_string()).into();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.to_string(), "connection failed: auth failed");
    }

    #[test]
    fn not_found_has_fixed_message() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotFound.to_string(), "Result not found");
    }
}
