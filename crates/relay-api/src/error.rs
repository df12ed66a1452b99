//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps pipeline failures from relay-core to HTTP status codes and JSON
//! error bodies. Handler faults are logged and never exposed to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_core::{BindingError, DispatchError, PipelineError, RegistryError, ValidationErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::EndpointError;

/// Structured JSON error response body.
///
/// The `details` field carries the `{field, message}` list for validation
/// failures and is omitted otherwise.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// No route matches (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// One or more validation rules failed (422).
    #[error("validation error: {0}")]
    Validation(ValidationErrors),

    /// Request inputs could not be bound (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or rejected credentials on a protected route (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, details) = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                ("An internal error occurred".to_string(), None)
            }
            Self::Validation(errors) => (
                "request validation failed".to_string(),
                serde_json::to_value(errors).ok(),
            ),
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BindingError> for AppError {
    fn from(err: BindingError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Binding(e) => e.into(),
            PipelineError::Validation(errors) => Self::Validation(errors),
            PipelineError::Dispatch(e) => e.into(),
        }
    }
}

/// Failure assembling the application before it serves any call.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("endpoints: {0}")]
    Endpoint(#[from] EndpointError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use relay_core::{FieldError, HandlerFault};

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation(ValidationErrors::new()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err}");
        }
    }

    #[tokio::test]
    async fn validation_lists_field_errors() {
        let errors = ValidationErrors::from(vec![FieldError::new(
            "Id",
            "Id needs to be greater than 0",
        )]);
        let (status, body) = response_parts(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body.error.details,
            Some(serde_json::json!([
                {"field": "Id", "message": "Id needs to be greater than 0"}
            ]))
        );
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("store lock poisoned".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn unauthorized_keeps_reason() {
        let (status, body) =
            response_parts(AppError::Unauthorized("missing authorization header".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.error.message.contains("missing authorization header"));
    }

    #[test]
    fn pipeline_errors_map_by_stage() {
        let binding = PipelineError::Binding(BindingError::NotAnObject { found: "array" });
        assert!(matches!(AppError::from(binding), AppError::BadRequest(_)));

        let validation = PipelineError::Validation(ValidationErrors::new());
        assert!(matches!(AppError::from(validation), AppError::Validation(_)));

        let fault = PipelineError::Dispatch(DispatchError::Fault(HandlerFault::new("boom")));
        assert!(matches!(AppError::from(fault), AppError::Internal(_)));
    }

    #[test]
    fn error_body_omits_absent_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "TEST".to_string(),
                message: "test message".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("TEST"));
        assert!(!json.contains("details"));
    }
}
