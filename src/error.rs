use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid API document: {reason}")]
    InvalidDocument { reason: String },

    #[error("Failed to fetch API document from {source_name}: {reason}")]
    DocumentFetch { source_name: String, reason: String },

    #[error("Operation {method} {path} has no summary to derive a function name from")]
    MissingOperationName { path: String, method: String },

    #[error("Function name '{name}' is derived by both {first} and {second}")]
    DuplicateOperationName {
        name: String,
        first: String,
        second: String,
    },

    /// The request body cannot be expressed as a flat JSON object schema.
    #[error("Operation '{operation}' has an unsupported request body: {reason}")]
    UnsupportedMediaType { operation: String, reason: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Malformed arguments for function '{function}': {reason}")]
    MalformedArguments { function: String, reason: String },

    #[error("No base URL configured; the document declares no server and BASE_URL is unset")]
    MissingBaseUrl,

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidDocument { .. } => "invalid_document",
            AppError::DocumentFetch { .. } => "document_fetch",
            AppError::MissingOperationName { .. } => "missing_operation_name",
            AppError::DuplicateOperationName { .. } => "duplicate_operation_name",
            AppError::UnsupportedMediaType { .. } => "unsupported_media_type",
            AppError::UnknownFunction { .. } => "unknown_function",
            AppError::MalformedArguments { .. } => "malformed_arguments",
            AppError::MissingBaseUrl => "missing_base_url",
            AppError::ValidationError(_) => "validation_error",
            AppError::Internal(_) => "internal",
        }
    }

    /// Errors caused by the model's invocation rather than by the service.
    /// The caller can re-prompt the model on these.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::UnknownFunction { .. } | AppError::MalformedArguments { .. }
        )
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnknownFunction { name } => {
                tracing::warn!(function = %name, "Invocation names an unknown function");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::MalformedArguments { function, reason } => {
                tracing::warn!(function = %function, error = %reason, "Malformed invocation arguments");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::ValidationError(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                StatusCode::BAD_REQUEST
            }
            AppError::DocumentFetch { .. } => {
                tracing::error!(error = %self, "Document source unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => {
                tracing::error!(error = %self, kind = self.kind(), "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            kind: self.kind(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidDocument {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_errors_are_unprocessable() {
        let err = AppError::MalformedArguments {
            function: "List_chats".to_string(),
            reason: "EOF while parsing".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_internal_error_is_500() {
        let err = AppError::Internal("unserializable call".to_string());
        assert_eq!(err.kind(), "internal");
        assert!(!err.is_recoverable());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_error_is_400() {
        let err = AppError::ValidationError("too long".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
