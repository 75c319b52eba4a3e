use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::layout::ReplayError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Mutation attempted while the booklet's lifecycle forbids it.
    #[error("Business rule violated: {0}")]
    BusinessRule(String),

    /// Persisted placements no longer replay onto their page.
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("Store error during {operation} ({target}): {source}")]
    Store {
        operation: &'static str,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps a store failure with the operation name and target id.
    pub fn store(
        operation: &'static str,
        target: impl ToString,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        AppError::Store {
            operation,
            target: target.to_string(),
            source: source.into(),
        }
    }
}

impl From<ReplayError> for AppError {
    fn from(e: ReplayError) -> Self {
        AppError::InternalInvariant(e.to_string())
    }
}

// Malformed request input is a validation failure like any other.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::BusinessRule(msg) => {
                (StatusCode::CONFLICT, "BUSINESS_RULE_VIOLATION", msg.clone())
            }
            AppError::InternalInvariant(msg) => {
                tracing::error!("Internal invariant violated: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_INVARIANT",
                    "Stored page layout is inconsistent".to_string(),
                )
            }
            AppError::Store {
                operation,
                target,
                source,
            } => {
                tracing::error!("Store error during {operation} ({target}): {source:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    format!("A storage error occurred during {operation}"),
                )
            }
            AppError::Cache(msg) => {
                tracing::error!("Cache error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CACHE_ERROR",
                    "A cache error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
