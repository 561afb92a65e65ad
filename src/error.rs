use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Failure reported by a [`crate::backend::Backend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// A unique constraint was violated (duplicate email, duplicate student id).
    Conflict(String),
    Database(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Conflict(msg) => write!(f, "conflict: {}", msg),
            BackendError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<sea_orm::DbErr> for BackendError {
    fn from(e: sea_orm::DbErr) -> Self {
        // Postgres unique violation (23505)
        let msg = e.to_string();
        if msg.contains("duplicate key value violates unique constraint") {
            BackendError::Conflict(msg)
        } else {
            BackendError::Database(msg)
        }
    }
}

/// Failure calling one of the remote serverless functions.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionError(pub String);

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote function error: {}", self.0)
    }
}

impl std::error::Error for FunctionError {}

/// Error surfaced to API callers as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Validation(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Remote(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Remote(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Remote(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Conflict(msg) => ApiError::Conflict(msg),
            BackendError::Database(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<FunctionError> for ApiError {
    fn from(e: FunctionError) -> Self {
        ApiError::Remote(e.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::Span::current().record("error", self.message());
        (self.status(), Json(json!({"error": self.message()}))).into_response()
    }
}
