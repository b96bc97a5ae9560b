//! Unified error envelope shared by the gateway's HTTP handlers.
//!
//! Provides a single response shape and a small set of classification helpers
//! so every handler maps its error to the same JSON envelope and status code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error response returned to HTTP callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub error_type: String,
    pub code: String,
    pub details: Option<String>,
    pub timestamp: String,
}

/// Coarse-grained error classification shared across the gateway's crates.
///
/// This does not replace the per-crate `thiserror` enums (e.g. `outbox_store::OutboxError`);
/// it is the shape handlers convert *into* at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::StoreUnavailable(_) => 503,
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Conflict(_) => 409,
            ServiceError::InternalError(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServiceError::StoreUnavailable(_) => "StoreUnavailableError",
            ServiceError::BadRequest(_) => "BadRequestError",
            ServiceError::NotFound(_) => "NotFoundError",
            ServiceError::Conflict(_) => "ConflictError",
            ServiceError::InternalError(_) => "InternalError",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            status: self.status_code(),
            error_type: self.error_type().to_string(),
            code: self.error_code().to_string(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ServiceError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ServiceError::StoreUnavailable("x".into()).status_code(), 503);
        assert_eq!(ServiceError::Conflict("x".into()).status_code(), 409);
    }

    #[test]
    fn test_error_response_format() {
        let err = ServiceError::NotFound("client".to_string());
        let response = err.to_response();
        assert_eq!(response.status, 404);
        assert_eq!(response.code, "NOT_FOUND");
    }
}
