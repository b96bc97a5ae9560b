//! Service-level error type: wraps the store crate's errors plus
//! request-level errors, classifying through the shared `ServiceError` so
//! every crate in the gateway renders the same `ErrorResponse` envelope.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use error_types::{ErrorResponse, ServiceError};
use outbox_store::OutboxError;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] OutboxError),

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Classifies this error into the shared `ServiceError` taxonomy, the
    /// single place that decides status codes and error codes.
    fn to_service_error(&self) -> ServiceError {
        match self {
            AppError::BadRequest(msg) => ServiceError::BadRequest(msg.clone()),
            AppError::Store(err) if err.is_retryable() => ServiceError::StoreUnavailable(err.to_string()),
            AppError::Store(OutboxError::Duplicate(seq)) => ServiceError::Conflict(format!("sequence {seq}")),
            AppError::Store(err) => ServiceError::InternalError(err.to_string()),
            AppError::PublishFailed(msg) => ServiceError::InternalError(msg.clone()),
            AppError::ServiceUnavailable(msg) => ServiceError::StoreUnavailable(msg.clone()),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.to_service_error().status_code()
    }

    pub fn error_code(&self) -> &'static str {
        self.to_service_error().error_code()
    }

    pub fn to_response(&self) -> ErrorResponse {
        self.to_service_error().to_response()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_response())
    }
}
