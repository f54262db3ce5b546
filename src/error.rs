//! Unified error handling.
//!
//! Every handler returns `Result<T, AppError>`. The response body is always
//! `{"error": "<message>"}`, with a field-keyed `fields` object added for
//! validation failures. Server-side failures are logged and answered with a
//! generic message.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::RepositoryError;
use crate::domain::aggregates::order::OrderError;
use crate::domain::aggregates::product::ProductError;
use crate::domain::field_errors::FieldErrors;
use crate::domain::voucher::VoucherError;
use crate::services::uploads::UploadError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// One or more fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidCredentials | AuthError::WrongPassword => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::InvalidToken | AuthError::TokenExpired | AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::TokenCreation(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upload(_) | Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(what)) => capitalize(what),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::TokenCreation(_) | AuthError::PasswordHash) => "Internal server error".to_string(),
            Self::Auth(AuthError::TokenExpired) => "Invalid or expired token".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Upload(UploadError::Io(_)) => "Failed to upload image".to_string(),
            Self::Upload(err) => err.to_string(),
            Self::Validation(_) => "Validation failed".to_string(),
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = match &self {
            Self::Validation(fields) => json!({ "error": self.client_message(), "fields": fields }),
            _ => json!({ "error": self.client_message() }),
        };
        (status, Json(body)).into_response()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self { Self::Validation(errors) }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self { Self::Validation(errors.into()) }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<VoucherError> for AppError {
    fn from(err: VoucherError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self { Self::BadRequest(err.body_text()) }
}

pub type Result<T> = std::result::Result<T, AppError>;
