use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::repo::{ConflictField, RepoError};

/// Request-terminal failures surfaced to the client as `{message}` payloads.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    /// Bad credentials or a missing/invalid bearer token. The message never
    /// reveals which sub-case occurred.
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Geçersiz veya süresi dolmuş token!")]
    InvalidToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::InvalidToken => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "Sunucu hatası!".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(ConflictField::Username) => {
                ApiError::Conflict("Bu kullanıcı adı zaten kullanılıyor!".into())
            }
            RepoError::Conflict(ConflictField::Email) => {
                ApiError::Conflict("Bu e-posta adresi zaten kayıtlı!".into())
            }
            RepoError::NotFound => ApiError::NotFound("Kullanıcı bulunamadı!".into()),
            RepoError::Database(e) => ApiError::Internal(e.into()),
        }
    }
}
