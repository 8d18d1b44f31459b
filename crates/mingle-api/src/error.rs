use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mingle_db::ConnectError;
use mingle_types::api::ApiResponse;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can report. The body is always
/// `{success: false, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unusable input, reported with a 200 so clients read the message.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Database error")]
    Database(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::OK,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConnectError> for ApiError {
    fn from(e: ConnectError) -> Self {
        match e {
            ConnectError::NotRegistered => ApiError::Forbidden(e.to_string()),
            ConnectError::EventClosed | ConnectError::SelfConnection => ApiError::Validation(e.to_string()),
            ConnectError::EventNotFound | ConnectError::UnknownUser => ApiError::NotFound(e.to_string()),
            ConnectError::Database(inner) => ApiError::Database(inner),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(e) = &self {
            error!("Database error: {:#}", e);
        }
        (self.status(), Json(ApiResponse::fail(self.to_string()))).into_response()
    }
}
