/// Service error types
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures raised by a `SongStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Song with id {0} already present")]
    DuplicateId(i64),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Seed error: {0}")]
    Seed(String),
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("{0}")]
    InvalidBody(String),

    #[error("Invalid song id: {0}")]
    InvalidId(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Song with id {id} already present")]
    AlreadyExists { id: i64, status: StatusCode },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::MissingFields | ApiError::InvalidBody(_) | ApiError::InvalidId(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::AlreadyExists { status, .. } => {
                (status, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Store(ref e) => {
                error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
