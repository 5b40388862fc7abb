use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;

/// Failures of the works catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    InvalidUpload(String),

    #[error("Work not found")]
    NotFound,

    #[error("works list unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage write failed: {0}")]
    StorageWriteFailed(String),
}

/// Error returned by HTTP handlers, rendered as `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    BadRequest(String),

    #[error("File exceeds {}MB limit", .0 / 1024 / 1024)]
    PayloadTooLarge(usize),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Catalog(err) => match err {
                CatalogError::InvalidUpload(msg) => {
                    (StatusCode::BAD_REQUEST, json!({ "error": msg }))
                }
                CatalogError::NotFound => {
                    (StatusCode::NOT_FOUND, json!({ "error": err.to_string() }))
                }
                CatalogError::StorageUnavailable(details) => {
                    error!("Works list unavailable: {}", details);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Failed to fetch works." }),
                    )
                }
                CatalogError::StorageWriteFailed(details) => {
                    error!("Storage write failed: {}", details);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "Storage write failed", "details": details }),
                    )
                }
            },
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::PayloadTooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
