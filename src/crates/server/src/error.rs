//! API error types and their conversion into HTTP responses, mirroring pcastone-orca's
//! `api::error::ApiError` (status code + machine-readable `code` + human `message`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("run is not live: {0}")]
    RunNotLive(String),
    #[error("concept not found: {0}")]
    ConceptNotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("storage error: {0}")]
    Storage(#[from] flowboard_checkpoint::CheckpointError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RunNotFound(_) | ApiError::ConceptNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RunNotLive(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::RunNotFound(_) => "RUN_NOT_FOUND",
            ApiError::ConceptNotFound(_) => "CONCEPT_NOT_FOUND",
            ApiError::RunNotLive(_) => "RUN_NOT_LIVE",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorBody { error: self.to_string(), message: self.to_string(), code: self.code().to_string() };
        tracing::warn!(code = %body.code, message = %body.message, "api error");
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_not_found_maps_to_404() {
        let err = ApiError::RunNotFound("abc".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "RUN_NOT_FOUND");
    }

    #[test]
    fn run_not_live_maps_to_409() {
        let err = ApiError::RunNotLive("abc".to_string());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "RUN_NOT_LIVE");
    }
}
