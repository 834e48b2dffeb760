use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Household not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("startEpoch is not set")]
    MissingStartEpoch,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::MissingStartEpoch => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            AppError::Store(StoreError::NotFound(_)) => AppError::NotFound.to_string(),
            AppError::Store(e) => {
                error!("Store failure: {e}");
                "Internal error".to_string()
            }
            AppError::InternalError(e) => {
                error!("Internal error: {e}");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_is_404() {
        let err = AppError::from(StoreError::NotFound("abc".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_corrupt_record_is_500() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AppError::from(StoreError::CorruptRecord {
            id: "abc".to_string(),
            source,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_forbidden_message() {
        let err = AppError::Forbidden("Invalid join code");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Invalid join code");
    }
}
