//! API error taxonomy and its HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use editor_store::StoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Token missing or wrong. Never says which.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("File not found")]
    NotFound,

    #[error("{0}")]
    BadInput(String),

    #[error("Storage error: {0}")]
    StoreFailure(String),
}

/// JSON error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadInput(_) => StatusCode::BAD_REQUEST,
            ApiError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::StoreFailure(detail) => {
                tracing::error!("Store failure: {}", detail);
                "Storage error".to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(ErrorBody { error: message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::InvalidKey { .. } => ApiError::BadInput(e.to_string()),
            StoreError::Io(message) => ApiError::StoreFailure(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::BadInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::StoreFailure("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound("a".into())),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from(StoreError::InvalidKey {
                key: "../a".into(),
                reason: "traversal".into()
            }),
            ApiError::BadInput(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Io("disk full".into())),
            ApiError::StoreFailure(_)
        ));
    }

    #[test]
    fn test_store_failure_hides_detail() {
        let response = ApiError::StoreFailure("/var/lib/secret/path".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
