use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::pipeline::AnalysisError;

/// Error returned by every route, rendered as `{"detail": "..."}`.
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn file_not_found(file: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("File {file} not found"))
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidUrl(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            AnalysisError::NoComponents => ApiError::bad_request(err.to_string()),
            AnalysisError::Failed(e) => {
                error!(error = %format!("{e:#}"), "analysis failed");
                ApiError::internal(format!("Analysis failed: {e:#}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_error_status_mapping() {
        let invalid: ApiError = AnalysisError::InvalidUrl("ftp://x".into()).into();
        assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);

        let empty: ApiError = AnalysisError::NoComponents.into();
        assert_eq!(empty.status, StatusCode::BAD_REQUEST);
        assert!(empty.detail.starts_with("No components found in repository"));

        let failed: ApiError = AnalysisError::Failed(anyhow::anyhow!("clone exploded")).into();
        assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.detail, "Analysis failed: clone exploded");
    }
}
