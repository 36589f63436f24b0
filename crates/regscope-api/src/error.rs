//! API error type and its HTTP mapping.
//!
//! Every failure leaves the handler as `{"error": "<message>"}`. Store and
//! internal failures are logged in full but answered with a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use regscope_query::QueryError;
use regscope_store::StoreError;
use regscope_sync::SourceError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing request input (400).
    #[error("{0}")]
    Validation(String),

    /// eCFR failed or was unreachable (502).
    #[error("upstream eCFR error: {0}")]
    Upstream(#[from] SourceError),

    /// Local store failure (500).
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation(msg) => Self::Validation(msg),
            QueryError::Store(e) => Self::Storage(e),
            QueryError::Source(e) => Self::Upstream(e),
            QueryError::Task(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Validation(_) | Self::Upstream(_) => self.to_string(),
            Self::Storage(_) | Self::Internal(_) => "An internal error occurred".to_string(),
        };

        match &self {
            Self::Validation(_) => tracing::debug!(error = %self, "rejected request"),
            Self::Upstream(_) => tracing::warn!(error = %self, "upstream request failed"),
            Self::Storage(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "request failed")
            }
        }

        (self.status(), Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Upstream(SourceError::Server {
                status: 503,
                body: String::new()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Storage(StoreError::Decode("bad".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal("join".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn query_errors_map_by_kind() {
        let validation: ApiError = QueryError::Validation("Please enter a search term.".into()).into();
        assert!(matches!(validation, ApiError::Validation(ref m) if m == "Please enter a search term."));

        let task: ApiError = QueryError::Task("cancelled".into()).into();
        assert!(matches!(task, ApiError::Internal(_)));
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let resp = ApiError::Storage(StoreError::Decode("secret column".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
