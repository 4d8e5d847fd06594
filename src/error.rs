use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A quota was constructed with parameters that can never admit traffic.
    #[error("invalid quota: {0}")]
    InvalidQuota(String),

    /// `consume()` was called on a counter with no key bound.
    #[error("counter has no key bound; set a key before consuming")]
    MissingKey,

    /// The backing counter store failed. This is an infrastructure error and
    /// is never translated into an admit or reject decision.
    #[error("store error: {0}")]
    Store(String),

    /// Compare-and-swap retries exhausted while updating a key.
    #[error("store contention on key '{0}'")]
    StoreContention(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::Store(_) | Error::StoreContention(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidQuota(_) | Error::MissingKey | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Error::InvalidQuota(_) => "invalid_quota",
            Error::MissingKey => "missing_key",
            Error::Store(_) => "store_unavailable",
            Error::StoreContention(_) => "store_contention",
            Error::Config(_) => "configuration_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_service_unavailable() {
        let err = Error::Store("connection refused".to_string());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.kind(), "store_unavailable");
    }

    #[test]
    fn missing_key_is_an_internal_error() {
        assert_eq!(Error::MissingKey.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn display_includes_detail() {
        let err = Error::InvalidQuota("limit must be greater than 0".to_string());
        assert!(err.to_string().contains("limit must be greater than 0"));
    }
}
