//! HTTP error mapping.
//!
//! # Invariants
//! - Validation failures map to 400, deadline expiry and a closed store to
//!   503, every other storage failure to 500.
//! - Error bodies are always `{ "error": "<reason>" }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use finboard_core::{LedgerError, StoreError, TransactionError};
use log::{error, warn};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> String {
        match self {
            Self::BadRequest(message) | Self::Unavailable(message) | Self::Internal(message) => {
                message
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(message) => error!(
                "event=http_error module=http status=error code={} error={}",
                status.as_u16(),
                message
            ),
            Self::Unavailable(message) => warn!(
                "event=http_error module=http status=error code={} error={}",
                status.as_u16(),
                message
            ),
            Self::BadRequest(_) => {}
        }
        (
            status,
            Json(ErrorBody {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_deadline() || matches!(err, StoreError::Closed) {
            Self::Unavailable(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Storage(store) => Self::from(store),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Storage(store) => Self::from(store),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("request task failed: {err}"))
    }
}
