use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::metadata_client::MetadataError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Request-terminating failures. Each constructor logs with the caller's
/// span, so the handler's operation and song id end up on the log line.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Failed to get song details")]
    Upstream(#[source] MetadataError),
    #[error("Invalid release date format")]
    Format(#[source] chrono::ParseError),
    #[error("{message}")]
    Storage {
        message: &'static str,
        #[source]
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!("rejected request: {message}");
        Self::Validation(message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::info!("{message}");
        Self::NotFound(message)
    }

    pub fn upstream(err: MetadataError) -> Self {
        tracing::error!("metadata lookup failed: {err}");
        Self::Upstream(err)
    }

    pub fn format(raw: &str, err: chrono::ParseError) -> Self {
        tracing::error!(release_date = raw, "unparseable release date: {err}");
        Self::Format(err)
    }

    pub fn storage(message: &'static str, cause: anyhow::Error) -> Self {
        tracing::error!("{message}: {cause:#}");
        Self::Storage { message, cause }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Format(_) | Self::Storage { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code: status.as_u16(),
            }),
        )
            .into_response()
    }
}
