//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers and intake
//! services return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::MarketingError;

/// Application-level error type for the relay.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing request fields.
    #[error("{0}")]
    Validation(String),

    /// Local user absent.
    #[error("{0}")]
    NotFound(String),

    /// Marketing platform failure, propagated as-is.
    #[error(transparent)]
    Marketing(#[from] MarketingError),

    /// Marketing platform failure with caller-supplied context.
    #[error("{message}")]
    Integration {
        message: String,
        #[source]
        source: MarketingError,
    },
}

impl AppError {
    /// Wrap a platform failure for the user workflows.
    ///
    /// Uses the platform's own detail when it sent one, otherwise
    /// `"<fallback>: <error>"`.
    #[must_use]
    pub fn integration(source: MarketingError, fallback: &str) -> Self {
        let message = source.platform_detail().map_or_else(
            || format!("{fallback}: {source}"),
            |detail| format!("Mailchimp API error: {detail}"),
        );
        Self::Integration { message, source }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Marketing(e) | Self::Integration { source: e, .. } => match e {
                MarketingError::Api { .. } | MarketingError::Parse(_) => "remote_api_error",
                MarketingError::Connectivity(_) | MarketingError::Timeout(_) => {
                    "connectivity_error"
                }
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Marketing(e) | Self::Integration { source: e, .. } => match e {
                MarketingError::Api { .. } | MarketingError::Parse(_) => StatusCode::BAD_GATEWAY,
                MarketingError::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
                MarketingError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            },
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InvalidName => Self::Validation(err.to_string()),
            RepositoryError::NotFound(_) => Self::NotFound("User not found".to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
