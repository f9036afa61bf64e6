//! HTTP error mapping with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Upstream failures keep the status
//! upstream answered with (500 when it never answered) and forward
//! upstream's JSON error body under `upstream`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::woocommerce::UpstreamError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog read failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Catalog(CatalogError::InvalidQuery(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Catalog(err) => err
                .upstream()
                .and_then(UpstreamError::status)
                .and_then(|status| StatusCode::from_u16(status).ok())
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Upstream's error body, parsed as JSON when possible.
    fn upstream_body(&self) -> Option<Value> {
        let Self::Catalog(err) = self else {
            return None;
        };
        let body = err.upstream()?.body()?;
        Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                status = status.as_u16(),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = json!({
            "error": self.to_string(),
            "upstream": self.upstream_body(),
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
