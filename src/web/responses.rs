//! Error responses for the web layer
//!
//! Every failure leaves the gateway as `{"detail": "..."}` with the status
//! the error maps to.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", status, self);
        }

        let detail = match &self {
            AppError::Plex(e) => e.to_string(),
            AppError::Proxy(e) => e.to_string(),
            AppError::Validation { message } => message.clone(),
            other => other.to_string(),
        };
        (status, Json(ErrorDetail { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{PlexError, ProxyError};
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::validation("bad blob"), StatusCode::BAD_REQUEST),
            (
                AppError::not_found("media", "plexio:x"),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Plex(PlexError::Unauthorized { status: 401 }),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Plex(PlexError::Timeout("slow".into())),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                AppError::Plex(PlexError::EmptyBody),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Proxy(ProxyError::UpstreamStatus { status: 416 }),
                StatusCode::RANGE_NOT_SATISFIABLE,
            ),
            (
                AppError::Proxy(ProxyError::MissingQuery),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
