//! Error type definitions for the Plexio gateway
//!
//! The origin taxonomy keeps transport failures apart (unreachable, reset,
//! timeout) so the web boundary can answer 502 or 504 and logs say which one
//! happened.

use axum::http::StatusCode;
use thiserror::Error;

/// Maximum number of characters of an origin error body kept for diagnostics
pub const ERROR_BODY_PREVIEW: usize = 200;

/// Maximum number of characters of an undecodable origin body kept in logs
pub const RAW_BODY_PREVIEW: usize = 500;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Origin server or matching service failures
    #[error("Plex error: {0}")]
    Plex(#[from] PlexError),

    /// Stream proxy failures
    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    /// Validation errors (bad addon configuration, bad ids)
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Cache backend failures
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while talking to the origin media server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlexError {
    /// 401/403 from the origin; callers may drop stored credentials
    #[error("Plex server rejected credentials (status: {status})")]
    Unauthorized { status: u16 },

    /// Any other status >= 400
    #[error("Received error from plex server: {status}")]
    UpstreamStatus { status: u16, body: String },

    /// Connection could not be established
    #[error("Plex server connection error: {0}")]
    Unreachable(String),

    /// Connection dropped mid-request
    #[error("Plex server disconnected error: {0}")]
    ConnectionReset(String),

    /// Request exceeded the configured timeout
    #[error("Plex server timeout error: {0}")]
    Timeout(String),

    /// 2xx with a blank body
    #[error("Empty response from plex server")]
    EmptyBody,

    /// Body was not the JSON envelope we expected
    #[error("Malformed JSON from plex server: {message}")]
    MalformedJson { message: String, raw: String },

    /// Request could not be built or sent for another reason
    #[error("Plex request failed: {0}")]
    Request(String),
}

/// Errors raised by the streaming proxy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// The `q` parameter was absent or blank
    #[error("Missing q parameter")]
    MissingQuery,

    /// Upstream answered with status >= 400
    #[error("Upstream error: {status}")]
    UpstreamStatus { status: u16 },

    /// Upstream stalled past the read-idle timeout
    #[error("Proxy timeout: {0}")]
    Timeout(String),

    /// Any other transport failure
    #[error("Proxy error: {0}")]
    Transport(String),

    /// The outgoing response could not be assembled
    #[error("Failed to build proxy response: {0}")]
    Response(String),
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status this error maps to at the web boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Plex(e) => e.status_code(),
            Self::Proxy(e) => e.status_code(),
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Configuration { .. } | Self::Cache { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl PlexError {
    /// Classify a reqwest failure into the transport kinds.
    ///
    /// The error text is stripped of the request URL so tokens never leak
    /// into responses.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        let timed_out = error.is_timeout();
        let connect = error.is_connect();
        let body = error.is_body() || error.is_decode();
        let message = error.without_url().to_string();
        if timed_out {
            Self::Timeout(message)
        } else if connect {
            Self::Unreachable(message)
        } else if body || is_connection_reset(&message) {
            Self::ConnectionReset(message)
        } else {
            Self::Request(message)
        }
    }

    /// Build the status-derived error kinds from an origin response status
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 401 || status == 403 {
            Self::Unauthorized { status }
        } else {
            Self::UpstreamStatus {
                status,
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            }
        }
    }

    pub fn malformed_json(error: &serde_json::Error, raw: &str) -> Self {
        Self::MalformedJson {
            message: error.to_string(),
            raw: raw.chars().take(RAW_BODY_PREVIEW).collect(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Gateway-style status for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl ProxyError {
    /// Same classification as [`PlexError::from_reqwest`], collapsed to the
    /// proxy's coarser kinds.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        match PlexError::from_reqwest(error) {
            PlexError::Timeout(message) => Self::Timeout(message),
            other => Self::Transport(other.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingQuery => StatusCode::BAD_REQUEST,
            Self::UpstreamStatus { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Response(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn is_connection_reset(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("connection reset")
        || lower.contains("connection closed")
        || lower.contains("broken pipe")
}
