//! Centralized error handling for the Plexio gateway
//!
//! Errors are split by the layer that produces them:
//!
//! - **Plex errors**: calls against the origin media server and the
//!   metadata-matching service (auth failures, error statuses, transport
//!   failures, undecodable bodies)
//! - **Proxy errors**: the streaming reverse proxy
//! - **Application errors**: the top-level type handlers return, wrapping the
//!   two above plus validation/configuration/not-found cases
//!
//! # Usage
//!
//! ```rust
//! use plexio::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::validation("bad configuration blob"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for origin/matching-service calls
pub type PlexResult<T> = Result<T, PlexError>;

/// Convenience type alias for the stream proxy
pub type ProxyResult<T> = Result<T, ProxyError>;
