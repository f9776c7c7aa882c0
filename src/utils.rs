//! Utility helpers for the Plexio gateway
//!
//! - `url`: origin URL assembly, query manipulation and token masking
//! - `human_format`: human-readable sizes for stream descriptions
//! - `language`: language tags to flag emoji

pub mod human_format;
pub mod language;
pub mod url;

pub use self::url::UrlUtils;
