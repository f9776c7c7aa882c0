//! Origin media server access
//!
//! - [`client`]: HTTP adapter and the [`OriginApi`] seam
//! - [`library`]: helpers layered over the raw endpoints
//! - [`resolver`]: external id to origin id resolution

pub mod client;
pub mod library;
pub mod resolver;

pub use client::{CatalogQuery, OriginApi, PlexClient};
pub use resolver::Resolver;
