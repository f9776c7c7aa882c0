//! HTTP handlers organized by surface

pub mod addon;
pub mod configuration;
pub mod health;
pub mod proxy;
