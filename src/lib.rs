pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod plex;
pub mod resources;
pub mod streaming;
pub mod utils;
pub mod web;
