//! Core domain + application logic for the community guild bot.
//!
//! This crate is intentionally framework-agnostic. Discord and the feed
//! scraper live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod rolemap;
pub mod rolesync;
pub mod sources;

pub use errors::{Error, Result};
