//! Core domain + application logic for the chat bot.
//!
//! This crate is intentionally transport-agnostic. The chat platform and the HTTP
//! collaborators live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod numbers;
pub mod plugins;
pub mod ports;
pub mod roster;
pub mod store;

pub use errors::{Error, Result};
