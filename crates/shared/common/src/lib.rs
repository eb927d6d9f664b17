//! Common utilities shared across the marketplace crates.
//!
//! This crate provides:
//! - Unified error handling for the HTTP API and service layer
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
