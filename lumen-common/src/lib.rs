//! Lumen Common - Shared configuration, errors, and logging.
//!
//! This crate provides:
//! - Configuration types, loading, and validation
//! - The configuration error type and context helpers
//! - Logging setup with noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ChatConfig, Config, GeminiConfig, ObservabilityConfig, ServerConfig};
pub use error::{Error, Result, ResultExt};
