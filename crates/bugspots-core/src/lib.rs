//! Core types, configuration, and error handling for bugspots.
//!
//! This crate provides the shared foundation used by the engine and the CLI:
//! - [`BugspotsError`]: unified error type using `thiserror`
//! - [`BugspotsConfig`]: configuration loaded from `.bugspots.toml`
//! - [`OutputFormat`]: how a ranking is rendered

mod config;
mod error;
mod types;

pub use config::{BugspotsConfig, OutputConfig, ScanConfig, DEFAULT_FIX_PATTERN};
pub use error::BugspotsError;
pub use types::OutputFormat;

/// A convenience `Result` type for bugspots operations.
pub type Result<T> = std::result::Result<T, BugspotsError>;
