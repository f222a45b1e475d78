//! Lookup configuration and constants.
//!
//! This module provides:
//! - On-disk format and protocol constants
//! - The `LookupConfig` struct the service is built from
//! - Log level/format enums shared with the CLI

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{LogFormat, LogLevel, LookupConfig};
