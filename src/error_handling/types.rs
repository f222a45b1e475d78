//! Error type definitions.
//!
//! This module defines all error types used throughout the crate.

use std::io;
use std::path::PathBuf;

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Errors from resolving an address against the database.
///
/// Both variants mean "no answer right now"; they are kept apart so callers
/// and operators can tell a missing database from a damaged one.
#[derive(Error, Debug)]
pub enum LookupError {
    /// No database file is open and none could be opened.
    #[error(
        "Database file is not ready: check that the file exists and is readable, \
         or configure a license key so it can be downloaded"
    )]
    NotReady,

    /// A node record could not be read in full.
    #[error("Database file is corrupt: failed to read node {node}: {source}")]
    Corrupt {
        /// Record number of the node being read
        node: u32,
        /// Underlying read failure (usually an unexpected EOF)
        #[source]
        source: io::Error,
    },
}

impl LookupError {
    /// Returns true if this error means the database is damaged rather than absent.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, LookupError::Corrupt { .. })
    }
}

/// Error returned by the strict address parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Input is not a dotted-quad IPv4 address.
    #[error("Invalid IPv4 address {input:?}: {reason}")]
    Invalid {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors from building a database with [`TrieBuilder`](crate::trie::TrieBuilder).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Prefix length greater than 32.
    #[error("IPv4 prefix length {0} exceeds 32")]
    InvalidPrefix(u8),

    /// Country index that cannot be stored in a leaf or is not in the table.
    #[error("Country index {0} is out of range")]
    InvalidCountry(usize),

    /// The tree outgrew the 24-bit node offset space.
    #[error("Database exceeds {0} nodes")]
    TooManyNodes(u32),
}

/// Errors from a database update attempt.
///
/// None of these leave the service without a database: the file that was
/// active before the attempt stays active.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The configured update URL cannot be parsed.
    #[error("Invalid update URL {url:?}: {source}")]
    InvalidUrl {
        /// The configured URL
        url: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },

    /// Network error, timeout, non-2xx status or oversized body.
    #[error("Update fetch failed: {0}")]
    FetchFailed(String),

    /// Decompressing the payload or replacing the file failed.
    #[error("Failed to apply update to {}: {source}", .path.display())]
    ApplyFailed {
        /// File being written or replaced
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// The store was closed before the update could be applied.
    #[error("Database store is closed")]
    Closed,
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the license key
        let err = err.without_url();
        if err.is_timeout() {
            UpdateError::FetchFailed(format!("request timed out: {}", err))
        } else {
            UpdateError::FetchFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_message_is_actionable() {
        let msg = LookupError::NotReady.to_string();
        assert!(msg.contains("not ready"));
        assert!(msg.contains("license key"));
    }

    #[test]
    fn test_corrupt_carries_node_and_source() {
        let err = LookupError::Corrupt {
            node: 42,
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "failed to fill whole buffer"),
        };
        assert!(err.is_corrupt());
        assert!(!LookupError::NotReady.is_corrupt());
        assert!(err.to_string().contains("node 42"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_apply_failed_mentions_path() {
        let err = UpdateError::ApplyFailed {
            path: PathBuf::from("/tmp/GeoIP.dat.staging"),
            source: io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream"),
        };
        let msg = err.to_string();
        assert!(msg.contains("GeoIP.dat.staging"));
        assert!(msg.contains("corrupt deflate stream"));
    }

    #[test]
    fn test_address_error_display() {
        let err = AddressError::Invalid {
            input: "300.1.1.1".to_string(),
            reason: "invalid IPv4 address syntax".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid IPv4 address \"300.1.1.1\": invalid IPv4 address syntax"
        );
    }
}
