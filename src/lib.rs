//! country_lookup library: IP-to-country lookups that keep themselves current
//!
//! The database is a packed binary trie in a single file. Lookups walk it one
//! record at a time through a shared file handle, and a background task
//! replaces the file with newer versions from the update endpoint while
//! lookups keep running.
//!
//! # Example
//!
//! ```no_run
//! use country_lookup::{CountryLookup, LookupConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let lookup = Arc::new(CountryLookup::new(LookupConfig {
//!     license_key: std::env::var("COUNTRY_LOOKUP_LICENSE_KEY").ok(),
//!     ..Default::default()
//! })?);
//!
//! lookup.ensure_ready().await;
//! match lookup.lookup_country_name("81.2.69.160") {
//!     Some(name) => println!("{name}"),
//!     None => println!("unknown"),
//! }
//!
//! lookup.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! Lookups are synchronous and need no runtime. `ensure_ready`, `check_now`
//! and `shutdown` must run within a Tokio runtime.

#![warn(missing_docs)]

pub mod config;
pub mod countries;
mod error_handling;
mod events;
pub mod initialization;
mod lookup;
pub mod store;
pub mod trie;
pub mod update;

// Re-export public API
pub use config::{LogFormat, LogLevel, LookupConfig};
pub use countries::{country_code, country_index, country_name, COUNTRY_COUNT};
pub use error_handling::{AddressError, BuildError, InitializationError, LookupError, UpdateError};
pub use events::{EventSink, LogEventSink};
pub use lookup::{parse_ipv4, AddressInput, CountryLookup};
pub use store::{DatabaseInfo, DatabaseStore, StoreState};
pub use trie::{seek_country, Node, NodeSource, TrieBuilder};
pub use update::{UpdateOutcome, Updater};
