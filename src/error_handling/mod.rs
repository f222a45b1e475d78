//! Error handling.
//!
//! Errors are split by the path they occur on:
//! - **Lookup path**: `LookupError` (database missing or unreadable) and
//!   `AddressError` (strict address parsing)
//! - **Update path**: `UpdateError` (fetch or apply failures)
//! - **Startup**: `InitializationError` (logger setup)
//! - **Tooling**: `BuildError` (writing database files)
//!
//! Lookup-path errors never reach callers of the `Option`-returning API;
//! update-path errors never leave the background task.

mod types;

// Re-export public API
pub use types::{AddressError, BuildError, InitializationError, LookupError, UpdateError};
