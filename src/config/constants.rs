//! Configuration constants.
//!
//! This module defines the database format constants, file names, update
//! protocol values and scheduling intervals used throughout the crate.

use std::time::Duration;

// Database format
/// First node value that encodes a country instead of a child offset.
///
/// Node values are 24 bits wide, so this leaves room for 256 country indices
/// (`0xFFFF00..=0xFFFFFF`).
pub const COUNTRY_BEGIN: u32 = 16_776_960;
/// Size of one trie node on disk: two 3-byte little-endian values.
pub const NODE_SIZE: usize = 6;
/// Number of address bits walked for an IPv4 key.
pub const IPV4_DEPTH: u32 = 32;

// Storage layout
/// Default directory for the database file when none is configured
pub const DEFAULT_STORE_DIR: &str = ".country_lookup";
/// Name of the active database file
pub const DB_FILE_NAME: &str = "GeoIP.dat";
/// Name of the staging file an update is decompressed into before the swap
pub const TEMP_DB_FILE_NAME: &str = "GeoIP.dat.staging";

// Update protocol
/// Default update endpoint (legacy MaxMind GeoIP Country update service)
pub const DEFAULT_UPDATE_URL: &str = "https://www.maxmind.com/app/update";
/// Body returned by the update endpoint when the local file is current.
///
/// Compared byte for byte; anything else is treated as a gzip payload.
pub const NO_UPDATE_SENTINEL: &[u8] = b"No new updates available\n";
/// Query parameter carrying the license key
pub const LICENSE_KEY_PARAM: &str = "license_key";
/// Query parameter carrying the MD5 of the active file
pub const CHECKSUM_PARAM: &str = "md5";
/// Environment variable the CLI reads the license key from
pub const LICENSE_KEY_ENV: &str = "COUNTRY_LOOKUP_LICENSE_KEY";
/// Timeout for the whole update request, including the body download
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(300);
/// TCP connect timeout for the update request
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum compressed update size in bytes (64MB)
pub const MAX_DOWNLOAD_SIZE: usize = 64 * 1024 * 1024;

// Scheduling
/// Default local hour of the daily update check (07:00)
pub const DEFAULT_UPDATE_HOUR: u32 = 7;
/// Interval between scheduled update checks
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Delay of the one-shot check run when an existing file was found at startup
pub const QUICK_CHECK_DELAY: Duration = Duration::from_secs(60);
/// The one-shot check is only scheduled if the daily check is further away than this
pub const QUICK_CHECK_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Category used when reporting events to the [`EventSink`](crate::EventSink)
pub const EVENT_CATEGORY: &str = "CountryLookup";
