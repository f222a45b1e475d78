// Shared test helpers for database fixtures and event capture.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::error::Error;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use country_lookup::{country_index, CountryLookup, EventSink, LookupConfig, TrieBuilder};
use flate2::write::GzEncoder;
use flate2::Compression;

/// Builds a database from `(network, prefix_len, country_code)` entries.
pub fn build_db(entries: &[(Ipv4Addr, u8, &str)]) -> Vec<u8> {
    let mut builder = TrieBuilder::new();
    for (network, prefix_len, code) in entries {
        let country = country_index(code).expect("Unknown country code in fixture");
        builder
            .insert(*network, *prefix_len, country)
            .expect("Failed to insert fixture network");
    }
    builder.build()
}

/// Root split at bit 31: lower half EU, upper half AU.
pub fn eu_au_db() -> Vec<u8> {
    build_db(&[
        (Ipv4Addr::new(0, 0, 0, 0), 1, "EU"),
        (Ipv4Addr::new(128, 0, 0, 0), 1, "AU"),
    ])
}

/// Every address maps to `code`.
#[allow(dead_code)] // Used by other test files
pub fn whole_space_db(code: &str) -> Vec<u8> {
    build_db(&[(Ipv4Addr::UNSPECIFIED, 0, code)])
}

/// Gzip-compresses `data` the way the update endpoint serves it.
#[allow(dead_code)] // Used by other test files
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("Failed to compress fixture");
    encoder.finish().expect("Failed to finish gzip stream")
}

/// Writes `data` as the active database in `dir`.
pub fn install_db(dir: &Path, data: &[u8]) {
    std::fs::write(dir.join("GeoIP.dat"), data).expect("Failed to write database fixture");
}

/// Config rooted at `dir` with a short timeout.
pub fn test_config(dir: &Path, license_key: Option<&str>, update_url: &str) -> LookupConfig {
    LookupConfig {
        license_key: license_key.map(str::to_string),
        store_dir: dir.to_path_buf(),
        update_url: update_url.to_string(),
        fetch_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// Service wired to a fresh recording sink.
#[allow(dead_code)] // Used by other test files
pub fn test_service(config: LookupConfig) -> (CountryLookup, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let lookup =
        CountryLookup::with_sink(config, sink.clone()).expect("Failed to create lookup service");
    (lookup, sink)
}

/// Event sink that keeps every event for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    errors: Mutex<Vec<String>>,
    traces: Mutex<Vec<String>>,
}

#[allow(dead_code)] // Used by other test files
impl RecordingSink {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn traces(&self) -> Vec<String> {
        self.traces.lock().unwrap().clone()
    }

    pub fn has_trace(&self, needle: &str) -> bool {
        self.traces().iter().any(|t| t.contains(needle))
    }
}

impl EventSink for RecordingSink {
    fn log_error(&self, context: &str, error: &dyn Error) {
        self.errors
            .lock()
            .unwrap()
            .push(format!("{}: {}", context, error));
    }

    fn trace(&self, message: &str, _category: &str) {
        self.traces.lock().unwrap().push(message.to_string());
    }
}
