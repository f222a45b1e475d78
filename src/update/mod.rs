//! Database updates.
//!
//! [`Updater`] asks the update endpoint whether a newer database exists,
//! stages it next to the active file and hands it to the
//! [`DatabaseStore`] for the swap. The `schedule` module runs it daily.

mod decompress;
mod fetch;
pub mod schedule;

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::config::{LookupConfig, EVENT_CATEGORY};
use crate::error_handling::UpdateError;
use crate::events::EventSink;
use crate::store::DatabaseStore;

use decompress::decompress_to_file;
use fetch::{build_client, build_update_url, fetch_update, redact};

// Re-export public API
pub use fetch::is_no_update;
pub use schedule::{next_daily_check, spawn_schedule, ScheduleHandle, SchedulePlan};

/// Result of one update check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No license key configured; nothing was requested
    Skipped,
    /// The endpoint reported the local file is current
    NoUpdate,
    /// A new database was installed
    Applied {
        /// Size of the new database file
        bytes: u64,
    },
}

/// Fetches and installs database updates.
pub struct Updater {
    license_key: Option<String>,
    update_url: String,
    client: reqwest::Client,
    store: Arc<DatabaseStore>,
    sink: Arc<dyn EventSink>,
    /// Held for a whole check, including the blocking apply job: all checks
    /// share one staging file
    in_flight: Arc<tokio::sync::Mutex<()>>,
}

impl Updater {
    /// Creates an updater for `store` using the endpoint settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::FetchFailed` if the HTTP client cannot be built.
    pub fn new(
        config: &LookupConfig,
        store: Arc<DatabaseStore>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, UpdateError> {
        Ok(Updater {
            license_key: config.license_key().map(str::to_string),
            update_url: config.update_url.clone(),
            client: build_client(config.fetch_timeout)?,
            store,
            sink,
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Runs one update check.
    ///
    /// The previous database stays active on every error path. Concurrent
    /// calls run one after another; a later call sends the checksum of the
    /// file an earlier one installed.
    pub async fn check_for_update(&self) -> Result<UpdateOutcome, UpdateError> {
        let Some(license_key) = self.license_key.as_deref() else {
            self.sink.trace(
                "Cannot update database file because license key is not set",
                EVENT_CATEGORY,
            );
            return Ok(UpdateOutcome::Skipped);
        };

        let in_flight = Arc::clone(&self.in_flight).lock_owned().await;

        let store = Arc::clone(&self.store);
        let checksum = tokio::task::spawn_blocking(move || store.checksum())
            .await
            .map_err(|e| apply_failed(self.store.db_path(), io::Error::other(e)))?
            .map_err(|e| apply_failed(self.store.db_path(), e))?;

        let url = build_update_url(&self.update_url, license_key, checksum.as_deref())?;
        self.sink.trace("Checking for updates", EVENT_CATEGORY);
        log::debug!("Requesting {}", redact(&url));

        let payload = fetch_update(&self.client, url).await?;

        if is_no_update(&payload) {
            self.sink
                .trace("Update skipped: database is current", EVENT_CATEGORY);
            return Ok(UpdateOutcome::NoUpdate);
        }

        self.sink.trace(
            &format!("Updating file ({} byte payload)", payload.len()),
            EVENT_CATEGORY,
        );

        // Decompress and swap in one blocking job: if the calling future is
        // dropped the job still finishes (keeping the staging file to itself),
        // and a closed store discards the file
        let store = Arc::clone(&self.store);
        let bytes = tokio::task::spawn_blocking(move || -> Result<u64, UpdateError> {
            let _in_flight = in_flight;
            let staging = store.staging_path().to_path_buf();
            if let Some(dir) = staging.parent() {
                fs::create_dir_all(dir).map_err(|source| UpdateError::ApplyFailed {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
            let bytes = decompress_to_file(&payload, &staging).map_err(|source| {
                discard(&staging);
                UpdateError::ApplyFailed {
                    path: staging.clone(),
                    source,
                }
            })?;
            store.swap(&staging)?;
            Ok(bytes)
        })
        .await
        .map_err(|e| apply_failed(self.store.staging_path(), io::Error::other(e)))??;

        self.sink.trace(
            &format!("Update applied: database is now {} bytes", bytes),
            EVENT_CATEGORY,
        );
        Ok(UpdateOutcome::Applied { bytes })
    }

    /// Runs a check and reports any failure to the sink instead of returning it.
    pub async fn run_scheduled_check(&self) {
        if let Err(e) = self.check_for_update().await {
            self.sink.log_error(EVENT_CATEGORY, &e);
        }
    }
}

fn apply_failed(path: &Path, source: io::Error) -> UpdateError {
    UpdateError::ApplyFailed {
        path: path.to_path_buf(),
        source,
    }
}

fn discard(staging: &Path) {
    if let Err(e) = fs::remove_file(staging) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", staging.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DB_FILE_NAME, NO_UPDATE_SENTINEL};
    use crate::events::test_support::RecordingSink;
    use crate::trie::{seek_country, TrieBuilder};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use std::io::Write;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tempfile::TempDir;

    fn single_country_db(country: usize) -> Vec<u8> {
        let mut builder = TrieBuilder::new();
        builder.insert(Ipv4Addr::UNSPECIFIED, 0, country).unwrap();
        builder.build()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    struct Fixture {
        _temp_dir: TempDir,
        store: Arc<DatabaseStore>,
        sink: Arc<RecordingSink>,
        updater: Updater,
    }

    fn fixture(update_url: String, license_key: Option<&str>) -> Fixture {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(DatabaseStore::new(temp_dir.path(), sink.clone()));
        let config = LookupConfig {
            license_key: license_key.map(str::to_string),
            store_dir: temp_dir.path().to_path_buf(),
            update_url,
            fetch_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let updater = Updater::new(&config, Arc::clone(&store), sink.clone()).unwrap();
        Fixture {
            _temp_dir: temp_dir,
            store,
            sink,
            updater,
        }
    }

    #[tokio::test]
    async fn test_no_license_key_skips_without_request() {
        // Port 9 (discard) would fail loudly if anything were requested
        let f = fixture("http://127.0.0.1:9/update".to_string(), None);
        let outcome = f.updater.check_for_update().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Skipped);
        assert!(f
            .sink
            .traces()
            .iter()
            .any(|t| t.contains("license key is not set")));
    }

    #[tokio::test]
    async fn test_sends_license_key_and_checksum() {
        let server = Server::run();
        let f = fixture(server.url("/app/update").to_string(), Some("abc123"));
        std::fs::write(f.store.db_path(), b"").unwrap();

        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/app/update"),
                request::query(url_decoded(contains(("license_key", "abc123")))),
                request::query(url_decoded(contains((
                    "md5",
                    "d41d8cd98f00b204e9800998ecf8427e"
                )))),
            ])
            .respond_with(status_code(200).body(NO_UPDATE_SENTINEL)),
        );

        assert_eq!(
            f.updater.check_for_update().await.unwrap(),
            UpdateOutcome::NoUpdate
        );
    }

    #[tokio::test]
    async fn test_missing_file_sends_empty_checksum() {
        let server = Server::run();
        let f = fixture(server.url("/app/update").to_string(), Some("abc123"));

        server.expect(
            Expectation::matching(request::query(url_decoded(contains(("md5", "")))))
                .respond_with(status_code(200).body(gzip(&single_country_db(16)))),
        );

        let outcome = f.updater.check_for_update().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied { bytes: 6 });
        assert_eq!(seek_country(&*f.store, 0).unwrap(), 16);
    }

    #[tokio::test]
    async fn test_sentinel_writes_nothing() {
        let server = Server::run();
        let f = fixture(server.url("/app/update").to_string(), Some("abc123"));
        let original = single_country_db(56);
        std::fs::write(f.store.db_path(), &original).unwrap();

        server.expect(
            Expectation::matching(request::method_path("GET", "/app/update"))
                .respond_with(status_code(200).body(NO_UPDATE_SENTINEL)),
        );

        let outcome = f.updater.check_for_update().await.unwrap();
        assert_eq!(outcome, UpdateOutcome::NoUpdate);
        assert!(!f.store.staging_path().exists());
        assert_eq!(std::fs::read(f.store.db_path()).unwrap(), original);
    }

    #[tokio::test]
    async fn test_near_sentinel_is_treated_as_payload() {
        // One byte off the sentinel: it is not gzip, so applying it fails
        let server = Server::run();
        let f = fixture(server.url("/app/update").to_string(), Some("abc123"));
        let original = single_country_db(56);
        std::fs::write(f.store.db_path(), &original).unwrap();
        f.store.ensure_open().unwrap();

        server.expect(
            Expectation::matching(request::method_path("GET", "/app/update"))
                .respond_with(status_code(200).body("No new updates available!")),
        );

        let err = f.updater.check_for_update().await.unwrap_err();
        assert!(matches!(err, UpdateError::ApplyFailed { .. }));
        assert!(!f.store.staging_path().exists());
        assert_eq!(std::fs::read(f.store.db_path()).unwrap(), original);
        assert_eq!(seek_country(&*f.store, 0).unwrap(), 56);
    }

    #[tokio::test]
    async fn test_http_error_keeps_database() {
        let server = Server::run();
        let f = fixture(server.url("/app/update").to_string(), Some("bad-key"));
        std::fs::write(f.store.db_path(), single_country_db(56)).unwrap();

        server.expect(
            Expectation::matching(request::method_path("GET", "/app/update"))
                .respond_with(status_code(401).body("Invalid license key")),
        );

        let err = f.updater.check_for_update().await.unwrap_err();
        assert!(matches!(err, UpdateError::FetchFailed(_)));
        assert!(err.to_string().contains("401"));
        assert!(f.store.db_path().ends_with(DB_FILE_NAME));
        assert_eq!(
            std::fs::read(f.store.db_path()).unwrap(),
            single_country_db(56)
        );
    }

    #[tokio::test]
    async fn test_scheduled_check_reports_errors_to_sink() {
        let server = Server::run();
        let f = fixture(server.url("/app/update").to_string(), Some("abc123"));
        server.expect(
            Expectation::matching(request::method_path("GET", "/app/update"))
                .respond_with(status_code(503)),
        );

        f.updater.run_scheduled_check().await;
        let errors = f.sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("503"));
    }
}
