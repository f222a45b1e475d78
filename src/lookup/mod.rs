//! The lookup service.
//!
//! [`CountryLookup`] ties the store, the trie reader and the updater
//! together. Build one per process and share it behind an `Arc`.

mod address;

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::config::{LookupConfig, EVENT_CATEGORY, UPDATE_INTERVAL};
use crate::countries::{country_code, country_name};
use crate::error_handling::{LookupError, UpdateError};
use crate::events::{EventSink, LogEventSink};
use crate::store::{DatabaseStore, StoreState};
use crate::trie::seek_country;
use crate::update::{spawn_schedule, ScheduleHandle, SchedulePlan, UpdateOutcome, Updater};

pub use address::{parse_ipv4, AddressInput};

/// IP-to-country lookup service.
///
/// Lookups are synchronous and can run from any thread. Updates run on a
/// background Tokio task started by [`ensure_ready`](Self::ensure_ready).
///
/// # Examples
///
/// ```no_run
/// use country_lookup::{CountryLookup, LookupConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let lookup = CountryLookup::new(LookupConfig::default())?;
/// lookup.ensure_ready().await;
/// assert_eq!(lookup.lookup_country_code("not an address"), None);
/// if let Some(code) = lookup.lookup_country_code("8.8.8.8") {
///     println!("{code}");
/// }
/// lookup.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct CountryLookup {
    config: LookupConfig,
    store: Arc<DatabaseStore>,
    updater: Arc<Updater>,
    sink: Arc<dyn EventSink>,
    /// Serializes `ensure_ready` and `shutdown`
    init: tokio::sync::Mutex<()>,
    started: AtomicBool,
    schedule: Mutex<Option<ScheduleHandle>>,
    /// Corrupt nodes already reported, keyed by store generation
    corrupt_reported: Mutex<HashSet<(u64, u32)>>,
}

impl CountryLookup {
    /// Creates a service that reports events through the `log` facade.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::FetchFailed` if the HTTP client cannot be built.
    pub fn new(config: LookupConfig) -> Result<Self, UpdateError> {
        Self::with_sink(config, Arc::new(LogEventSink))
    }

    /// Creates a service that reports events to `sink`.
    pub fn with_sink(config: LookupConfig, sink: Arc<dyn EventSink>) -> Result<Self, UpdateError> {
        let store = Arc::new(DatabaseStore::new(config.store_dir.clone(), Arc::clone(&sink)));
        let updater = Arc::new(Updater::new(&config, Arc::clone(&store), Arc::clone(&sink))?);

        Ok(CountryLookup {
            config,
            store,
            updater,
            sink,
            init: tokio::sync::Mutex::new(()),
            started: AtomicBool::new(false),
            schedule: Mutex::new(None),
            corrupt_reported: Mutex::new(HashSet::new()),
        })
    }

    /// Configuration the service was built with.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// The underlying database store.
    pub fn store(&self) -> &Arc<DatabaseStore> {
        &self.store
    }

    /// Makes the database available and starts the update schedule.
    ///
    /// The first call downloads the database if none is on disk and a
    /// license key is configured, then starts the daily schedule (only with a
    /// license key). Later calls only retry opening the file. Failures are
    /// reported to the event sink; lookups keep answering `None` until a
    /// database is available.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn ensure_ready(&self) {
        let _guard = self.init.lock().await;

        if !self.started.load(Ordering::Acquire) && self.store.state() != StoreState::Closed {
            let had_file = self.store.has_database();
            let has_key = self.config.license_key().is_some();

            if !had_file && has_key {
                if let Err(e) = self.updater.check_for_update().await {
                    self.sink.log_error(EVENT_CATEGORY, &e);
                }
            }

            if has_key {
                self.start_schedule(had_file);
            }
            self.started.store(true, Ordering::Release);
        }

        if let Err(e) = self.store.ensure_open() {
            log::debug!("Database not available yet: {}", e);
        }
    }

    fn start_schedule(&self, had_file: bool) {
        let plan = SchedulePlan::from_now(&Local::now(), self.config.update_hour, had_file);
        let updater = Arc::clone(&self.updater);
        let handle = spawn_schedule(plan, UPDATE_INTERVAL, move || {
            let updater = Arc::clone(&updater);
            async move { updater.run_scheduled_check().await }
        });

        let mut schedule = self.schedule.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = schedule.replace(handle) {
            previous.cancel();
        }

        log::debug!(
            "First update check in {:?}, quick check {:?}",
            plan.first_check,
            plan.quick_check
        );
        self.sink.trace("File update timer started", EVENT_CATEGORY);
    }

    /// Runs one update check right away, outside the schedule.
    ///
    /// # Errors
    ///
    /// Returns the `UpdateError` of the failed step; the previous database
    /// stays active.
    pub async fn check_now(&self) -> Result<UpdateOutcome, UpdateError> {
        self.updater.check_for_update().await
    }

    /// Resolves `addr` to a country index (0 means unknown).
    ///
    /// Opens the database on first use.
    ///
    /// # Errors
    ///
    /// - `LookupError::NotReady` if no database is available
    /// - `LookupError::Corrupt` if the database is damaged
    pub fn country_index(&self, addr: Ipv4Addr) -> Result<usize, LookupError> {
        self.store.ensure_open()?;
        seek_country(&*self.store, u32::from(addr))
    }

    /// Returns the two-letter country code for `addr`, or `None` if the
    /// address is invalid, unknown, or no database is available.
    pub fn lookup_country_code<A: AddressInput + ?Sized>(&self, addr: &A) -> Option<&'static str> {
        self.resolve(addr).and_then(country_code)
    }

    /// Returns the English country name for `addr`, or `None` if the
    /// address is invalid, unknown, or no database is available.
    pub fn lookup_country_name<A: AddressInput + ?Sized>(&self, addr: &A) -> Option<&'static str> {
        self.resolve(addr).and_then(country_name)
    }

    fn resolve<A: AddressInput + ?Sized>(&self, addr: &A) -> Option<usize> {
        let addr = addr.to_ipv4()?;
        let generation = self.store.generation();
        match self.country_index(addr) {
            Ok(index) => Some(index),
            Err(LookupError::Corrupt { node, source }) if self.first_report(generation, node) => {
                self.sink
                    .log_error(EVENT_CATEGORY, &LookupError::Corrupt { node, source });
                None
            }
            Err(e) => {
                log::debug!("Lookup of {} skipped: {}", addr, e);
                None
            }
        }
    }

    /// Returns true the first time `node` of database `generation` is seen
    /// corrupt. Later hits on the same node only log at debug level.
    fn first_report(&self, generation: u64, node: u32) -> bool {
        let mut reported = self
            .corrupt_reported
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if reported.iter().any(|&(seen, _)| seen != generation) {
            // A newer file replaced the one these reports were about
            reported.clear();
        }
        reported.insert((generation, node))
    }

    /// Stops the update schedule and closes the database.
    ///
    /// Lookups after shutdown return `None`. Idempotent.
    pub async fn shutdown(&self) {
        let _guard = self.init.lock().await;

        let handle = self
            .schedule
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.stop().await;
        }

        if self.store.state() != StoreState::Closed {
            self.sink.trace("Closing down services", EVENT_CATEGORY);
            self.store.close();
        }
    }
}

impl Drop for CountryLookup {
    fn drop(&mut self) {
        let schedule = self.schedule.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = schedule.take() {
            handle.cancel();
        }
    }
}

impl std::fmt::Debug for CountryLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountryLookup")
            .field("store_dir", &self.config.store_dir)
            .field("state", &self.store.state())
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish()
    }
}
