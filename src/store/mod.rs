//! Database file ownership.
//!
//! [`DatabaseStore`] owns the single open handle to the active database file.
//! It opens the file lazily, serializes every read through one lock, and
//! replaces the file under that same lock when an update arrives.
//!
//! State moves `Uninitialized -> Ready -> Closed`. A swap happens inside
//! `Ready` while holding the handle lock, so readers simply wait for it.

mod checksum;
mod handle;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::config::{DB_FILE_NAME, EVENT_CATEGORY, NODE_SIZE, TEMP_DB_FILE_NAME};
use crate::error_handling::{LookupError, UpdateError};
use crate::events::EventSink;
use crate::trie::{Node, NodeSource};

// Re-export public API
pub use checksum::file_md5;
pub use handle::SharedReader;

/// Observable lifecycle state of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No handle has been opened yet (or the file is missing)
    Uninitialized,
    /// A handle is open and lookups can run
    Ready,
    /// Closed for good; lookups fail with `NotReady`
    Closed,
}

/// Snapshot of the active database file.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    /// Location of the active file
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Number of trie nodes (size / 6)
    pub node_count: u64,
    /// Last modification time
    pub modified: Option<SystemTime>,
    /// Lowercase hex MD5 of the file contents
    pub md5: String,
}

/// Owner of the active database file.
pub struct DatabaseStore {
    db_path: PathBuf,
    staging_path: PathBuf,
    reader: SharedReader<File>,
    /// Fast path for `ensure_open`; only written under the handle lock
    opened: AtomicBool,
    closed: AtomicBool,
    /// Bumped by every successful swap
    generation: AtomicU64,
    sink: Arc<dyn EventSink>,
}

impl DatabaseStore {
    /// Creates a store for `dir`. Nothing is opened until first use.
    pub fn new(dir: impl Into<PathBuf>, sink: Arc<dyn EventSink>) -> Self {
        let dir = dir.into();
        DatabaseStore {
            db_path: dir.join(DB_FILE_NAME),
            staging_path: dir.join(TEMP_DB_FILE_NAME),
            reader: SharedReader::empty(),
            opened: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            sink,
        }
    }

    /// Path of the active database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Path updates are staged at. Same directory as the active file, so the
    /// final rename never crosses filesystems.
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Returns true if the active file exists on disk.
    pub fn has_database(&self) -> bool {
        self.db_path.is_file()
    }

    /// Number of databases swapped in so far.
    ///
    /// Lets callers tell whether two reads could have come from different
    /// files.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StoreState {
        if self.closed.load(Ordering::Acquire) {
            StoreState::Closed
        } else if self.opened.load(Ordering::Acquire) {
            StoreState::Ready
        } else {
            StoreState::Uninitialized
        }
    }

    /// Opens the active file if it is not open yet.
    ///
    /// Safe to call from any number of threads; only one of them opens the
    /// file. A missing file is not an error worth reporting: the store stays
    /// uninitialized and the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::NotReady` if the file cannot be opened or the
    /// store is closed.
    pub fn ensure_open(&self) -> Result<(), LookupError> {
        if self.opened.load(Ordering::Acquire) {
            return Ok(());
        }

        self.reader.with_handle(|handle| {
            if self.closed.load(Ordering::Acquire) {
                return Err(LookupError::NotReady);
            }
            if handle.is_some() {
                return Ok(());
            }

            match self.open_file() {
                Ok(file) => {
                    *handle = Some(file);
                    self.opened.store(true, Ordering::Release);
                    Ok(())
                }
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        self.sink.log_error(EVENT_CATEGORY, &e);
                    }
                    Err(LookupError::NotReady)
                }
            }
        })
    }

    /// Replaces the active file with `staged` and reopens it.
    ///
    /// The old handle is dropped before the rename (Windows refuses to replace
    /// an open file). Whatever happens to the rename, the active path is
    /// reopened before the lock is released, so a failed swap leaves the
    /// previous database in service.
    ///
    /// # Errors
    ///
    /// - `UpdateError::Closed` if the store was closed; `staged` is removed
    /// - `UpdateError::ApplyFailed` if the rename failed; `staged` is removed
    pub fn swap(&self, staged: &Path) -> Result<(), UpdateError> {
        self.reader.with_handle(|handle| {
            if self.closed.load(Ordering::Acquire) {
                remove_staged(staged);
                return Err(UpdateError::Closed);
            }

            handle.take();
            self.opened.store(false, Ordering::Release);

            let replaced =
                fs::rename(staged, &self.db_path).map_err(|source| UpdateError::ApplyFailed {
                    path: self.db_path.clone(),
                    source,
                });
            match replaced {
                Ok(()) => {
                    self.generation.fetch_add(1, Ordering::AcqRel);
                }
                Err(_) => remove_staged(staged),
            }

            match self.open_file() {
                Ok(file) => {
                    *handle = Some(file);
                    self.opened.store(true, Ordering::Release);
                }
                Err(e) => self.sink.log_error(EVENT_CATEGORY, &e),
            }

            replaced
        })
    }

    /// Releases the file handle for good. Idempotent.
    pub fn close(&self) {
        self.reader.with_handle(|handle| {
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            self.opened.store(false, Ordering::Release);
            if handle.take().is_some() {
                self.sink.trace("Database file closed", EVENT_CATEGORY);
            }
        })
    }

    /// MD5 of the active file, or `None` if there is no file.
    pub fn checksum(&self) -> io::Result<Option<String>> {
        file_md5(&self.db_path)
    }

    /// Describes the active file, or `None` if there is no file.
    pub fn info(&self) -> io::Result<Option<DatabaseInfo>> {
        let metadata = match fs::metadata(&self.db_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(md5) = self.checksum()? else {
            return Ok(None);
        };

        Ok(Some(DatabaseInfo {
            path: self.db_path.clone(),
            size_bytes: metadata.len(),
            node_count: metadata.len() / NODE_SIZE as u64,
            modified: metadata.modified().ok(),
            md5,
        }))
    }

    fn open_file(&self) -> io::Result<File> {
        let file = File::open(&self.db_path)?;
        self.sink.trace(
            &format!("Database file opened: {}", self.db_path.display()),
            EVENT_CATEGORY,
        );
        Ok(file)
    }
}

impl NodeSource for DatabaseStore {
    fn read_node(&self, node: u32) -> Result<Node, LookupError> {
        self.reader.read_node(node)
    }
}

fn remove_staged(staged: &Path) {
    if let Err(e) = fs::remove_file(staged) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Failed to remove staged database {}: {}", staged.display(), e);
        }
    }
}
