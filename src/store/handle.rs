//! Lock-guarded shared reader.
//!
//! A seekable handle has one cursor, so a seek and the read that follows it
//! must happen under the same lock. `SharedReader` owns the handle behind a
//! mutex and only exposes whole-record reads and whole-handle replacement.

use std::io::{Read, Seek, SeekFrom};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::NODE_SIZE;
use crate::error_handling::LookupError;
use crate::trie::{Node, NodeSource};

/// A seekable reader shared between threads.
#[derive(Debug)]
pub struct SharedReader<R> {
    handle: Mutex<Option<R>>,
}

impl<R> Default for SharedReader<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R> SharedReader<R> {
    /// Wraps an open reader.
    pub fn new(reader: R) -> Self {
        SharedReader {
            handle: Mutex::new(Some(reader)),
        }
    }

    /// Creates a reader with no handle; reads fail with `NotReady`.
    pub fn empty() -> Self {
        SharedReader {
            handle: Mutex::new(None),
        }
    }

    /// Returns true if a handle is currently installed.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Runs `f` with exclusive access to the handle slot.
    ///
    /// Everything `f` does (close, rename, reopen) is atomic with respect to
    /// record reads.
    pub fn with_handle<T>(&self, f: impl FnOnce(&mut Option<R>) -> T) -> T {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Removes and returns the handle, leaving the reader empty.
    pub fn take(&self) -> Option<R> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<R>> {
        // The slot holds no invariant a panicking reader could break
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Read + Seek> SharedReader<R> {
    /// Reads the raw record of node `node` as one locked seek+read.
    pub fn read_record(&self, node: u32) -> Result<[u8; NODE_SIZE], LookupError> {
        self.with_handle(|handle| {
            let reader = handle.as_mut().ok_or(LookupError::NotReady)?;
            let mut record = [0u8; NODE_SIZE];
            reader
                .seek(SeekFrom::Start(u64::from(node) * NODE_SIZE as u64))
                .and_then(|_| reader.read_exact(&mut record))
                .map_err(|source| LookupError::Corrupt { node, source })?;
            Ok(record)
        })
    }
}

impl<R: Read + Seek> NodeSource for SharedReader<R> {
    fn read_node(&self, node: u32) -> Result<Node, LookupError> {
        self.read_record(node).map(|record| Node::from_record(&record))
    }
}
