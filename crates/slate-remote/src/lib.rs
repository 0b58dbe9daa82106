// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object-storage port for Slate.
//!
//! `slate-remote` provides an [`ObjectStore`] trait for fetching and pushing
//! whole objects addressed by an [`ObjectLocator`]. Two backends ship here:
//! [`MemoryObjectStore`] for tests and single-process setups, and
//! [`FsObjectStore`] which mirrors objects under a local directory.
//!
//! Backends are chosen by the caller and injected as `Arc<dyn ObjectStore>`;
//! nothing is resolved by name at runtime.
//!
//! # Absence Semantics
//!
//! A missing object is reported as [`RemoteError::NotFound`]. Callers that
//! treat "never uploaded" as an empty starting state match on that variant and
//! fail on everything else.
#![forbid(unsafe_code)]

mod fs;
mod locator;
mod memory;

pub use fs::FsObjectStore;
pub use locator::ObjectLocator;
pub use memory::MemoryObjectStore;

use std::path::Path;

/// Errors that can occur during object-storage operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The addressed object does not exist.
    #[error("[REMOTE_NOT_FOUND] {0}")]
    NotFound(String),
    /// The locator string could not be parsed.
    #[error("[REMOTE_BAD_LOCATOR] {locator}: {reason}")]
    InvalidLocator {
        /// Offending input.
        locator: String,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// Local or backend I/O failure.
    #[error("[REMOTE_IO] {0}")]
    Io(#[from] std::io::Error),
    /// Requested range lies outside the object.
    #[error("[REMOTE_RANGE] {start}+{len} outside object of {size} bytes")]
    Range {
        /// First requested byte.
        start: u64,
        /// Requested length.
        len: usize,
        /// Object size.
        size: u64,
    },
}

/// Factory for object handles.
///
/// Implementations must be shareable across sessions; each whiteboard holds
/// its own handles and never shares them.
pub trait ObjectStore: Send + Sync {
    /// Open a handle to the object at `locator`. The object need not exist yet.
    fn create(&self, locator: &ObjectLocator) -> Result<Box<dyn ObjectHandle>, RemoteError>;
}

/// Open handle to a single remote object.
///
/// Dropping a handle releases it; [`close`](ObjectHandle::close) does the same
/// but reports backend errors.
pub trait ObjectHandle: Send {
    /// Address of this object.
    fn locator(&self) -> &ObjectLocator;

    /// Download the whole object into `local`, replacing its contents.
    /// Returns the number of bytes written.
    fn read_to_file(&mut self, local: &Path) -> Result<u64, RemoteError>;

    /// Replace the object's contents with `bytes`.
    fn write(&mut self, bytes: &[u8]) -> Result<(), RemoteError>;

    /// Read `len` bytes starting at `start`.
    fn read_range(&mut self, start: u64, len: usize) -> Result<Vec<u8>, RemoteError>;

    /// Release the handle.
    fn close(self: Box<Self>) -> Result<(), RemoteError> {
        Ok(())
    }
}

fn slice_range(bytes: &[u8], start: u64, len: usize) -> Result<Vec<u8>, RemoteError> {
    let size = bytes.len() as u64;
    let out_of_range = || RemoteError::Range { start, len, size };
    let begin = usize::try_from(start).map_err(|_| out_of_range())?;
    let end = begin.checked_add(len).ok_or_else(out_of_range)?;
    bytes
        .get(begin..end)
        .map(<[u8]>::to_vec)
        .ok_or_else(out_of_range)
}
