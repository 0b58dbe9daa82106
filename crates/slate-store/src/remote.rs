// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mirroring the session logs to object storage.

use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;

use slate_remote::{ObjectLocator, ObjectStore, RemoteError};
use tracing::{info, warn};

use crate::paths::SessionPaths;
use crate::StoreError;

/// Remote copy of one whiteboard's files.
///
/// Objects live at `prefix` extended by each file suffix, e.g.
/// `oss://bucket.host/boards/42.data`.
#[derive(Clone)]
pub struct RemoteMirror {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectLocator,
}

impl RemoteMirror {
    /// Mirror rooted at `prefix` in `store`.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: ObjectLocator) -> Self {
        Self { store, prefix }
    }

    /// Object prefix.
    pub fn prefix(&self) -> &ObjectLocator {
        &self.prefix
    }

    /// Download every log that exists remotely, replacing the local copy.
    ///
    /// A log that was never uploaded is skipped; any other failure is an error.
    pub fn pull(&self, paths: &SessionPaths) -> Result<usize, StoreError> {
        let mut fetched = 0;
        for (suffix, local) in paths.logs() {
            let mut handle = self.store.create(&self.prefix.with_suffix(suffix))?;
            match handle.read_to_file(local) {
                Ok(bytes) => {
                    fetched += 1;
                    info!(object = %handle.locator(), bytes, "pulled");
                }
                Err(RemoteError::NotFound(object)) => {
                    warn!(%object, "no remote copy; starting this log empty");
                }
                Err(err) => return Err(err.into()),
            }
            handle.close()?;
        }
        Ok(fetched)
    }

    /// Upload the four logs, plus the export when one exists locally.
    pub fn push(&self, paths: &SessionPaths) -> Result<usize, StoreError> {
        let mut pushed = 0;
        let export = (".board", paths.export.as_path());
        for (suffix, local) in paths.logs().into_iter().chain([export]) {
            let bytes = match fs::read(local) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            let mut handle = self.store.create(&self.prefix.with_suffix(suffix))?;
            handle.write(&bytes)?;
            info!(object = %handle.locator(), bytes = bytes.len(), "pushed");
            handle.close()?;
            pushed += 1;
        }
        Ok(pushed)
    }
}
