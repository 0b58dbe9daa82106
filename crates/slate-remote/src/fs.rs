// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed object store: `root/<bucket>/<object>`.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use crate::{ObjectHandle, ObjectLocator, ObjectStore, RemoteError};

/// Mirrors objects as plain files under a root directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Store rooted at `root` (created lazily on first write).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for FsObjectStore {
    fn create(&self, locator: &ObjectLocator) -> Result<Box<dyn ObjectHandle>, RemoteError> {
        let relative = Path::new(&locator.object);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(RemoteError::InvalidLocator {
                locator: locator.to_string(),
                reason: "object path escapes the bucket",
            });
        }
        Ok(Box::new(FsHandle {
            path: self.root.join(&locator.bucket).join(relative),
            locator: locator.clone(),
        }))
    }
}

struct FsHandle {
    path: PathBuf,
    locator: ObjectLocator,
}

impl FsHandle {
    fn open(&self) -> Result<File, RemoteError> {
        File::open(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => RemoteError::NotFound(self.locator.to_string()),
            _ => RemoteError::Io(err),
        })
    }
}

impl ObjectHandle for FsHandle {
    fn locator(&self) -> &ObjectLocator {
        &self.locator
    }

    fn read_to_file(&mut self, local: &Path) -> Result<u64, RemoteError> {
        let mut src = self.open()?;
        let mut dst = File::create(local)?;
        Ok(std::io::copy(&mut src, &mut dst)?)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), RemoteError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut staging = self.path.clone().into_os_string();
        staging.push(".partial");
        let staging = PathBuf::from(staging);
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn read_range(&mut self, start: u64, len: usize) -> Result<Vec<u8>, RemoteError> {
        let mut file = self.open()?;
        let size = file.metadata()?.len();
        let in_range = start
            .checked_add(len as u64)
            .is_some_and(|end| end <= size);
        if !in_range {
            return Err(RemoteError::Range { start, len, size });
        }
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}
