// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory object store.
//!
//! [`MemoryObjectStore`] keeps objects in a shared map. Clones share the same
//! map, so a test can hand one clone to a whiteboard and inspect the other.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{slice_range, ObjectHandle, ObjectLocator, ObjectStore, RemoteError};

type ObjectMap = HashMap<ObjectLocator, Arc<[u8]>>;

/// In-memory object store.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<ObjectMap>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of an object's bytes. Absence is not an error.
    pub fn get(&self, locator: &ObjectLocator) -> Option<Arc<[u8]>> {
        lock(&self.objects).get(locator).cloned()
    }

    /// Store `bytes` at `locator`, replacing any previous object.
    pub fn put(&self, locator: ObjectLocator, bytes: &[u8]) {
        lock(&self.objects).insert(locator, Arc::from(bytes));
    }
}

// A poisoned map only means another holder panicked mid-insert; the map
// itself is still structurally valid.
fn lock(objects: &Mutex<ObjectMap>) -> MutexGuard<'_, ObjectMap> {
    objects
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ObjectStore for MemoryObjectStore {
    fn create(&self, locator: &ObjectLocator) -> Result<Box<dyn ObjectHandle>, RemoteError> {
        Ok(Box::new(MemoryHandle {
            objects: Arc::clone(&self.objects),
            locator: locator.clone(),
        }))
    }
}

struct MemoryHandle {
    objects: Arc<Mutex<ObjectMap>>,
    locator: ObjectLocator,
}

impl MemoryHandle {
    fn bytes(&self) -> Result<Arc<[u8]>, RemoteError> {
        lock(&self.objects)
            .get(&self.locator)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(self.locator.to_string()))
    }
}

impl ObjectHandle for MemoryHandle {
    fn locator(&self) -> &ObjectLocator {
        &self.locator
    }

    fn read_to_file(&mut self, local: &Path) -> Result<u64, RemoteError> {
        let bytes = self.bytes()?;
        fs::write(local, &bytes)?;
        Ok(bytes.len() as u64)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), RemoteError> {
        lock(&self.objects).insert(self.locator.clone(), Arc::from(bytes));
        Ok(())
    }

    fn read_range(&mut self, start: u64, len: usize) -> Result<Vec<u8>, RemoteError> {
        slice_range(&self.bytes()?, start, len)
    }
}
