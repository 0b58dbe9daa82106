// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON settings documents behind a pluggable byte store.
//!
//! Slate keeps one document per key (today only [`BoardPrefs`](crate::prefs::BoardPrefs)
//! under `"board"`). The store moves bytes; [`ConfigService`] owns the JSON
//! encoding and the "first run writes defaults" rule.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Byte storage for settings documents.
pub trait ConfigStore {
    /// Bytes stored under `key`; [`ConfigError::Missing`] when there are none.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace the bytes stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Settings failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("no settings stored under {0:?}")]
    Missing(String),
    /// The platform has no per-user config directory.
    #[error("no per-user config directory on this platform")]
    NoConfigDir,
    /// Reading or writing the backing store failed.
    #[error("settings i/o: {0}")]
    Io(#[from] std::io::Error),
    /// The stored document is not valid JSON for the requested type.
    #[error("settings {key:?} are malformed: {source}")]
    Malformed {
        /// Document key.
        key: String,
        /// Parser error.
        source: serde_json::Error,
    },
    /// A value could not be encoded.
    #[error("settings encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Typed settings on top of a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S: ConfigStore> ConfigService<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode `key`; an absent or empty document reads as `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let bytes = match self.store.load_raw(key) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) | Err(ConfigError::Missing(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ConfigError::Malformed {
                key: key.to_owned(),
                source,
            })
    }

    /// Encode `value` as pretty JSON under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        self.store.save_raw(key, &serde_json::to_vec_pretty(value)?)
    }

    /// Decode `key`, writing `T::default()` first if nothing is stored yet.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        match self.load(key)? {
            Some(value) => Ok(value),
            None => {
                let value = T::default();
                self.save(key, &value)?;
                Ok(value)
            }
        }
    }
}
