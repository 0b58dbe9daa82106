// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted preferences for Slate tools.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use slate_store::{StoreConfig, WhiteboardOptions};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Where whiteboards live and how they are opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardPrefs {
    /// Directory holding `<name>.data` and friends.
    pub data_dir: PathBuf,
    /// Engine tunables.
    pub store: StoreConfig,
    /// Mirror root for the filesystem object store, if any.
    pub remote_root: Option<PathBuf>,
    /// Object locator prefix used with `remote_root`,
    /// e.g. `oss://lessons.example.com/boards`.
    pub remote_prefix: Option<String>,
}

impl BoardPrefs {
    /// Config key under which prefs are stored.
    pub const KEY: &'static str = "board";

    /// Load prefs, writing defaults on first use.
    pub fn load<S: ConfigStore>(config: &ConfigService<S>) -> Result<Self, ConfigError> {
        config.load_or_default(Self::KEY)
    }

    /// Persist prefs.
    pub fn save<S: ConfigStore>(&self, config: &ConfigService<S>) -> Result<(), ConfigError> {
        config.save(Self::KEY, self)
    }

    /// Engine options without a remote mirror.
    pub fn local_options(&self) -> WhiteboardOptions {
        WhiteboardOptions {
            config: self.store.clone(),
            remote: None,
        }
    }
}

impl Default for BoardPrefs {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("boards"),
            store: StoreConfig::default(),
            remote_root: None,
            remote_prefix: None,
        }
    }
}
