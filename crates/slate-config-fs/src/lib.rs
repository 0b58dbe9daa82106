// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Settings documents as `<key>.json` files in one directory.
//!
//! By default the directory is the per-user Slate config dir
//! (`~/.config/slate` on Linux); `--config-dir` style overrides use
//! [`FsConfigStore::at`]. Writes go through a sibling `.partial` file and a
//! rename, so a crash never leaves half a document behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use slate_app_core::config::{ConfigError, ConfigStore};

/// Directory of JSON settings documents.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    root: PathBuf,
}

impl FsConfigStore {
    /// Store in the per-user Slate config directory.
    pub fn new() -> Result<Self, ConfigError> {
        let dirs =
            ProjectDirs::from("dev", "flyingrobots", "slate").ok_or(ConfigError::NoConfigDir)?;
        Self::at(dirs.config_dir())
    }

    /// Store in `root`, creating it if needed.
    pub fn at(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the documents.
    pub fn base(&self) -> &Path {
        &self.root
    }

    fn document(&self, key: &str) -> PathBuf {
        self.root.join(key).with_extension("json")
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        fs::read(self.document(key)).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ConfigError::Missing(key.to_owned()),
            _ => ConfigError::Io(err),
        })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let target = self.document(key);
        let staging = target.with_extension("json.partial");
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &target)?;
        Ok(())
    }
}
