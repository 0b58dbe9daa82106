// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! On-disk file names for one whiteboard.

use std::path::{Path, PathBuf};

/// The four logs plus the export artifact of a whiteboard named `name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPaths {
    /// `<name>.data`: every logged package.
    pub data: PathBuf,
    /// `<name>.head`: keyframe index.
    pub head: PathBuf,
    /// `<name>.scene`: scene directory.
    pub scene: PathBuf,
    /// `<name>.page`: page transforms and switch records.
    pub page: PathBuf,
    /// `<name>.board`: combined export.
    pub export: PathBuf,
}

impl SessionPaths {
    /// File suffixes of the four logs, in mirror order.
    pub const LOG_SUFFIXES: [&'static str; 4] = [".data", ".head", ".scene", ".page"];

    /// Paths for `name` inside `dir`.
    pub fn new(dir: &Path, name: &str) -> Self {
        let file = |suffix: &str| dir.join(format!("{name}{suffix}"));
        Self {
            data: file(".data"),
            head: file(".head"),
            scene: file(".scene"),
            page: file(".page"),
            export: file(".board"),
        }
    }

    /// `(suffix, path)` for each of the four logs.
    pub fn logs(&self) -> [(&'static str, &Path); 4] {
        [
            (".data", self.data.as_path()),
            (".head", self.head.as_path()),
            (".scene", self.scene.as_path()),
            (".page", self.page.as_path()),
        ]
    }
}
