// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default frame length cap: 16 MiB.
pub const DEFAULT_MAX_RECORD_LEN: u64 = 16 * 1024 * 1024;

/// Default cap on packages held in a single page view.
pub const DEFAULT_MAX_VIEW_PACKAGES: usize = 10_000;

/// Tunables for one whiteboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Frames declaring a longer payload are treated as a corrupt tail, and
    /// appends of longer records are refused.
    pub max_record_len: u64,
    /// Cap on packages in one page view; `None` disables the cap.
    pub max_view_packages: Option<usize>,
    /// `fsync` data after every append.
    pub sync_writes: bool,
    /// Write `<name>.board` when the whiteboard closes.
    pub export_on_close: bool,
    /// Cut unreadable log tails on open so new frames start on a frame
    /// boundary. Off by default: tails are left in place and appends land
    /// after them, where later scans cannot reach.
    pub trim_torn_tails: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            max_view_packages: Some(DEFAULT_MAX_VIEW_PACKAGES),
            sync_writes: false,
            export_on_close: false,
            trim_torn_tails: false,
        }
    }
}
