// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error type for whiteboard operations.

use slate_record::PackageType;
use slate_record_codec::DecodeError;
use slate_remote::RemoteError;
use thiserror::Error;

/// Everything a whiteboard operation can fail with.
///
/// Request errors are raised before any file is touched; I/O errors abort
/// the operation with in-memory state unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Scene index outside the directory.
    #[error("scene {scene} does not exist ({count} scenes)")]
    InvalidScene {
        /// Requested scene.
        scene: i32,
        /// Scenes currently known.
        count: usize,
    },
    /// Page index outside its scene.
    #[error("page {page} outside scene {scene} ({page_count} pages)")]
    InvalidPage {
        /// Owning scene.
        scene: i32,
        /// Requested page.
        page: i32,
        /// Pages in the scene.
        page_count: usize,
    },
    /// AddScene with a non-positive page count.
    #[error("page_count must be positive, got {0}")]
    InvalidPageCount(i32),
    /// AddScene index beyond the next free slot.
    #[error("scene index {index} leaves a gap ({count} scenes)")]
    SceneIndexGap {
        /// Requested index.
        index: i32,
        /// Scenes currently known.
        count: usize,
    },
    /// AddScene for a scene that already holds the same resource.
    #[error("scene {0} already holds this resource")]
    DuplicateScene(usize),
    /// AddScene for an occupied index with a different resource.
    #[error("scene {0} already exists")]
    SceneOccupied(usize),
    /// AddScene without a scene descriptor.
    #[error("AddScene package carries no scene descriptor")]
    MissingSceneInfo,
    /// PageChange without a page descriptor.
    #[error("{0:?} package carries no page descriptor")]
    MissingPageInfo(PackageType),
    /// The page view would grow past the configured cap.
    #[error("page view would exceed {limit} packages")]
    ViewCapacity {
        /// Configured cap.
        limit: usize,
    },
    /// Encoded record larger than the configured frame limit.
    #[error("record of {len} bytes exceeds frame limit {limit}")]
    RecordTooLarge {
        /// Encoded length.
        len: usize,
        /// Configured limit.
        limit: u64,
    },
    /// Malformed inbound package or export header.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Disk read/write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Object storage failure while mirroring.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
    /// Another caller panicked while holding the whiteboard lock.
    #[error("whiteboard lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Stable negative result code for callers that speak integers.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidScene { .. } => -1,
            Self::InvalidPage { .. } => -2,
            Self::InvalidPageCount(_) => -3,
            Self::SceneIndexGap { .. } => -4,
            Self::DuplicateScene(_) => -5,
            Self::SceneOccupied(_) => -6,
            Self::MissingSceneInfo => -7,
            Self::MissingPageInfo(_) => -8,
            Self::ViewCapacity { .. } => -9,
            Self::RecordTooLarge { .. } => -10,
            Self::Decode(_) => -11,
            Self::Io(_) => -12,
            Self::Remote(_) => -13,
            Self::Poisoned => -14,
        }
    }

    /// Returns `true` when the request itself was at fault (nothing was written).
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::Io(_) | Self::Remote(_) | Self::Poisoned
        )
    }
}
