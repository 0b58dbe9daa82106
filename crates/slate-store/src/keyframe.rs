// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Keyframe indexer: decides when a page needs a new replay point and
//! persists it to the header log.

use slate_record::{KeyFrame, PackageType};
use slate_record_codec::encode_keyframe;
use tracing::{debug, warn};

use crate::directory::{Directory, PageRef};
use crate::frame::LogFile;
use crate::StoreError;

/// Enough state to undo one keyframe install.
#[derive(Debug)]
pub(crate) struct KeyframeReceipt {
    at: PageRef,
    previous: Option<KeyFrame>,
    head_len: u64,
}

/// Owner of the `.head` log.
pub(crate) struct KeyframeIndex {
    head: LogFile,
}

impl KeyframeIndex {
    pub(crate) fn new(head: LogFile) -> Self {
        Self { head }
    }

    /// Does a package of `kind` for `at` have to start a new keyframe?
    ///
    /// Explicit keyframes and clears always do; anything else only when the
    /// page has never had one.
    pub(crate) fn required(kind: PackageType, dir: &Directory, at: PageRef) -> bool {
        matches!(kind, PackageType::KeyFrame | PackageType::CleanDraw) || dir.keyframe(at).is_none()
    }

    /// Write a keyframe for `at` pointing at data log `offset` and install it,
    /// replacing the page's previous one.
    pub(crate) fn on_receive_keyframe(
        &mut self,
        dir: &mut Directory,
        at: PageRef,
        offset: u64,
        timestamp: i64,
    ) -> Result<KeyframeReceipt, StoreError> {
        let keyframe = KeyFrame {
            scene: at.scene_i32(),
            page: at.page_i32(),
            offset,
            timestamp,
        };
        let head_len = self.head.len();
        self.head.append(&encode_keyframe(&keyframe))?;
        let previous = dir.replace_keyframe(at, Some(keyframe));
        debug!(scene = at.scene, page = at.page, offset, replaced = previous.is_some(), "keyframe");
        Ok(KeyframeReceipt {
            at,
            previous,
            head_len,
        })
    }

    /// Undo an install whose data-log append failed.
    pub(crate) fn rollback(&mut self, dir: &mut Directory, receipt: KeyframeReceipt) {
        dir.replace_keyframe(receipt.at, receipt.previous);
        if let Err(err) = self.head.truncate_to(receipt.head_len) {
            warn!(path = %self.head.path().display(), %err, "failed to roll back keyframe record");
        }
    }

    pub(crate) fn log(&self) -> &LogFile {
        &self.head
    }

    pub(crate) fn log_mut(&mut self) -> &mut LogFile {
        &mut self.head
    }

    pub(crate) fn sync(&self) -> std::io::Result<()> {
        self.head.sync()
    }
}
