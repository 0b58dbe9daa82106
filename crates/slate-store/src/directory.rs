// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene/page directory backed by the scene and page logs.
//!
//! Scenes live in a `Vec` indexed by scene number; each owns a fixed-length
//! `Vec` of lazily materialised pages. A page owns at most one keyframe by
//! value, so replacing it drops the previous one.

use slate_record::{Header, KeyFrame, PageInfo, SceneInfo, UNASSIGNED_INDEX};
use slate_record_codec::{decode_page_info, decode_scene_info, encode_page_info, encode_scene_info};
use tracing::{debug, warn};

use crate::frame::LogFile;
use crate::StoreError;

/// Validated `(scene, page)` coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageRef {
    /// Scene index.
    pub scene: usize,
    /// Page index within the scene.
    pub page: usize,
}

impl PageRef {
    /// Build a reference without validation.
    pub const fn new(scene: usize, page: usize) -> Self {
        Self { scene, page }
    }

    /// Wire form of the scene index.
    pub fn scene_i32(self) -> i32 {
        i32::try_from(self.scene).unwrap_or(i32::MAX)
    }

    /// Wire form of the page index.
    pub fn page_i32(self) -> i32 {
        i32::try_from(self.page).unwrap_or(i32::MAX)
    }

    /// Default transform for this page.
    pub fn default_info(self) -> PageInfo {
        PageInfo::new(self.scene_i32(), self.page_i32())
    }
}

#[derive(Clone, Debug)]
struct Page {
    info: PageInfo,
    keyframe: Option<KeyFrame>,
}

#[derive(Clone, Debug)]
struct Scene {
    info: SceneInfo,
    pages: Vec<Option<Page>>,
}

/// In-memory scene map plus the two logs that persist it.
pub(crate) struct Directory {
    scenes: Vec<Scene>,
    scene_log: LogFile,
    page_log: LogFile,
}

impl Directory {
    /// Rebuild from the scene log, then apply the page log last-write-wins.
    pub(crate) fn open(
        scene_log: LogFile,
        page_log: LogFile,
        trim_torn_tails: bool,
    ) -> Result<Self, StoreError> {
        let mut dir = Self {
            scenes: Vec::new(),
            scene_log,
            page_log,
        };
        dir.replay_scenes(trim_torn_tails)?;
        dir.replay_pages(trim_torn_tails)?;
        Ok(dir)
    }

    fn replay_scenes(&mut self, trim: bool) -> Result<(), StoreError> {
        let (found, trusted) = read_log(&self.scene_log, "scene", decode_scene_info)?;
        self.scene_log.discard_tail(trusted, trim)?;
        for (offset, info) in found {
            let expected = self.scenes.len();
            let index_ok = info.index == UNASSIGNED_INDEX
                || usize::try_from(info.index).is_ok_and(|i| i == expected);
            let Some(page_count) = usize::try_from(info.page_count).ok().filter(|n| *n > 0) else {
                warn!(offset, page_count = info.page_count, "skipping scene record with bad page count");
                continue;
            };
            if !index_ok {
                warn!(offset, index = info.index, expected, "skipping out-of-order scene record");
                continue;
            }
            self.push_scene(info, page_count, expected);
        }
        Ok(())
    }

    fn replay_pages(&mut self, trim: bool) -> Result<(), StoreError> {
        let (found, trusted) = read_log(&self.page_log, "page", decode_page_info)?;
        self.page_log.discard_tail(trusted, trim)?;
        for (offset, info) in found {
            match self.resolve(info.scene, info.page) {
                Ok(at) => self.page_mut(at).info = info,
                Err(err) => warn!(offset, %err, "skipping page record"),
            }
        }
        Ok(())
    }

    fn push_scene(&mut self, mut info: SceneInfo, page_count: usize, index: usize) {
        info.index = i32::try_from(index).unwrap_or(i32::MAX);
        self.scenes.push(Scene {
            info,
            pages: vec![None; page_count],
        });
    }

    /// Number of scenes.
    pub(crate) fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Scene descriptors in index order.
    pub(crate) fn scenes(&self) -> impl Iterator<Item = &SceneInfo> {
        self.scenes.iter().map(|s| &s.info)
    }

    /// Validate wire coordinates against the directory.
    pub(crate) fn resolve(&self, scene: i32, page: i32) -> Result<PageRef, StoreError> {
        let count = self.scenes.len();
        let entry = usize::try_from(scene)
            .ok()
            .and_then(|i| self.scenes.get(i).map(|s| (i, s)));
        let Some((scene_idx, entry)) = entry else {
            return Err(StoreError::InvalidScene { scene, count });
        };
        let page_count = entry.pages.len();
        match usize::try_from(page).ok().filter(|p| *p < page_count) {
            Some(page_idx) => Ok(PageRef::new(scene_idx, page_idx)),
            None => Err(StoreError::InvalidPage {
                scene,
                page,
                page_count,
            }),
        }
    }

    /// Insert a new scene and persist it. Nothing is written when validation fails.
    pub(crate) fn add_scene(&mut self, info: &SceneInfo) -> Result<usize, StoreError> {
        let count = self.scenes.len();
        let page_count = usize::try_from(info.page_count)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(StoreError::InvalidPageCount(info.page_count))?;
        let index = if info.index == UNASSIGNED_INDEX {
            count
        } else {
            let index = usize::try_from(info.index).map_err(|_| StoreError::InvalidScene {
                scene: info.index,
                count,
            })?;
            if let Some(existing) = self.scenes.get(index) {
                return Err(if existing.info.same_resource(info) {
                    StoreError::DuplicateScene(index)
                } else {
                    StoreError::SceneOccupied(index)
                });
            }
            if index > count {
                return Err(StoreError::SceneIndexGap {
                    index: info.index,
                    count,
                });
            }
            index
        };

        let mut record = info.clone();
        record.index = i32::try_from(index).unwrap_or(i32::MAX);
        self.scene_log.append(&encode_scene_info(&record))?;
        self.push_scene(record, page_count, index);
        debug!(index, page_count, url = %info.resource_url, "scene added");
        Ok(index)
    }

    /// Transform for `at`; pages never touched report the default transform.
    pub(crate) fn page_info(&self, at: PageRef) -> PageInfo {
        self.page(at)
            .map_or_else(|| at.default_info(), |p| p.info)
    }

    /// Live keyframe for `at`, if any.
    pub(crate) fn keyframe(&self, at: PageRef) -> Option<KeyFrame> {
        self.page(at).and_then(|p| p.keyframe)
    }

    /// Install `keyframe` for `at`, returning the one it replaces.
    pub(crate) fn replace_keyframe(
        &mut self,
        at: PageRef,
        keyframe: Option<KeyFrame>,
    ) -> Option<KeyFrame> {
        std::mem::replace(&mut self.page_mut(at).keyframe, keyframe)
    }

    /// Apply and persist a transform update.
    pub(crate) fn set_page(&mut self, at: PageRef, info: &PageInfo) -> Result<(), StoreError> {
        let mut record = *info;
        record.scene = at.scene_i32();
        record.page = at.page_i32();
        self.page_log.append(&encode_page_info(&record))?;
        self.page_mut(at).info = record;
        Ok(())
    }

    /// Persist a page-switch index record (the target's current transform).
    /// Returns the page log length before the write, for rollback.
    pub(crate) fn record_switch(&mut self, at: PageRef) -> Result<u64, StoreError> {
        let mark = self.page_log.len();
        let info = self.page_info(at);
        self.page_log.append(&encode_page_info(&info))?;
        Ok(mark)
    }

    /// Undo a [`record_switch`](Self::record_switch).
    pub(crate) fn rollback_switch(&mut self, mark: u64) {
        if let Err(err) = self.page_log.truncate_to(mark) {
            warn!(path = %self.page_log.path().display(), %err, "failed to roll back page log");
        }
    }

    /// Page log length in bytes.
    pub(crate) fn page_log_len(&self) -> u64 {
        self.page_log.len()
    }

    /// Export header: every live keyframe, every materialised page, every scene.
    pub(crate) fn header(&self, version: u32, duration: i64) -> Header {
        let mut header = Header {
            version,
            duration,
            ..Header::default()
        };
        for scene in &self.scenes {
            header.scenes.push(scene.info.clone());
            for page in scene.pages.iter().flatten() {
                header.pages.push(page.info);
                header.keyframes.extend(page.keyframe);
            }
        }
        header
    }

    /// Flush both directory logs to stable storage.
    pub(crate) fn sync(&self) -> std::io::Result<()> {
        self.scene_log.sync()?;
        self.page_log.sync()
    }

    fn page(&self, at: PageRef) -> Option<&Page> {
        self.scenes.get(at.scene)?.pages.get(at.page)?.as_ref()
    }

    // `at` must come from `resolve`; an out-of-range reference is a defect.
    fn page_mut(&mut self, at: PageRef) -> &mut Page {
        let slot = &mut self.scenes[at.scene].pages[at.page];
        slot.get_or_insert_with(|| Page {
            info: at.default_info(),
            keyframe: None,
        })
    }
}

/// Every decodable record of `log`, stopping at the first that is not.
/// Decoded records plus the offset where trusted data ends.
pub(crate) fn read_log<T, E: std::fmt::Display>(
    log: &LogFile,
    what: &str,
    decode: impl Fn(&[u8]) -> Result<T, E>,
) -> Result<(Vec<(u64, T)>, u64), StoreError> {
    let mut out = Vec::new();
    let mut frames = log.frames_from(0)?;
    while let Some((offset, bytes)) = frames.next_frame()? {
        match decode(&bytes) {
            Ok(record) => out.push((offset, record)),
            Err(err) => {
                warn!(path = %log.path().display(), offset, %err, "{what} log tail unreadable; stopping replay");
                return Ok((out, offset));
            }
        }
    }
    Ok((out, frames.offset()))
}
