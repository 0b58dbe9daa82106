// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The whiteboard session: single entry point that owns every log file, the
//! directory, and the current-view cache behind one mutex.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use slate_record::{Header, KeyFrame, Package, PackageType, PageInfo, SceneInfo};
use slate_record_codec::{decode_package, encode_package};
use tracing::{debug, info, warn};

use crate::directory::{Directory, PageRef};
use crate::export::{write_export, EXPORT_VERSION};
use crate::frame::LogFile;
use crate::keyframe::{KeyframeIndex, KeyframeReceipt};
use crate::paths::SessionPaths;
use crate::recovery::recover;
use crate::remote::RemoteMirror;
use crate::view::{check_capacity, reduced_len, replay_page, PageView, ViewCache};
use crate::{StoreConfig, StoreError};

/// Options for [`Whiteboard::open`].
#[derive(Default)]
pub struct WhiteboardOptions {
    /// Engine tunables.
    pub config: StoreConfig,
    /// Pull before open and push on close.
    pub remote: Option<RemoteMirror>,
}

/// Successful outcome of one dispatched package.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Logged (draws, clears, keyframes) or applied (page transforms).
    Accepted,
    /// Focus moved to another page.
    Switched,
    /// Switch to the page already in focus; nothing written.
    Unchanged,
    /// Scene created at `index`.
    SceneAdded {
        /// Assigned scene index.
        index: usize,
    },
    /// Page currently in focus.
    Current {
        /// Scene index.
        scene: usize,
        /// Page index.
        page: usize,
    },
    /// Redraw data for the queried page.
    View(PageView),
}

impl Reply {
    /// Integer result code: 1 for a switch, 0 for everything else.
    pub fn code(&self) -> i32 {
        match self {
            Self::Switched => 1,
            _ => 0,
        }
    }
}

/// What [`Whiteboard::close`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseSummary {
    /// Final data log length in bytes.
    pub data_len: u64,
    /// Session duration in milliseconds.
    pub duration_ms: i64,
    /// Export written on close, if configured.
    pub export: Option<PathBuf>,
    /// Number of files pushed to the remote mirror.
    pub pushed: usize,
}

struct Engine {
    paths: SessionPaths,
    config: StoreConfig,
    directory: Directory,
    keyframes: KeyframeIndex,
    data: LogFile,
    current: PageRef,
    view: ViewCache,
    // View lengths of pages out of focus, counted on first append.
    view_lens: BTreeMap<PageRef, usize>,
    last_timestamp: i64,
    resumed_at_ms: i64,
    started: Instant,
    remote: Option<RemoteMirror>,
}

/// One open whiteboard.
///
/// Every operation locks the session for its whole duration; callers on the
/// same whiteboard are fully serialised. Separate whiteboards share nothing.
pub struct Whiteboard {
    inner: Mutex<Engine>,
}

impl Whiteboard {
    /// Open (or create) the whiteboard `name` under `dir`, recovering any
    /// existing state.
    ///
    /// With a remote mirror configured, the four logs are pulled first;
    /// objects that were never uploaded mean "start empty", any other remote
    /// failure aborts the open.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        options: WhiteboardOptions,
    ) -> Result<Self, StoreError> {
        let WhiteboardOptions { config, remote } = options;
        let paths = SessionPaths::new(dir.as_ref(), name);
        if let Some(mirror) = &remote {
            mirror.pull(&paths)?;
        }

        let open_log = |path: &Path| {
            LogFile::open(path, config.max_record_len, config.sync_writes)
        };
        let mut data = open_log(&paths.data)?;
        let mut keyframes = KeyframeIndex::new(open_log(&paths.head)?);
        let mut directory = Directory::open(
            open_log(&paths.scene)?,
            open_log(&paths.page)?,
            config.trim_torn_tails,
        )?;
        let recovered = recover(&mut directory, &mut keyframes, &mut data, &config)?;

        info!(name, dir = %dir.as_ref().display(), data_len = data.len(), "whiteboard open");
        Ok(Self {
            inner: Mutex::new(Engine {
                paths,
                directory,
                keyframes,
                data,
                current: recovered.current,
                view: recovered.view,
                view_lens: BTreeMap::new(),
                last_timestamp: recovered.last_timestamp,
                resumed_at_ms: recovered.last_timestamp,
                started: Instant::now(),
                remote,
                config,
            }),
        })
    }

    /// Decode and dispatch one encoded package.
    pub fn handle(&self, bytes: &[u8]) -> Result<Reply, StoreError> {
        let pkg = decode_package(bytes)?;
        self.apply(pkg)
    }

    /// Dispatch one package.
    pub fn apply(&self, pkg: Package) -> Result<Reply, StoreError> {
        let mut engine = self.lock()?;
        debug!(kind = ?pkg.kind, scene = pkg.scene, page = pkg.page, ts = pkg.timestamp, "dispatch");
        let result = engine.dispatch(pkg);
        if let Err(err) = &result {
            debug!(code = err.code(), %err, "package rejected");
        }
        result
    }

    /// Page in focus.
    pub fn current(&self) -> Result<PageRef, StoreError> {
        Ok(self.lock()?.current)
    }

    /// Milliseconds since the session started, counting time before a reopen.
    pub fn elapsed_ms(&self) -> Result<i64, StoreError> {
        Ok(self.lock()?.elapsed_ms())
    }

    /// Scene descriptors in index order.
    pub fn scenes(&self) -> Result<Vec<SceneInfo>, StoreError> {
        Ok(self.lock()?.directory.scenes().cloned().collect())
    }

    /// Live keyframe of a page.
    pub fn keyframe(&self, scene: i32, page: i32) -> Result<Option<KeyFrame>, StoreError> {
        let engine = self.lock()?;
        let at = engine.directory.resolve(scene, page)?;
        Ok(engine.directory.keyframe(at))
    }

    /// Transform of a page.
    pub fn page_info(&self, scene: i32, page: i32) -> Result<PageInfo, StoreError> {
        let engine = self.lock()?;
        let at = engine.directory.resolve(scene, page)?;
        Ok(engine.directory.page_info(at))
    }

    /// Export header describing the current state.
    pub fn header(&self) -> Result<Header, StoreError> {
        Ok(self.lock()?.header())
    }

    /// Write `<name>.board` now; returns its path.
    pub fn export(&self) -> Result<PathBuf, StoreError> {
        let engine = self.lock()?;
        engine.export()
    }

    /// Flush, optionally export, push to the remote mirror, and close.
    pub fn close(self) -> Result<CloseSummary, StoreError> {
        let engine = self.inner.into_inner().map_err(|_| StoreError::Poisoned)?;
        engine.data.sync()?;
        engine.keyframes.sync()?;
        engine.directory.sync()?;

        let export = if engine.config.export_on_close {
            Some(engine.export()?)
        } else {
            None
        };
        let pushed = match &engine.remote {
            Some(mirror) => mirror.push(&engine.paths)?,
            None => 0,
        };
        let summary = CloseSummary {
            data_len: engine.data.len(),
            duration_ms: engine.elapsed_ms(),
            export,
            pushed,
        };
        info!(
            data_len = summary.data_len,
            duration_ms = summary.duration_ms,
            pushed,
            "whiteboard closed"
        );
        Ok(summary)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Engine>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Engine {
    fn dispatch(&mut self, pkg: Package) -> Result<Reply, StoreError> {
        match pkg.kind {
            PackageType::AddScene => {
                let info = pkg.scene_info().ok_or(StoreError::MissingSceneInfo)?;
                let index = self.directory.add_scene(info)?;
                Ok(Reply::SceneAdded { index })
            }
            PackageType::SceneData => {
                if self.directory.scene_count() == 0 {
                    return Err(StoreError::InvalidScene {
                        scene: self.current.scene_i32(),
                        count: 0,
                    });
                }
                Ok(Reply::Current {
                    scene: self.current.scene,
                    page: self.current.page,
                })
            }
            PackageType::ScenePageData => {
                let scene = if pkg.scene < 0 {
                    self.current.scene_i32()
                } else {
                    pkg.scene
                };
                let page = if pkg.page < 0 {
                    self.current.page_i32()
                } else {
                    pkg.page
                };
                let at = self.directory.resolve(scene, page)?;
                let view = if at == self.current {
                    self.view.pack()
                } else {
                    self.scan(at)?.pack()
                };
                Ok(Reply::View(view))
            }
            PackageType::PageChange => {
                let info = *pkg
                    .page_info()
                    .ok_or(StoreError::MissingPageInfo(pkg.kind))?;
                let at = self.directory.resolve(info.scene, info.page)?;
                self.directory.set_page(at, &info)?;
                if at == self.current {
                    self.view.set_transform(self.directory.page_info(at));
                }
                Ok(Reply::Accepted)
            }
            PackageType::SwitchScenePage => self.switch(pkg),
            PackageType::DrawCommand | PackageType::CleanDraw | PackageType::KeyFrame => {
                self.append(pkg)
            }
        }
    }

    /// Generic mutating path: validate, keyframe if needed, append, reduce.
    fn append(&mut self, pkg: Package) -> Result<Reply, StoreError> {
        let at = self.directory.resolve(pkg.scene, pkg.page)?;
        let is_current = at == self.current;
        let len = self.view_len(at)?;
        check_capacity(len, pkg.kind, self.config.max_view_packages)?;
        let bytes = self.encode_checked(&pkg)?;

        let receipt = if KeyframeIndex::required(pkg.kind, &self.directory, at) {
            Some(self.keyframes.on_receive_keyframe(
                &mut self.directory,
                at,
                self.data.len(),
                pkg.timestamp,
            )?)
        } else {
            None
        };
        self.append_data(&bytes, receipt)?;

        self.last_timestamp = pkg.timestamp;
        if is_current {
            self.view.reduce(pkg);
        } else {
            self.view_lens.insert(at, reduced_len(len, pkg.kind));
        }
        Ok(Reply::Accepted)
    }

    fn switch(&mut self, pkg: Package) -> Result<Reply, StoreError> {
        let at = self.directory.resolve(pkg.scene, pkg.page)?;
        if at == self.current {
            return Ok(Reply::Unchanged);
        }
        let mut view = self.scan(at)?;
        check_capacity(view.len(), pkg.kind, self.config.max_view_packages)?;
        let bytes = self.encode_checked(&pkg)?;

        let page_mark = self.directory.record_switch(at)?;
        let receipt = if view.is_empty() {
            match self.keyframes.on_receive_keyframe(
                &mut self.directory,
                at,
                self.data.len(),
                pkg.timestamp,
            ) {
                Ok(receipt) => Some(receipt),
                Err(err) => {
                    self.directory.rollback_switch(page_mark);
                    return Err(err);
                }
            }
        } else {
            None
        };
        if let Err(err) = self.append_data(&bytes, receipt) {
            self.directory.rollback_switch(page_mark);
            return Err(err);
        }

        self.last_timestamp = pkg.timestamp;
        view.reduce(pkg);
        debug!(
            from_scene = self.current.scene,
            from_page = self.current.page,
            to_scene = at.scene,
            to_page = at.page,
            page_log = self.directory.page_log_len(),
            "switched"
        );
        let previous = std::mem::replace(&mut self.current, at);
        self.view_lens.remove(&at);
        self.view_lens.insert(previous, self.view.len());
        self.view = view;
        Ok(Reply::Switched)
    }

    fn encode_checked(&self, pkg: &Package) -> Result<Vec<u8>, StoreError> {
        let bytes = encode_package(pkg);
        let limit = self.config.max_record_len;
        if bytes.len() as u64 > limit {
            return Err(StoreError::RecordTooLarge {
                len: bytes.len(),
                limit,
            });
        }
        Ok(bytes)
    }

    fn append_data(
        &mut self,
        bytes: &[u8],
        receipt: Option<KeyframeReceipt>,
    ) -> Result<u64, StoreError> {
        let result = self.data.append(bytes);
        if let Err(err) = &result {
            warn!(%err, "data append failed");
            if let Some(receipt) = receipt {
                self.keyframes.rollback(&mut self.directory, receipt);
            }
        }
        result
    }

    /// Rebuild the view of `at` from its keyframe onwards.
    fn scan(&self, at: PageRef) -> Result<ViewCache, StoreError> {
        let offset = self.directory.keyframe(at).map_or(0, |kf| kf.offset);
        let view = replay_page(
            &mut self.data.frames_from(offset)?,
            at,
            self.directory.page_info(at),
        )?;
        if let Some(limit) = self.config.max_view_packages.filter(|l| view.len() > *l) {
            warn!(scene = at.scene, page = at.page, len = view.len(), limit, "page view over cap");
        }
        Ok(view)
    }

    /// Packages in the view of `at`, counting by scan on first use.
    fn view_len(&mut self, at: PageRef) -> Result<usize, StoreError> {
        if at == self.current {
            return Ok(self.view.len());
        }
        if let Some(len) = self.view_lens.get(&at) {
            return Ok(*len);
        }
        let len = self.scan(at)?.len();
        self.view_lens.insert(at, len);
        Ok(len)
    }

    fn elapsed_ms(&self) -> i64 {
        let since_open = i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.resumed_at_ms
            .saturating_add(since_open)
            .max(self.last_timestamp)
    }

    fn header(&self) -> Header {
        self.directory.header(EXPORT_VERSION, self.elapsed_ms())
    }

    fn export(&self) -> Result<PathBuf, StoreError> {
        write_export(&self.paths.export, &self.header(), &self.data)?;
        Ok(self.paths.export.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use slate_record::{Command, CommandKind, SceneKind};

    fn board(dir: &Path) -> Whiteboard {
        Whiteboard::open(dir, "unit", WhiteboardOptions::default()).unwrap()
    }

    fn add_scene(wb: &Whiteboard, pages: i32) {
        let mut pkg = Package::control(PackageType::AddScene, -1, -1, 0);
        pkg.payload = slate_record::Payload::Scene(SceneInfo::new(SceneKind::Image, "s.png", pages));
        wb.apply(pkg).unwrap();
    }

    fn dot(scene: i32, page: i32, ts: i64) -> Package {
        Package::draw(scene, page, ts, vec![Command::pen(CommandKind::BeginDraw, 1.0, 2.0)])
    }

    #[test]
    fn first_draw_creates_implicit_keyframe() {
        let tmp = tempfile::tempdir().unwrap();
        let wb = board(tmp.path());
        add_scene(&wb, 2);
        wb.apply(dot(0, 1, 5)).unwrap();
        let kf = wb.keyframe(0, 1).unwrap().unwrap();
        assert_eq!((kf.offset, kf.timestamp), (0, 5));

        wb.apply(dot(0, 1, 6)).unwrap();
        assert_eq!(wb.keyframe(0, 1).unwrap().unwrap().offset, 0);
    }

    #[test]
    fn rejected_requests_write_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let wb = board(tmp.path());
        assert!(matches!(
            wb.apply(dot(0, 0, 1)),
            Err(StoreError::InvalidScene { count: 0, .. })
        ));
        assert!(matches!(
            wb.apply(Package::control(PackageType::SceneData, -1, -1, 0)),
            Err(StoreError::InvalidScene { .. })
        ));
        add_scene(&wb, 1);
        assert!(matches!(
            wb.apply(dot(0, 1, 1)),
            Err(StoreError::InvalidPage { .. })
        ));
        assert!(matches!(
            wb.apply(Package::control(PackageType::PageChange, 0, 0, 1)),
            Err(StoreError::MissingPageInfo(PackageType::PageChange))
        ));
        assert!(matches!(
            wb.apply(Package::control(PackageType::AddScene, 0, 0, 1)),
            Err(StoreError::MissingSceneInfo)
        ));
        let data = std::fs::metadata(tmp.path().join("unit.data")).unwrap().len();
        assert_eq!(data, 0);
    }

    #[test]
    fn view_capacity_rejects_before_write() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            max_view_packages: Some(2),
            ..StoreConfig::default()
        };
        let wb = Whiteboard::open(
            tmp.path(),
            "cap",
            WhiteboardOptions {
                config,
                remote: None,
            },
        )
        .unwrap();
        add_scene(&wb, 1);
        wb.apply(dot(0, 0, 1)).unwrap();
        wb.apply(dot(0, 0, 2)).unwrap();
        let before = std::fs::metadata(tmp.path().join("cap.data")).unwrap().len();
        assert!(matches!(
            wb.apply(dot(0, 0, 3)),
            Err(StoreError::ViewCapacity { limit: 2 })
        ));
        assert_eq!(std::fs::metadata(tmp.path().join("cap.data")).unwrap().len(), before);
        wb.apply(Package::control(PackageType::CleanDraw, 0, 0, 4)).unwrap();
        wb.apply(dot(0, 0, 5)).unwrap();
    }

    #[test]
    fn page_change_updates_current_transform() {
        let tmp = tempfile::tempdir().unwrap();
        let wb = board(tmp.path());
        add_scene(&wb, 1);
        let mut info = PageInfo::new(0, 0);
        info.move_x = 12.5;
        let mut pkg = Package::control(PackageType::PageChange, 0, 0, 3);
        pkg.payload = slate_record::Payload::Page(info);
        assert_eq!(wb.apply(pkg).unwrap(), Reply::Accepted);

        let Reply::View(view) = wb
            .apply(Package::control(PackageType::ScenePageData, -1, -1, 4))
            .unwrap()
        else {
            panic!("query should return a view");
        };
        assert!((view.transform.move_x - 12.5).abs() < f32::EPSILON);
        assert!(view.is_clean());
    }

    #[test]
    fn reply_codes() {
        assert_eq!(Reply::Switched.code(), 1);
        assert_eq!(Reply::Unchanged.code(), 0);
        assert_eq!(Reply::SceneAdded { index: 3 }.code(), 0);
    }
}
