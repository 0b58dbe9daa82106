// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Open-time bootstrap from the index logs.
//!
//! The directory has already replayed the scene and page logs. Here the
//! header log is replayed against the data log, which is authoritative for
//! which page each keyframe belongs to, and the tail of the data log after the
//! last keyframe locates the current page and the session clock.

use slate_record::KeyFrame;
use slate_record_codec::{decode_keyframe, decode_package};
use tracing::{info, warn};

use crate::directory::{read_log, Directory, PageRef};
use crate::frame::LogFile;
use crate::keyframe::KeyframeIndex;
use crate::view::{replay_page, ViewCache};
use crate::{StoreConfig, StoreError};

/// Result of bootstrapping a whiteboard.
#[derive(Debug)]
pub(crate) struct Recovered {
    pub(crate) current: PageRef,
    pub(crate) last_timestamp: i64,
    pub(crate) view: ViewCache,
}

pub(crate) fn recover(
    dir: &mut Directory,
    keyframes: &mut KeyframeIndex,
    data: &mut LogFile,
    config: &StoreConfig,
) -> Result<Recovered, StoreError> {
    let (installed, skipped, last) =
        install_keyframes(dir, keyframes, data, config.trim_torn_tails)?;

    let (current, last_timestamp, trusted) = locate_current(dir, data, last)?;
    data.discard_tail(trusted, config.trim_torn_tails)?;

    let offset = dir.keyframe(current).map_or(0, |kf| kf.offset);
    let view = replay_page(
        &mut data.frames_from(offset)?,
        current,
        dir.page_info(current),
    )?;
    if let Some(limit) = config.max_view_packages.filter(|l| view.len() > *l) {
        warn!(len = view.len(), limit, "recovered page view is over cap");
    }

    info!(
        scenes = dir.scene_count(),
        keyframes = installed,
        skipped,
        scene = current.scene,
        page = current.page,
        last_timestamp,
        view_len = view.len(),
        "whiteboard recovered"
    );
    Ok(Recovered {
        current,
        last_timestamp,
        view,
    })
}

type LastKeyframe = Option<(PageRef, KeyFrame)>;

fn install_keyframes(
    dir: &mut Directory,
    keyframes: &mut KeyframeIndex,
    data: &LogFile,
    trim: bool,
) -> Result<(usize, usize, LastKeyframe), StoreError> {
    let (records, trusted) = read_log(keyframes.log(), "header", decode_keyframe)?;
    keyframes.log_mut().discard_tail(trusted, trim)?;

    let (mut installed, mut skipped) = (0, 0);
    let mut last = None;
    for (_, hint) in records {
        match owner_of(dir, data, hint.offset)? {
            Some(at) => {
                let keyframe = KeyFrame {
                    scene: at.scene_i32(),
                    page: at.page_i32(),
                    ..hint
                };
                dir.replace_keyframe(at, Some(keyframe));
                last = Some((at, keyframe));
                installed += 1;
            }
            None => {
                warn!(
                    offset = hint.offset,
                    scene = hint.scene,
                    page = hint.page,
                    "skipping keyframe with no valid data record"
                );
                skipped += 1;
            }
        }
    }
    Ok((installed, skipped, last))
}

/// Page owning the data record at `offset`, if that record is readable and valid.
fn owner_of(dir: &Directory, data: &LogFile, offset: u64) -> Result<Option<PageRef>, StoreError> {
    if offset >= data.len() {
        return Ok(None);
    }
    let Some((_, bytes)) = data.frames_from(offset)?.next_frame()? else {
        return Ok(None);
    };
    let Ok(pkg) = decode_package(&bytes) else {
        return Ok(None);
    };
    Ok(dir.resolve(pkg.scene, pkg.page).ok())
}

/// Current page, session clock, and the end of trusted data-log bytes.
///
/// Scans from the last keyframe (or the start of the log when none
/// survived); the last readable package names the page in focus.
fn locate_current(
    dir: &Directory,
    data: &LogFile,
    last_keyframe: LastKeyframe,
) -> Result<(PageRef, i64, u64), StoreError> {
    let (at, start, fallback_ts) =
        last_keyframe.map_or((PageRef::default(), 0, 0), |(at, kf)| (at, kf.offset, kf.timestamp));
    let mut frames = data.frames_from(start)?;
    let mut last = None;
    let mut trusted = None;
    while let Some((offset, bytes)) = frames.next_frame()? {
        match decode_package(&bytes) {
            Ok(pkg) => last = Some(pkg),
            Err(err) => {
                warn!(offset, %err, "data log tail unreadable; stopping scan");
                trusted = Some(offset);
                break;
            }
        }
    }
    let trusted = trusted.unwrap_or_else(|| frames.offset());
    Ok(match last {
        Some(pkg) => match dir.resolve(pkg.scene, pkg.page) {
            Ok(current) => (current, pkg.timestamp, trusted),
            Err(_) => (at, pkg.timestamp, trusted),
        },
        None => (at, fallback_ts, trusted),
    })
}
