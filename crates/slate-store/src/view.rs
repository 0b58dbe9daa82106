// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Current-view cache and the reduction shared by live appends and scans.
//!
//! A view is the minimal package sequence needed to redraw one page. The
//! live cache for the current page and any view rebuilt from the data log
//! are produced by the same [`ViewCache::reduce`], so the two never drift.
//!
//! The view cap is an append-time guard: [`check_capacity`] refuses a package
//! that would grow a page's view past the limit before anything is written.
//! Scans never enforce it, so a view that is already over the cap (say, after
//! the limit was lowered) still loads.

use std::io::Read;

use slate_record::{Package, PackageType, PageInfo, Payload};
use slate_record_codec::{decode_package, encode_package};
use tracing::warn;

use crate::directory::PageRef;
use crate::frame::FrameReader;
use crate::StoreError;

/// Reduced package sequence for one page.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ViewCache {
    at: PageRef,
    packages: Vec<Package>,
    transform: PageInfo,
}

/// View length after reducing a package of `kind` into a view of `len`
/// packages. Mirrors [`ViewCache::reduce`].
pub(crate) fn reduced_len(len: usize, kind: PackageType) -> usize {
    match kind {
        PackageType::CleanDraw => 0,
        PackageType::KeyFrame => 1,
        PackageType::SwitchScenePage => len.max(1),
        other if other.is_logged() => len.saturating_add(1),
        _ => len,
    }
}

/// Fails if reducing a package of `kind` into a view of `len` packages would
/// grow it while it already holds `limit` or more.
pub(crate) fn check_capacity(
    len: usize,
    kind: PackageType,
    limit: Option<usize>,
) -> Result<(), StoreError> {
    match limit {
        Some(limit) if reduced_len(len, kind) > len && len >= limit => {
            Err(StoreError::ViewCapacity { limit })
        }
        _ => Ok(()),
    }
}

impl ViewCache {
    pub(crate) fn new(at: PageRef, transform: PageInfo) -> Self {
        Self {
            at,
            packages: Vec::new(),
            transform,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.packages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub(crate) fn set_transform(&mut self, transform: PageInfo) {
        self.transform = transform;
    }

    /// Fold one package into the view.
    pub(crate) fn reduce(&mut self, pkg: Package) {
        match pkg.kind {
            PackageType::CleanDraw => self.packages.clear(),
            PackageType::KeyFrame => {
                self.packages.clear();
                self.packages.push(pkg);
            }
            PackageType::SwitchScenePage => {
                if self.packages.is_empty() {
                    self.packages.push(pkg);
                }
            }
            kind if kind.is_logged() => self.packages.push(pkg),
            _ => {}
        }
    }

    /// Collapse the view into what a client needs to redraw the page.
    pub(crate) fn pack(&self) -> PageView {
        let Some(first) = self.packages.first() else {
            return PageView {
                package: Package::control(
                    PackageType::CleanDraw,
                    self.at.scene_i32(),
                    self.at.page_i32(),
                    0,
                ),
                keyframe: None,
                transform: self.transform,
            };
        };
        let commands = self
            .packages
            .iter()
            .flat_map(|p| p.commands().iter().copied())
            .collect();
        PageView {
            package: Package {
                kind: PackageType::DrawCommand,
                scene: first.scene,
                page: first.page,
                timestamp: first.timestamp,
                payload: Payload::Commands(commands),
            },
            keyframe: (first.kind == PackageType::KeyFrame).then(|| first.clone()),
            transform: self.transform,
        }
    }
}

/// Rebuild the view of `at` from data log frames.
///
/// Frames for other pages are skipped. An undecodable frame ends the scan,
/// as does the end of trusted data.
pub(crate) fn replay_page<R: Read>(
    frames: &mut FrameReader<R>,
    at: PageRef,
    transform: PageInfo,
) -> Result<ViewCache, StoreError> {
    let mut view = ViewCache::new(at, transform);
    let (scene, page) = (at.scene_i32(), at.page_i32());
    while let Some((offset, bytes)) = frames.next_frame()? {
        let pkg = match decode_package(&bytes) {
            Ok(pkg) => pkg,
            Err(err) => {
                warn!(offset, %err, "undecodable data record; treating as end of log");
                break;
            }
        };
        if pkg.scene != scene || pkg.page != page {
            continue;
        }
        view.reduce(pkg);
    }
    Ok(view)
}

/// Everything needed to redraw one page.
///
/// `package` is either an empty `CleanDraw` (nothing to draw) or a single
/// `DrawCommand` carrying every command since the page's replay point, in
/// arrival order. When the view starts at an explicit keyframe, that package
/// is returned separately in `keyframe`.
#[derive(Clone, Debug, PartialEq)]
pub struct PageView {
    /// Packed commands.
    pub package: Package,
    /// Keyframe package heading the view, if any.
    pub keyframe: Option<Package>,
    /// Current page transform.
    pub transform: PageInfo,
}

impl PageView {
    /// Returns `true` when there is nothing to draw.
    pub fn is_clean(&self) -> bool {
        self.package.kind == PackageType::CleanDraw
    }

    /// Commands to draw.
    pub fn commands(&self) -> &[slate_record::Command] {
        self.package.commands()
    }

    /// Encoded `(commands, keyframe)` packages.
    pub fn encode(&self) -> (Vec<u8>, Option<Vec<u8>>) {
        (
            encode_package(&self.package),
            self.keyframe.as_ref().map(encode_package),
        )
    }
}
