// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use std::path::Path;

use slate_record::{Command, CommandKind, Package, PackageType, PageInfo, Payload, SceneInfo, SceneKind};
use slate_store::{PageView, Reply, StoreConfig, Whiteboard, WhiteboardOptions};

pub fn open(dir: &Path, name: &str) -> Whiteboard {
    Whiteboard::open(dir, name, WhiteboardOptions::default()).unwrap()
}

/// Open with `max_view_packages` set to `cap`.
pub fn open_capped(dir: &Path, name: &str, cap: usize) -> Whiteboard {
    let options = WhiteboardOptions {
        config: StoreConfig {
            max_view_packages: Some(cap),
            ..StoreConfig::default()
        },
        remote: None,
    };
    Whiteboard::open(dir, name, options).unwrap()
}

pub fn add_scene(url: &str, pages: i32) -> Package {
    let mut pkg = Package::control(PackageType::AddScene, -1, -1, 0);
    pkg.payload = Payload::Scene(SceneInfo::new(SceneKind::Image, url, pages));
    pkg
}

pub fn switch(scene: i32, page: i32, ts: i64) -> Package {
    Package::control(PackageType::SwitchScenePage, scene, page, ts)
}

pub fn query(scene: i32, page: i32) -> Package {
    Package::control(PackageType::ScenePageData, scene, page, 0)
}

pub fn clean(scene: i32, page: i32, ts: i64) -> Package {
    Package::control(PackageType::CleanDraw, scene, page, ts)
}

pub fn keyframe(scene: i32, page: i32, ts: i64) -> Package {
    Package::control(PackageType::KeyFrame, scene, page, ts)
}

pub fn page_change(info: PageInfo, ts: i64) -> Package {
    let mut pkg = Package::control(PackageType::PageChange, info.scene, info.page, ts);
    pkg.payload = Payload::Page(info);
    pkg
}

/// Two-sample stroke whose x coordinate identifies it.
pub fn stroke(id: u16) -> Vec<Command> {
    let x = f32::from(id);
    vec![
        Command::pen(CommandKind::BeginDraw, x, 0.0),
        Command::pen(CommandKind::EndDraw, x, 1.0),
    ]
}

pub fn draw(scene: i32, page: i32, ts: i64, id: u16) -> Package {
    Package::draw(scene, page, ts, stroke(id))
}

pub fn view(board: &Whiteboard, scene: i32, page: i32) -> PageView {
    match board.apply(query(scene, page)).unwrap() {
        Reply::View(view) => view,
        other => panic!("expected a view, got {other:?}"),
    }
}

pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map_or(0, |m| m.len())
}
