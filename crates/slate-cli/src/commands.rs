// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subcommand implementations.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use comfy_table::Table;
use serde_json::json;
use slate_app_core::prefs::BoardPrefs;
use slate_record::{Package, PackageType};
use slate_remote::{FsObjectStore, ObjectLocator};
use slate_store::frame::FrameReader;
use slate_store::{ExportReader, RemoteMirror, Reply, SessionPaths, Whiteboard, WhiteboardOptions};
use tracing::{info, warn};

fn options(prefs: &BoardPrefs) -> Result<WhiteboardOptions> {
    let mut options = prefs.local_options();
    if let (Some(root), Some(prefix)) = (&prefs.remote_root, &prefs.remote_prefix) {
        let prefix = ObjectLocator::parse(prefix).context("parse remote_prefix")?;
        options.remote = Some(RemoteMirror::new(
            Arc::new(FsObjectStore::new(root)),
            prefix,
        ));
    }
    Ok(options)
}

/// Open an existing board; a missing data log is an error, not a new board.
fn open_existing(prefs: &BoardPrefs, name: &str) -> Result<Whiteboard> {
    let options = options(prefs)?;
    let paths = SessionPaths::new(&prefs.data_dir, name);
    if options.remote.is_none() && !paths.data.exists() {
        bail!("no whiteboard named {name:?} in {}", prefs.data_dir.display());
    }
    Whiteboard::open(&prefs.data_dir, name, options)
        .with_context(|| format!("open whiteboard {name:?}"))
}

pub fn inspect(prefs: &BoardPrefs, name: &str) -> Result<()> {
    let board = open_existing(prefs, name)?;
    let current = board.current()?;
    let header = board.header()?;

    let mut scenes = Table::new();
    scenes.set_header(vec!["scene", "kind", "resource", "pages"]);
    for scene in &header.scenes {
        scenes.add_row(vec![
            scene.index.to_string(),
            format!("{:?}", scene.kind),
            scene.resource_url.clone(),
            scene.page_count.to_string(),
        ]);
    }

    let mut pages = Table::new();
    pages.set_header(vec!["scene", "page", "keyframe offset", "keyframe ts", "scale", "angle"]);
    for page in &header.pages {
        let keyframe = header
            .keyframes
            .iter()
            .find(|kf| kf.scene == page.scene && kf.page == page.page);
        pages.add_row(vec![
            page.scene.to_string(),
            page.page.to_string(),
            keyframe.map_or_else(|| "-".into(), |kf| kf.offset.to_string()),
            keyframe.map_or_else(|| "-".into(), |kf| kf.timestamp.to_string()),
            page.scale.to_string(),
            page.angle.to_string(),
        ]);
    }

    println!("whiteboard {name}: current scene {} page {}, {} ms", current.scene, current.page, header.duration);
    println!("{scenes}");
    println!("{pages}");
    board.close()?;
    Ok(())
}

pub fn view(prefs: &BoardPrefs, name: &str, scene: i32, page: i32) -> Result<()> {
    let board = open_existing(prefs, name)?;
    let query = Package::control(PackageType::ScenePageData, scene, page, 0);
    let Reply::View(view) = board.apply(query)? else {
        bail!("page query returned no view");
    };
    let out = json!({
        "scene": view.package.scene,
        "page": view.package.page,
        "kind": format!("{:?}", view.package.kind),
        "timestamp": view.package.timestamp,
        "commands": view.commands().len(),
        "keyframe_ts": view.keyframe.as_ref().map(|kf| kf.timestamp),
        "transform": {
            "angle": view.transform.angle,
            "scale": view.transform.scale,
            "move_x": view.transform.move_x,
            "move_y": view.transform.move_y,
        },
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    board.close()?;
    Ok(())
}

pub fn export(prefs: &BoardPrefs, name: &str) -> Result<()> {
    let board = open_existing(prefs, name)?;
    let path = board.export()?;
    board.close()?;

    let reader = ExportReader::open(&path).context("re-read export")?;
    let header = reader.header();
    println!(
        "{}: {} scenes, {} pages, {} keyframes, {} data bytes",
        path.display(),
        header.scenes.len(),
        header.pages.len(),
        header.keyframes.len(),
        reader.data().len()
    );
    Ok(())
}

pub fn ingest(prefs: &BoardPrefs, name: &str, file: &Path) -> Result<()> {
    std::fs::create_dir_all(&prefs.data_dir)?;
    let board = Whiteboard::open(&prefs.data_dir, name, options(prefs)?)
        .with_context(|| format!("open whiteboard {name:?}"))?;
    let input = File::open(file).with_context(|| format!("open {}", file.display()))?;
    let mut frames = FrameReader::new(BufReader::new(input), 0, prefs.store.max_record_len);

    let (mut accepted, mut rejected) = (0u64, 0u64);
    while let Some((offset, bytes)) = frames.next_frame()? {
        match board.handle(&bytes) {
            Ok(_) => accepted += 1,
            Err(err) if err.is_rejection() => {
                warn!(offset, code = err.code(), %err, "package rejected");
                rejected += 1;
            }
            Err(err) => return Err(err).context(format!("package at offset {offset}")),
        }
    }
    let summary = board.close()?;
    info!(accepted, rejected, data_len = summary.data_len, "ingest complete");
    println!("accepted {accepted}, rejected {rejected}");
    Ok(())
}
