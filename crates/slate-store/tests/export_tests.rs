// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::panic)]
//! Combined export and remote mirroring.

mod common;

use std::sync::Arc;

use common::*;
use slate_remote::{MemoryObjectStore, ObjectLocator};
use slate_store::{
    ExportReader, RemoteMirror, SessionPaths, StoreConfig, StoreError, Whiteboard,
    WhiteboardOptions, EXPORT_VERSION,
};

#[test]
fn export_replays_pages_like_the_live_board() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "export");
    board.apply(add_scene("slide1.png", 2)).unwrap();
    board.apply(draw(0, 0, 1, 1)).unwrap();
    board.apply(clean(0, 0, 2)).unwrap();
    board.apply(draw(0, 0, 3, 2)).unwrap();
    board.apply(switch(0, 1, 4)).unwrap();
    board.apply(draw(0, 1, 5, 3)).unwrap();

    let path = board.export().unwrap();
    let reader = ExportReader::open(&path).unwrap();
    assert_eq!(reader.header().version, EXPORT_VERSION);
    assert_eq!(reader.header().scenes.len(), 1);
    assert_eq!(reader.header().keyframes.len(), 2);
    assert_eq!(
        reader.data().len() as u64,
        file_len(&SessionPaths::new(tmp.path(), "export").data)
    );

    for page in 0..2 {
        assert_eq!(reader.page_view(0, page).unwrap(), view(&board, 0, page));
    }
    assert!(matches!(
        reader.page_view(1, 0),
        Err(StoreError::InvalidScene { .. })
    ));
}

#[test]
fn export_on_close() {
    let tmp = tempfile::tempdir().unwrap();
    let options = WhiteboardOptions {
        config: StoreConfig {
            export_on_close: true,
            ..StoreConfig::default()
        },
        remote: None,
    };
    let board = Whiteboard::open(tmp.path(), "closing", options).unwrap();
    board.apply(add_scene("slide1.png", 1)).unwrap();
    board.apply(draw(0, 0, 250, 1)).unwrap();
    let summary = board.close().unwrap();

    let path = summary.export.unwrap();
    assert_eq!(path, SessionPaths::new(tmp.path(), "closing").export);
    let reader = ExportReader::open(&path).unwrap();
    assert!(reader.header().duration >= 250);
    assert_eq!(reader.page_view(0, 0).unwrap().commands(), stroke(1).as_slice());
}

#[test]
fn remote_mirror_round_trip() {
    let store = MemoryObjectStore::new();
    let prefix = ObjectLocator::parse("oss://lessons.example.com/boards/lesson-3").unwrap();
    let mirror = || RemoteMirror::new(Arc::new(store.clone()), prefix.clone());

    let first = tempfile::tempdir().unwrap();
    {
        let options = WhiteboardOptions {
            remote: Some(mirror()),
            ..WhiteboardOptions::default()
        };
        let board = Whiteboard::open(first.path(), "lesson-3", options).unwrap();
        board.apply(add_scene("slide1.png", 2)).unwrap();
        board.apply(draw(0, 0, 1, 1)).unwrap();
        assert_eq!(board.close().unwrap().pushed, 4);
    }
    assert!(store.get(&prefix.with_suffix(".head")).is_some());

    let second = tempfile::tempdir().unwrap();
    let options = WhiteboardOptions {
        remote: Some(mirror()),
        ..WhiteboardOptions::default()
    };
    let board = Whiteboard::open(second.path(), "lesson-3", options).unwrap();
    assert_eq!(board.scenes().unwrap().len(), 1);
    assert_eq!(view(&board, 0, 0).commands(), stroke(1).as_slice());
}

#[test]
fn remote_failure_fails_open_closed() {
    let root = tempfile::tempdir().unwrap();
    // A directory where the object should be makes the fetch fail with an
    // I/O error rather than "not found".
    std::fs::create_dir_all(root.path().join("lessons/boards/x.data")).unwrap();
    let store = slate_remote::FsObjectStore::new(root.path());
    let prefix = ObjectLocator::parse("oss://lessons.example.com/boards/x").unwrap();
    let options = WhiteboardOptions {
        remote: Some(RemoteMirror::new(Arc::new(store), prefix)),
        ..WhiteboardOptions::default()
    };
    let local = tempfile::tempdir().unwrap();
    let err = Whiteboard::open(local.path(), "x", options).err().unwrap();
    assert!(matches!(err, StoreError::Remote(_)));
}
