// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::panic)]
//! Whiteboard dispatch behaviour end to end, against real files.

mod common;

use common::*;
use slate_record::{PackageType, PageInfo};
use slate_store::{PageRef, Reply, SessionPaths, StoreError};

#[test]
fn lesson_scenario_packs_six_commands() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "lesson");

    let added = board.apply(add_scene("slide1.png", 3)).unwrap();
    assert_eq!(added, Reply::SceneAdded { index: 0 });
    assert_eq!(added.code(), 0);

    let switched = board.apply(switch(0, 1, 10)).unwrap();
    assert_eq!(switched.code(), 1);

    for (i, ts) in [(1, 20), (2, 30), (3, 40)] {
        assert_eq!(board.apply(draw(0, 1, ts, i)).unwrap().code(), 0);
    }

    let view = view(&board, 0, 1);
    assert_eq!(view.package.kind, PackageType::DrawCommand);
    assert_eq!((view.package.scene, view.package.page), (0, 1));
    let expected: Vec<_> = (1..=3).flat_map(stroke).collect();
    assert_eq!(view.commands(), expected.as_slice());
}

#[test]
fn draws_survive_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let board = open(tmp.path(), "reopen");
        board.apply(add_scene("deck.pdf", 2)).unwrap();
        for i in 0..5 {
            board.apply(draw(0, 0, i64::from(i) * 10, i)).unwrap();
        }
        board.close().unwrap();
    }
    let board = open(tmp.path(), "reopen");
    assert_eq!(board.current().unwrap(), PageRef::new(0, 0));
    assert!(board.elapsed_ms().unwrap() >= 40);
    let expected: Vec<_> = (0..5).flat_map(stroke).collect();
    assert_eq!(view(&board, 0, 0).commands(), expected.as_slice());
}

#[test]
fn second_keyframe_replaces_first() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "kf");
    board.apply(add_scene("slide1.png", 1)).unwrap();
    board.apply(keyframe(0, 0, 1)).unwrap();
    board.apply(draw(0, 0, 2, 1)).unwrap();
    let data_len = file_len(&SessionPaths::new(tmp.path(), "kf").data);
    board.apply(keyframe(0, 0, 3)).unwrap();

    let live = board.keyframe(0, 0).unwrap().unwrap();
    assert_eq!(live.offset, data_len);
    assert_eq!(live.timestamp, 3);
    assert_eq!(board.header().unwrap().keyframes, vec![live]);

    let view = view(&board, 0, 0);
    assert!(view.commands().is_empty());
    assert_eq!(view.keyframe.unwrap().timestamp, 3);
}

#[test]
fn clean_draw_empties_current_view() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "clean");
    board.apply(add_scene("slide1.png", 1)).unwrap();
    board.apply(draw(0, 0, 1, 1)).unwrap();
    board.apply(draw(0, 0, 2, 2)).unwrap();
    board.apply(clean(0, 0, 3)).unwrap();

    let view = view(&board, 0, 0);
    assert!(view.is_clean());
    assert_eq!(view.package.kind, PackageType::CleanDraw);
    assert!(view.commands().is_empty());
}

#[test]
fn switch_to_current_page_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "noop");
    let paths = SessionPaths::new(tmp.path(), "noop");
    board.apply(add_scene("slide1.png", 2)).unwrap();
    board.apply(switch(0, 1, 1)).unwrap();
    let page_len = file_len(&paths.page);
    let data_len = file_len(&paths.data);

    let reply = board.apply(switch(0, 1, 2)).unwrap();
    assert_eq!(reply, Reply::Unchanged);
    assert_eq!(reply.code(), 0);
    assert_eq!(file_len(&paths.page), page_len);
    assert_eq!(file_len(&paths.data), data_len);
}

#[test]
fn out_of_range_scene_rejected_for_every_type() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "bounds");
    let paths = SessionPaths::new(tmp.path(), "bounds");

    let err = board.apply(add_scene("empty.png", 0)).unwrap_err();
    assert!(matches!(err, StoreError::InvalidPageCount(0)));
    assert!(err.code() < 0);
    board.apply(add_scene("slide1.png", 2)).unwrap();

    let requests = [
        draw(1, 0, 1, 1),
        clean(1, 0, 1),
        keyframe(1, 0, 1),
        switch(1, 0, 1),
        query(1, 0),
        page_change(PageInfo::new(1, 0), 1),
    ];
    for pkg in requests {
        let kind = pkg.kind;
        let err = board.apply(pkg).unwrap_err();
        assert!(
            matches!(err, StoreError::InvalidScene { scene: 1, count: 1 }),
            "{kind:?} gave {err:?}"
        );
        assert!(err.code() < 0);
    }
    assert_eq!(file_len(&paths.data), 0);
    assert_eq!(file_len(&paths.head), 0);
    assert_eq!(file_len(&paths.page), 0);
}

#[test]
fn query_for_other_page_scans_without_switching() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "scan");
    board.apply(add_scene("slide1.png", 3)).unwrap();
    board.apply(draw(0, 2, 1, 7)).unwrap();
    board.apply(draw(0, 0, 2, 1)).unwrap();
    board.apply(draw(0, 2, 3, 8)).unwrap();

    let other = view(&board, 0, 2);
    let expected: Vec<_> = [7, 8].into_iter().flat_map(stroke).collect();
    assert_eq!(other.commands(), expected.as_slice());
    assert_eq!(board.current().unwrap(), PageRef::new(0, 0));
    assert_eq!(view(&board, -1, -1).commands(), stroke(1).as_slice());
}

#[test]
fn switch_to_empty_page_emits_keyframe_at_switch_record() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "switch");
    let paths = SessionPaths::new(tmp.path(), "switch");
    board.apply(add_scene("slide1.png", 2)).unwrap();
    board.apply(draw(0, 0, 1, 1)).unwrap();
    let data_len = file_len(&paths.data);

    board.apply(switch(0, 1, 5)).unwrap();
    let kf = board.keyframe(0, 1).unwrap().unwrap();
    assert_eq!((kf.offset, kf.timestamp), (data_len, 5));
    assert_eq!(
        board.apply(slate_record::Package::control(PackageType::SceneData, -1, -1, 6)).unwrap(),
        Reply::Current { scene: 0, page: 1 }
    );
    let placeholder = view(&board, 0, 1);
    assert_eq!(placeholder.package.kind, PackageType::DrawCommand);
    assert_eq!(placeholder.package.timestamp, 5);
    assert!(placeholder.commands().is_empty());
}

#[test]
fn page_transform_persists() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let board = open(tmp.path(), "xform");
        board.apply(add_scene("slide1.png", 2)).unwrap();
        let mut info = PageInfo::new(0, 1);
        info.scale = 1.5;
        info.move_y = -4.0;
        board.apply(page_change(info, 1)).unwrap();
        board.close().unwrap();
    }
    let board = open(tmp.path(), "xform");
    let info = board.page_info(0, 1).unwrap();
    assert!((info.scale - 1.5).abs() < f32::EPSILON);
    assert!((info.move_y + 4.0).abs() < f32::EPSILON);
    assert_eq!(board.page_info(0, 0).unwrap(), PageInfo::new(0, 0));
}

#[test]
fn encoded_packages_go_through_handle() {
    let tmp = tempfile::tempdir().unwrap();
    let board = open(tmp.path(), "wire");
    let bytes = slate_record_codec::encode_package(&add_scene("slide1.png", 1));
    assert_eq!(board.handle(&bytes).unwrap(), Reply::SceneAdded { index: 0 });
    assert!(matches!(
        board.handle(b"\xff\x00"),
        Err(StoreError::Decode(_))
    ));

    let bytes = slate_record_codec::encode_package(&query(0, 0));
    let Reply::View(view) = board.handle(&bytes).unwrap() else {
        panic!("query should return a view");
    };
    let (packed, kf) = view.encode();
    let decoded = slate_record_codec::decode_package(&packed).unwrap();
    assert_eq!(decoded.kind, PackageType::CleanDraw);
    assert!(kf.is_none());
}

#[test]
fn whiteboard_is_shareable_across_threads() {
    let tmp = tempfile::tempdir().unwrap();
    let board = std::sync::Arc::new(open(tmp.path(), "threads"));
    board.apply(add_scene("slide1.png", 1)).unwrap();

    let handles: Vec<_> = (0..4u16)
        .map(|t| {
            let board = std::sync::Arc::clone(&board);
            std::thread::spawn(move || {
                for i in 0..10u16 {
                    board.apply(draw(0, 0, i64::from(t * 10 + i), t * 10 + i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(view(&board, 0, 0).commands().len(), 80);
}

fn strokes(ids: &[u16]) -> Vec<slate_record::Command> {
    ids.iter().copied().flat_map(stroke).collect()
}

#[test]
fn view_cap_applies_to_pages_out_of_focus() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = SessionPaths::new(tmp.path(), "capped");
    {
        let board = open_capped(tmp.path(), "capped", 2);
        board.apply(add_scene("deck.pdf", 2)).unwrap();
        board.apply(draw(0, 1, 1, 1)).unwrap();
        board.apply(draw(0, 1, 2, 2)).unwrap();
        let before = file_len(&paths.data);
        assert!(matches!(
            board.apply(draw(0, 1, 3, 3)),
            Err(StoreError::ViewCapacity { limit: 2 })
        ));
        assert_eq!(file_len(&paths.data), before);

        assert_eq!(view(&board, 0, 1).commands(), strokes(&[1, 2]).as_slice());
        assert_eq!(board.apply(switch(0, 1, 4)).unwrap(), Reply::Switched);
        assert_eq!(view(&board, -1, -1).commands(), strokes(&[1, 2]).as_slice());
        assert!(matches!(
            board.apply(draw(0, 1, 5, 4)),
            Err(StoreError::ViewCapacity { limit: 2 })
        ));
        board.apply(draw(0, 0, 6, 5)).unwrap();
    }

    let board = open_capped(tmp.path(), "capped", 2);
    assert_eq!(board.current().unwrap(), PageRef::new(0, 0));
    assert_eq!(view(&board, 0, 1).commands(), strokes(&[1, 2]).as_slice());
    assert!(matches!(
        board.apply(draw(0, 1, 7, 6)),
        Err(StoreError::ViewCapacity { limit: 2 })
    ));
    board.apply(clean(0, 1, 8)).unwrap();
    board.apply(draw(0, 1, 9, 7)).unwrap();
    assert_eq!(view(&board, 0, 1).commands(), strokes(&[7]).as_slice());
}

#[test]
fn lowered_cap_still_opens_over_full_pages() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let board = open(tmp.path(), "lowered");
        board.apply(add_scene("slide1.png", 2)).unwrap();
        for id in 1..=3 {
            board.apply(draw(0, 0, i64::from(id), id)).unwrap();
            board.apply(draw(0, 1, i64::from(id), id + 10)).unwrap();
        }
    }

    let board = open_capped(tmp.path(), "lowered", 1);
    assert_eq!(board.current().unwrap(), PageRef::new(0, 1));
    assert_eq!(view(&board, -1, -1).commands(), strokes(&[11, 12, 13]).as_slice());
    assert_eq!(view(&board, 0, 0).commands(), strokes(&[1, 2, 3]).as_slice());
    assert_eq!(board.apply(switch(0, 0, 4)).unwrap(), Reply::Switched);
    assert!(matches!(
        board.apply(draw(0, 0, 5, 4)),
        Err(StoreError::ViewCapacity { limit: 1 })
    ));
    board.apply(clean(0, 0, 6)).unwrap();
    board.apply(draw(0, 0, 7, 5)).unwrap();
    assert_eq!(view(&board, -1, -1).commands(), strokes(&[5]).as_slice());
}
