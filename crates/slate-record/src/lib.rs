// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record types for the Slate whiteboard engine.
//!
//! This crate defines the typed events and directory records that the
//! storage engine logs and replays. It contains NO serialization logic—that
//! lives in slate-record-codec.
//!
//! # Coordinates
//!
//! Scene and page indices travel as `i32`. A negative value means
//! "unspecified": a scene descriptor with a negative index asks for the next
//! free index, and a page query with negative coordinates targets whatever
//! page is currently in focus.

mod command;
mod directory;
mod package;

pub use command::{Command, CommandKind, MAX_COMMANDS};
pub use directory::{Header, KeyFrame, PageInfo, SceneInfo, SceneKind, UNASSIGNED_INDEX};
pub use package::{Package, PackageType, Payload};
