// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Slate whiteboard storage and replay engine.
//!
//! A whiteboard is four append-only logs of length-prefixed records:
//!
//! - `<name>.data`: every logged package, in arrival order.
//! - `<name>.head`: keyframes, each pointing at a data log offset from which
//!   one page can be rebuilt without earlier records.
//! - `<name>.scene`: scene descriptors, written once per scene.
//! - `<name>.page`: page transforms and page-switch records.
//!
//! [`Whiteboard`] owns all four behind one mutex. It validates every package
//! before writing anything, keeps a reduced view of the page in focus so
//! redraw queries never rescan the log, and on open rebuilds its state from
//! the index logs plus the data log tail after the last keyframe.
//!
//! # Example
//!
//! ```no_run
//! use slate_record::{Command, CommandKind, Package, PackageType, Payload, SceneInfo, SceneKind};
//! use slate_store::{Reply, Whiteboard, WhiteboardOptions};
//!
//! # fn main() -> Result<(), slate_store::StoreError> {
//! let board = Whiteboard::open("/var/lib/slate", "lesson-12", WhiteboardOptions::default())?;
//!
//! let mut add = Package::control(PackageType::AddScene, -1, -1, 0);
//! add.payload = Payload::Scene(SceneInfo::new(SceneKind::Image, "slide1.png", 3));
//! board.apply(add)?;
//!
//! let stroke = vec![Command::pen(CommandKind::BeginDraw, 10.0, 10.0)];
//! board.apply(Package::draw(0, 0, 120, stroke))?;
//!
//! if let Reply::View(view) = board.apply(Package::control(PackageType::ScenePageData, -1, -1, 130))? {
//!     assert_eq!(view.commands().len(), 1);
//! }
//! board.close()?;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod config;
mod directory;
mod error;
mod export;
pub mod frame;
mod keyframe;
mod paths;
mod recovery;
mod remote;
mod session;
mod view;

pub use config::{StoreConfig, DEFAULT_MAX_RECORD_LEN, DEFAULT_MAX_VIEW_PACKAGES};
pub use directory::PageRef;
pub use error::StoreError;
pub use export::{ExportReader, EXPORT_VERSION};
pub use paths::SessionPaths;
pub use remote::RemoteMirror;
pub use session::{CloseSummary, Reply, Whiteboard, WhiteboardOptions};
pub use view::PageView;
