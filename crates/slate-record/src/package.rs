// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The `Package` envelope: one whiteboard event addressed to a (scene, page).

use crate::{Command, PageInfo, SceneInfo};

/// Discriminates what a package means to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PackageType {
    /// A batch of stroke samples.
    DrawCommand = 0,
    /// Move focus to another (scene, page).
    SwitchScenePage = 1,
    /// Wipe the addressed page.
    CleanDraw = 2,
    /// Query: which (scene, page) is in focus.
    SceneData = 3,
    /// Query: everything needed to redraw a page.
    ScenePageData = 4,
    /// Create a scene.
    AddScene = 5,
    /// Update a page transform.
    PageChange = 6,
    /// Explicit replay starting point for a page.
    KeyFrame = 7,
}

impl PackageType {
    /// Map a wire tag back to a type.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::DrawCommand),
            1 => Some(Self::SwitchScenePage),
            2 => Some(Self::CleanDraw),
            3 => Some(Self::SceneData),
            4 => Some(Self::ScenePageData),
            5 => Some(Self::AddScene),
            6 => Some(Self::PageChange),
            7 => Some(Self::KeyFrame),
            _ => None,
        }
    }

    /// Query types are answered from memory and never written anywhere.
    pub fn is_query(self) -> bool {
        matches!(self, Self::SceneData | Self::ScenePageData)
    }

    /// Types that end up in the data log.
    pub fn is_logged(self) -> bool {
        !self.is_query() && !matches!(self, Self::AddScene | Self::PageChange)
    }
}

/// Type-specific body of a package.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Payload {
    /// Stroke samples, in drawing order.
    Commands(Vec<Command>),
    /// New scene descriptor (AddScene).
    Scene(SceneInfo),
    /// Page transform descriptor (PageChange).
    Page(PageInfo),
    /// Control packages carry nothing.
    #[default]
    Empty,
}

/// One logged or transient whiteboard event.
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    /// What the event means.
    pub kind: PackageType,
    /// Target scene (negative = unspecified).
    pub scene: i32,
    /// Target page (negative = unspecified).
    pub page: i32,
    /// Milliseconds since the whiteboard session started.
    pub timestamp: i64,
    /// Type-specific body.
    pub payload: Payload,
}

impl Package {
    /// Package with an empty payload.
    pub fn control(kind: PackageType, scene: i32, page: i32, timestamp: i64) -> Self {
        Self {
            kind,
            scene,
            page,
            timestamp,
            payload: Payload::Empty,
        }
    }

    /// `DrawCommand` package carrying `commands`.
    pub fn draw(scene: i32, page: i32, timestamp: i64, commands: Vec<Command>) -> Self {
        Self {
            kind: PackageType::DrawCommand,
            scene,
            page,
            timestamp,
            payload: Payload::Commands(commands),
        }
    }

    /// Stroke samples carried by this package; empty for non-command payloads.
    pub fn commands(&self) -> &[Command] {
        match &self.payload {
            Payload::Commands(cmds) => cmds,
            _ => &[],
        }
    }

    /// Scene descriptor, if this package carries one.
    pub fn scene_info(&self) -> Option<&SceneInfo> {
        match &self.payload {
            Payload::Scene(info) => Some(info),
            _ => None,
        }
    }

    /// Page descriptor, if this package carries one.
    pub fn page_info(&self) -> Option<&PageInfo> {
        match &self.payload {
            Payload::Page(info) => Some(info),
            _ => None,
        }
    }
}
