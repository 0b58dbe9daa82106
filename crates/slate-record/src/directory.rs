// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Directory records: scenes, page transforms, keyframes and the export header.

/// Scene index sentinel meaning "assign the next free index".
pub const UNASSIGNED_INDEX: i32 = -1;

/// What a scene displays underneath the strokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SceneKind {
    /// Empty canvas.
    Blank = 0,
    /// Single image per page.
    Image = 1,
    /// Paged document (slides, PDF).
    Document = 2,
}

impl SceneKind {
    /// Map a wire tag back to a kind.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Blank),
            1 => Some(Self::Image),
            2 => Some(Self::Document),
            _ => None,
        }
    }
}

/// Scene descriptor as sent by AddScene and stored in the scene log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneInfo {
    /// Scene index, or [`UNASSIGNED_INDEX`].
    pub index: i32,
    /// Background kind.
    pub kind: SceneKind,
    /// Optional stable resource identifier.
    pub resource_id: Option<String>,
    /// Where the background resource lives.
    pub resource_url: String,
    /// Fixed number of pages; never changes after creation.
    pub page_count: i32,
}

impl SceneInfo {
    /// Descriptor asking for the next free index.
    pub fn new(kind: SceneKind, resource_url: impl Into<String>, page_count: i32) -> Self {
        Self {
            index: UNASSIGNED_INDEX,
            kind,
            resource_id: None,
            resource_url: resource_url.into(),
            page_count,
        }
    }

    /// Two descriptors name the same resource when id and url agree.
    pub fn same_resource(&self, other: &Self) -> bool {
        self.resource_id == other.resource_id && self.resource_url == other.resource_url
    }
}

/// Page transform; doubles as the page-switch index record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageInfo {
    /// Owning scene.
    pub scene: i32,
    /// Page within the scene.
    pub page: i32,
    /// Rotation in degrees.
    pub angle: f32,
    /// Zoom factor.
    pub scale: f32,
    /// Horizontal pan.
    pub move_x: f32,
    /// Vertical pan.
    pub move_y: f32,
}

impl PageInfo {
    /// Identity transform for (scene, page).
    pub fn new(scene: i32, page: i32) -> Self {
        Self {
            scene,
            page,
            angle: 0.0,
            scale: 1.0,
            move_x: 0.0,
            move_y: 0.0,
        }
    }
}

/// Replay starting point for one page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyFrame {
    /// Owning scene.
    pub scene: i32,
    /// Owning page.
    pub page: i32,
    /// Byte offset of the first frame to replay in the data log.
    pub offset: u64,
    /// Session-relative timestamp of the package that produced it.
    pub timestamp: i64,
}

/// Aggregate written at the front of a combined export.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Header {
    /// Export format version.
    pub version: u32,
    /// Session duration in milliseconds.
    pub duration: i64,
    /// Live keyframes, one per page that has one.
    pub keyframes: Vec<KeyFrame>,
    /// Every materialized page transform.
    pub pages: Vec<PageInfo>,
    /// Every scene, in index order.
    pub scenes: Vec<SceneInfo>,
}
