// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Draw commands carried by `DrawCommand` packages.

/// Upper bound on commands a single decoded package may carry.
pub const MAX_COMMANDS: usize = 65_536;

/// Pen/eraser phase of a draw command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    /// Pen down.
    BeginDraw = 0,
    /// Pen moving.
    Drawing = 1,
    /// Pen up.
    EndDraw = 2,
    /// Eraser down.
    BeginEraser = 3,
    /// Eraser moving.
    Erasing = 4,
    /// Eraser up.
    EndEraser = 5,
}

impl CommandKind {
    /// Map a wire tag back to a kind.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::BeginDraw),
            1 => Some(Self::Drawing),
            2 => Some(Self::EndDraw),
            3 => Some(Self::BeginEraser),
            4 => Some(Self::Erasing),
            5 => Some(Self::EndEraser),
            _ => None,
        }
    }

    /// Returns `true` for the eraser phases.
    pub fn is_eraser(self) -> bool {
        matches!(self, Self::BeginEraser | Self::Erasing | Self::EndEraser)
    }
}

/// One stroke sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Command {
    /// Stroke phase.
    pub kind: CommandKind,
    /// Page-space x coordinate.
    pub x: f32,
    /// Page-space y coordinate.
    pub y: f32,
    /// Packed RGBA colour.
    pub color: u32,
    /// Stroke width in page units.
    pub width: f32,
}

impl Command {
    /// Build a pen sample with default colour (opaque black) and width 1.
    pub fn pen(kind: CommandKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            x,
            y,
            color: 0x0000_00ff,
            width: 1.0,
        }
    }
}
