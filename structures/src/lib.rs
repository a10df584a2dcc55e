use bincode::{Decode, Encode};

#[macro_use]
extern crate serde_derive;

pub mod messages;

pub type Rgba = [u8; 4];

/// A single pixel placement as stored in a history file.
///
/// Encoded as 16 bytes: `x`, `y` and `player_index` as big-endian u32, the
/// color as four raw bytes in between.
#[derive(Encode, Decode, PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub struct PixelRecord {
    pub x: u32,
    pub y: u32,
    pub color: Rgba,
    pub player_index: u32,
}

impl PixelRecord {
    pub fn new(x: u32, y: u32, color: Rgba, player_index: u32) -> Self {
        Self {
            x,
            y,
            color,
            player_index,
        }
    }
}
