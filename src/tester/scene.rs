//! # Gamepad Scene
//!
//! A 10x5 tile picture of a SNES-style gamepad. Each tracked button has a
//! tile that swaps between a pressed and a released sprite.
//!
//! ```text
//!     0  1  2  3  4  5  6  7  8  9
//!  0  .  L  .  .  .  .  .  .  R  .
//!  1  .  .  dU .  .  .  .  X  .  .
//!  2  .  dL .  dR .  .  Y  .  A  .
//!  3  .  .  dD .  Se St .  B  .  .
//!  4  .  .  .  .  .  .  .  .  .  .
//! ```

use std::fmt;

use crate::gamepad::buttons::{self, Buttons};

pub const SCENE_WIDTH: usize = 10;
pub const SCENE_HEIGHT: usize = 5;

/// Sprite indices of the scene with every button released
pub const INITIAL_TILEMAP: [[u8; SCENE_WIDTH]; SCENE_HEIGHT] = [
    [0, 5, 2, 3, 3, 3, 3, 4, 5, 6],
    [7, 9, 12, 9, 9, 9, 9, 17, 9, 13],
    [7, 18, 19, 20, 9, 9, 17, 9, 17, 13],
    [7, 9, 26, 9, 24, 25, 9, 17, 9, 13],
    [21, 23, 23, 23, 23, 23, 23, 23, 23, 27],
];

/// Tile position and sprites for one button
struct SpriteSwap {
    mask: u16,
    x: usize,
    y: usize,
    pressed: u8,
    released: u8,
}

const SPRITE_SWAPS: [SpriteSwap; 12] = [
    SpriteSwap { mask: buttons::A, x: 8, y: 2, pressed: 15, released: 17 },
    SpriteSwap { mask: buttons::B, x: 7, y: 3, pressed: 15, released: 17 },
    SpriteSwap { mask: buttons::X, x: 7, y: 1, pressed: 15, released: 17 },
    SpriteSwap { mask: buttons::Y, x: 6, y: 2, pressed: 15, released: 17 },
    SpriteSwap { mask: buttons::L, x: 1, y: 0, pressed: 1, released: 5 },
    SpriteSwap { mask: buttons::R, x: 8, y: 0, pressed: 1, released: 5 },
    SpriteSwap { mask: buttons::UP, x: 2, y: 1, pressed: 8, released: 12 },
    SpriteSwap { mask: buttons::DOWN, x: 2, y: 3, pressed: 22, released: 26 },
    SpriteSwap { mask: buttons::LEFT, x: 1, y: 2, pressed: 14, released: 18 },
    SpriteSwap { mask: buttons::RIGHT, x: 3, y: 2, pressed: 16, released: 20 },
    SpriteSwap { mask: buttons::SELECT, x: 4, y: 3, pressed: 10, released: 24 },
    SpriteSwap { mask: buttons::START, x: 5, y: 3, pressed: 11, released: 25 },
];

/// Two-column terminal glyph for a sprite index
fn glyph(sprite: u8) -> &'static str {
    match sprite {
        0 => "╭─",
        2 | 3 | 4 | 23 => "──",
        6 => "─╮",
        7 => "│ ",
        13 => " │",
        21 => "╰─",
        27 => "─╯",
        9 => "  ",
        19 => "+ ",
        1 => "██",
        5 => "▁▁",
        8 => "▲ ",
        12 => "△ ",
        22 => "▼ ",
        26 => "▽ ",
        14 => "◀ ",
        18 => "◁ ",
        16 => "▶ ",
        20 => "▷ ",
        15 => "● ",
        17 => "○ ",
        10 | 11 => "▬ ",
        24 | 25 => "▭ ",
        _ => "??",
    }
}

/// Tile grid showing the current button state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    tiles: [[u8; SCENE_WIDTH]; SCENE_HEIGHT],
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiles: INITIAL_TILEMAP,
        }
    }

    /// Sprite index at column `x`, row `y`
    #[must_use]
    pub fn tile(&self, x: usize, y: usize) -> u8 {
        self.tiles[y][x]
    }

    /// Back to the all-released picture
    pub fn reset(&mut self) {
        self.tiles = INITIAL_TILEMAP;
    }

    /// Swap sprites for buttons that changed between `prev` and `buttons`.
    /// Tiles of unchanged buttons are left alone.
    ///
    /// # Returns
    ///
    /// Number of tiles written
    pub fn update(&mut self, prev: Buttons, buttons: Buttons) -> usize {
        let diff = prev.diff(buttons);
        let mut written = 0;
        for swap in SPRITE_SWAPS.iter().filter(|s| diff.contains(s.mask)) {
            self.tiles[swap.y][swap.x] = if buttons.contains(swap.mask) {
                swap.pressed
            } else {
                swap.released
            };
            written += 1;
        }
        written
    }

    /// Render the scene as text, one line per tile row
    #[must_use]
    pub fn render(&self) -> String {
        self.tiles
            .iter()
            .map(|row| row.iter().map(|&sprite| glyph(sprite)).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Button bitfield line. Starts with a carriage return so repeated calls
/// overwrite the same terminal line; end it with a newline before printing
/// anything else.
#[must_use]
pub fn bits_line(buttons: Buttons) -> String {
    format!("\rbutton bits: {}", buttons.format_bits())
}
