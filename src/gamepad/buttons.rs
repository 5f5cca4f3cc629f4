//! # Gamepad Button Bitfield
//!
//! Button names follow the Nintendo SNES style cluster layout, while the bit
//! positions match the XInput wire format. XInput reports can be used as-is;
//! generic HID gamepads are translated into this layout by a [`ButtonMap`].
//!
//! | Bit | Mask | Button |
//! |-----|------|--------|
//! | 0 | 0x0001 | D-Pad Up |
//! | 1 | 0x0002 | D-Pad Down |
//! | 2 | 0x0004 | D-Pad Left |
//! | 3 | 0x0008 | D-Pad Right |
//! | 4 | 0x0010 | Start |
//! | 5 | 0x0020 | Select |
//! | 6 | 0x0040 | L3 (left stick click) |
//! | 7 | 0x0080 | R3 (right stick click) |
//! | 8 | 0x0100 | L shoulder |
//! | 9 | 0x0200 | R shoulder |
//! | 10 | 0x0400 | Home / Guide |
//! | 12 | 0x1000 | B (bottom; Xbox A) |
//! | 13 | 0x2000 | A (right; Xbox B) |
//! | 14 | 0x4000 | Y (left; Xbox X) |
//! | 15 | 0x8000 | X (top; Xbox Y) |

use serde::de::Error;
use std::fmt;

use crate::error::{GamepadTesterError, Result};

pub const UP: u16 = 0x0001;
pub const DOWN: u16 = 0x0002;
pub const LEFT: u16 = 0x0004;
pub const RIGHT: u16 = 0x0008;
pub const START: u16 = 0x0010;
pub const SELECT: u16 = 0x0020;
pub const L3: u16 = 0x0040;
pub const R3: u16 = 0x0080;
/// Left shoulder button
pub const L: u16 = 0x0100;
/// Right shoulder button
pub const R: u16 = 0x0200;
pub const HOME: u16 = 0x0400;
/// Button cluster: bottom button (Nintendo B, Xbox A)
pub const B: u16 = 0x1000;
/// Button cluster: right button (Nintendo A, Xbox B)
pub const A: u16 = 0x2000;
/// Button cluster: left button (Nintendo Y, Xbox X)
pub const Y: u16 = 0x4000;
/// Button cluster: top button (Nintendo X, Xbox Y)
pub const X: u16 = 0x8000;

/// Name and mask of every known button, in display order.
pub const BUTTON_NAMES: [(&str, u16); 15] = [
    ("UP", UP),
    ("DOWN", DOWN),
    ("LEFT", LEFT),
    ("RIGHT", RIGHT),
    ("START", START),
    ("SELECT", SELECT),
    ("L3", L3),
    ("R3", R3),
    ("L", L),
    ("R", R),
    ("HOME", HOME),
    ("B", B),
    ("A", A),
    ("Y", Y),
    ("X", X),
];

/// Look up a button mask by name (case-insensitive).
pub fn mask_for_name(name: &str) -> Option<u16> {
    BUTTON_NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, mask)| mask)
}

/// Snapshot of all digital buttons as a bitfield.
///
/// # Examples
///
/// ```
/// use gamepad_tester::gamepad::buttons::{Buttons, A, START};
///
/// let buttons = Buttons::new(A | START);
/// assert!(buttons.contains(A));
/// assert_eq!(buttons.pressed_names(), vec!["START", "A"]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Buttons(pub u16);

impl Buttons {
    #[must_use]
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True if every bit of `mask` is set.
    #[must_use]
    pub const fn contains(self, mask: u16) -> bool {
        self.0 & mask == mask
    }

    /// Bits that differ between `self` and `other`.
    #[must_use]
    pub const fn diff(self, other: Buttons) -> Buttons {
        Buttons(self.0 ^ other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of pressed buttons, in table order.
    #[must_use]
    pub fn pressed_names(self) -> Vec<&'static str> {
        BUTTON_NAMES
            .iter()
            .filter(|&&(_, mask)| self.0 & mask != 0)
            .map(|&(name, _)| name)
            .collect()
    }

    /// 16-digit binary representation, most significant bit first.
    #[must_use]
    pub fn format_bits(self) -> String {
        format!("{:016b}", self.0)
    }
}

impl fmt::Display for Buttons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_bits())
    }
}

/// Maps HID button numbers (1-based) onto the bitfield layout.
///
/// Vendors number their HID buttons differently, so the mapping is
/// configurable. The default follows the Switch-style HID order used by
/// wired Switch controllers and 8BitDo pads in DInput mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonMap {
    masks: Vec<u16>,
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self {
            masks: vec![Y, B, A, X, L, R, 0, 0, SELECT, START, L3, R3, HOME],
        }
    }
}

impl ButtonMap {
    /// Build a map from button names; index `i` describes HID button `i + 1`.
    /// An empty name leaves that HID button unmapped.
    ///
    /// # Errors
    ///
    /// Returns `Config` error for an unknown button name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut masks = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                masks.push(0);
                continue;
            }
            match mask_for_name(name) {
                Some(mask) => masks.push(mask),
                None => {
                    return Err(GamepadTesterError::Config(toml::de::Error::custom(
                        format!("unknown button name in button_map: {}", name),
                    )))
                }
            }
        }
        Ok(Self { masks })
    }

    /// Mask for a 1-based HID button number; 0 if unmapped.
    #[must_use]
    pub fn mask(&self, hid_button: u32) -> u16 {
        if hid_button == 0 {
            return 0;
        }
        self.masks
            .get(hid_button as usize - 1)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}
