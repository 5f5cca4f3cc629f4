//! # Gamepad Module
//!
//! Finds USB gamepads and reads their buttons.
//!
//! This module handles:
//! - The button bitfield shared by every backend
//! - Device type detection from USB descriptors
//! - XInput initialization and report parsing
//! - Polling connected gamepads for button events

pub mod buttons;
pub mod detect;
pub mod input;
pub mod xinput;

pub use buttons::{ButtonMap, Buttons};
pub use detect::{find_usb_device, DeviceCache, DeviceType, ScanOptions, ScanResult};
pub use input::{InputDevice, InputEvent, PollThrottle};
