//! # HID Module
//!
//! HID report descriptor handling for generic USB gamepads.
//!
//! This module handles:
//! - Item tags, usage pages and usage names
//! - Parsing report descriptors and rendering them for the log
//! - Locating button and hat switch fields and decoding input reports

pub mod layout;
pub mod protocol;
pub mod report_descriptor;

pub use layout::{GamepadLayout, InputField};
pub use report_descriptor::HidReportDescriptor;
