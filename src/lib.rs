//! # Gamepad Tester Library
//!
//! Find a USB gamepad, read its buttons and show them live in the terminal.
//!
//! This library scans the USB bus with libusb, recognizes XInput, Switch Pro
//! and generic HID gamepads from their descriptors, and turns their input
//! reports into a single SNES-style button bitfield.

pub mod config;
pub mod error;
pub mod gamepad;
pub mod hid;
pub mod tester;
pub mod usb;
