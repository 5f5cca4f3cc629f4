//! # USB Module
//!
//! USB host access and descriptor parsing.
//!
//! This module handles:
//! - Enumerating and opening devices through libusb
//! - Control and interrupt transfers behind the [`device::UsbDevice`] trait
//! - Parsing device, configuration, interface, endpoint and HID descriptors

pub mod descriptor;
pub mod device;

#[cfg(test)]
pub mod test_data;

pub use descriptor::Descriptor;
pub use device::{RusbDevice, RusbHost, UsbDevice, UsbHost};
