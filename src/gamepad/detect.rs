//! # Gamepad Detection
//!
//! Scans the USB bus and classifies each device from its descriptors.
//!
//! ## Classification
//!
//! Checked in this order; the first match wins:
//!
//! | Type | Rule |
//! |------|------|
//! | Switch Pro | VID:PID 057e:2009 |
//! | XInput | device ff/ff/ff, 4 interfaces, interface 0 ff/5d/01 |
//! | HID gamepad | device 00/00/00, interface 0 03/00/00, report descriptor declares a gamepad or joystick |
//! | Boot keyboard | interface 0 03/01/01 |
//! | Boot mouse | interface 0 03/01/02 |
//! | HID | interface 0 03/00/00 |
//! | Other | anything else |

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{GamepadTesterError, Result};
use crate::hid::HidReportDescriptor;
use crate::usb::descriptor::{
    get_config_desc, get_desc, read_hid_report_descriptor, Descriptor, DESC_TYPE_DEVICE,
    DEVICE_DESC_LEN,
};
use crate::usb::{UsbDevice, UsbHost};

/// Switch Pro controller (and compatibles such as 8BitDo pads in Switch mode)
const SWITCH_PRO_VID_PID: (u16, u16) = (0x057e, 0x2009);

const CLASS_HID: (u8, u8, u8) = (0x03, 0x00, 0x00);
const CLASS_BOOT_KEYBOARD: (u8, u8, u8) = (0x03, 0x01, 0x01);
const CLASS_BOOT_MOUSE: (u8, u8, u8) = (0x03, 0x01, 0x02);
const CLASS_XINPUT_DEVICE: (u8, u8, u8) = (0xff, 0xff, 0xff);
const CLASS_XINPUT_INTERFACE0: (u8, u8, u8) = (0xff, 0x5d, 0x01);

/// Kind of USB device found during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    SwitchPro,
    XInput,
    BootMouse,
    BootKeyboard,
    HidGamepad,
    Hid,
    Other,
}

impl DeviceType {
    /// Short tag used in logs and event records; empty for `Other`
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::SwitchPro => "SwitchPro",
            Self::XInput => "XInput",
            Self::BootMouse => "BootMouse",
            Self::BootKeyboard => "BootKeyboard",
            Self::HidGamepad => "HIDGamepad",
            Self::Hid => "HID",
            Self::Other => "",
        }
    }

    /// True for the device types the tester will connect to
    #[must_use]
    pub fn is_gamepad(self) -> bool {
        matches!(self, Self::SwitchPro | Self::XInput | Self::HidGamepad)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other => f.write_str("Other"),
            other => f.write_str(other.tag()),
        }
    }
}

/// A classified device, still open
#[derive(Debug)]
pub struct ScanResult<D> {
    pub device: D,
    pub dev_type: DeviceType,
    pub vid: u16,
    pub pid: u16,
    pub tag: &'static str,
    /// Device (class, subclass, protocol)
    pub dev_info: (u8, u8, u8),
    /// Interface 0 (class, subclass, protocol)
    pub int0_info: (u8, u8, u8),
    pub descriptor: Descriptor,
    /// Interface 0 HID report descriptor, if the device has one
    pub report_descriptor: Option<HidReportDescriptor>,
}

type CacheKey = (u8, u8, Vec<u8>);

/// Devices that were already checked, keyed by bus location and device
/// descriptor, so uninteresting devices are only logged once.
#[derive(Debug, Default)]
pub struct DeviceCache {
    seen: HashSet<CacheKey>,
}

impl DeviceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, location: (u8, u8), device_desc: &[u8]) -> bool {
        self.seen
            .contains(&(location.0, location.1, device_desc.to_vec()))
    }

    /// Remember a device; returns false if it was already cached
    pub fn insert(&mut self, location: (u8, u8), device_desc: &[u8]) -> bool {
        self.seen.insert((location.0, location.1, device_desc.to_vec()))
    }

    /// Forget a device so the next scan reports it again
    pub fn forget(&mut self, location: (u8, u8), device_desc: &[u8]) {
        self.seen.remove(&(location.0, location.1, device_desc.to_vec()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Scan settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub control_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            vendor_id: None,
            product_id: None,
            control_timeout: Duration::from_millis(300),
        }
    }
}

impl ScanOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            vendor_id: config.gamepad.vendor_id,
            product_id: config.gamepad.product_id,
            control_timeout: config.usb.control_timeout(),
        }
    }

    /// True if (vid, pid) passes the optional filter
    #[must_use]
    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        self.vendor_id.map_or(true, |v| v == vid) && self.product_id.map_or(true, |p| p == pid)
    }
}

/// True if the descriptors match the pattern of an XInput gamepad.
#[must_use]
pub fn is_xinput_gamepad(descriptor: &Descriptor) -> bool {
    if descriptor.dev_class_subclass_protocol() != CLASS_XINPUT_DEVICE {
        return false;
    }
    if descriptor.configs.first().map(|c| c.num_interfaces) != Some(4) {
        return false;
    }
    descriptor.int0_class_subclass_protocol() == CLASS_XINPUT_INTERFACE0
}

/// True if the descriptors match the pattern of a generic HID gamepad.
///
/// Covers PC style DInput gamepads and vanilla HID pads such as non-Pro wired
/// Switch controllers. When the report descriptor could not be read, the
/// interface class alone decides.
#[must_use]
pub fn is_hid_gamepad(descriptor: &Descriptor, report: Option<&HidReportDescriptor>) -> bool {
    if descriptor.dev_class_subclass_protocol() != (0x00, 0x00, 0x00) {
        return false;
    }
    if descriptor.int0_class_subclass_protocol() != CLASS_HID {
        return false;
    }
    match report {
        Some(report) => report.is_gamepad(),
        None => {
            warn!("No HID report descriptor; assuming composite HID interface is a gamepad");
            true
        }
    }
}

/// Classify a device from its descriptors
#[must_use]
pub fn classify(descriptor: &Descriptor, report: Option<&HidReportDescriptor>) -> DeviceType {
    let int0_info = descriptor.int0_class_subclass_protocol();
    if descriptor.vid_pid() == SWITCH_PRO_VID_PID {
        DeviceType::SwitchPro
    } else if is_xinput_gamepad(descriptor) {
        DeviceType::XInput
    } else if is_hid_gamepad(descriptor, report) {
        DeviceType::HidGamepad
    } else if int0_info == CLASS_BOOT_KEYBOARD {
        DeviceType::BootKeyboard
    } else if int0_info == CLASS_BOOT_MOUSE {
        DeviceType::BootMouse
    } else if int0_info == CLASS_HID {
        DeviceType::Hid
    } else {
        DeviceType::Other
    }
}

/// Read and parse interface 0's HID report descriptor, if it announces one.
fn read_report_descriptor<D: UsbDevice>(
    device: &D,
    descriptor: &Descriptor,
    timeout: Duration,
) -> Option<HidReportDescriptor> {
    let interface = descriptor.interface0()?;
    let length = interface.hid.as_ref()?.report_descriptor_length()?;
    let data = match read_hid_report_descriptor(device, interface.number, length, timeout) {
        Ok(data) => data,
        Err(e) => {
            warn!("Could not read HID report descriptor: {}", e);
            return None;
        }
    };
    match HidReportDescriptor::parse(&data) {
        Ok(report) => {
            debug!("HID Report Descriptor:\n{}", report);
            Some(report)
        }
        Err(e) => {
            warn!("Could not parse HID report descriptor: {}", e);
            None
        }
    }
}

/// Find the next USB device that has not been checked yet.
///
/// # Arguments
///
/// * `host` - The USB bus to scan
/// * `cache` - Devices already checked; updated by this scan
/// * `options` - Optional VID/PID filter and control transfer timeout
///
/// # Returns
///
/// The first uncached device that passes the filter, classified, or None if
/// there is nothing new on the bus
///
/// # Errors
///
/// Only enumeration of the bus itself can fail. Descriptor parse errors and
/// USB errors from individual devices are logged and that device is skipped.
/// Devices with malformed descriptors are cached; devices that failed a
/// transfer are retried on the next scan.
pub fn find_usb_device<H: UsbHost>(
    host: &H,
    cache: &mut DeviceCache,
    options: &ScanOptions,
) -> Result<Option<ScanResult<H::Device>>> {
    for device in host.devices()? {
        let location = device.location();
        let device_desc = match get_desc(&device, DESC_TYPE_DEVICE, 0, DEVICE_DESC_LEN, options.control_timeout) {
            Ok(data) => data,
            Err(e) => {
                error!("USB error reading device descriptor at {:03}:{:03}: {}", location.0, location.1, e);
                continue;
            }
        };
        if cache.contains(location, &device_desc) {
            debug!("Ignoring cached device at {:03}:{:03}", location.0, location.1);
            continue;
        }

        let descriptor = match get_config_desc(&device, options.control_timeout)
            .and_then(|config_desc| Descriptor::parse(&device_desc, &config_desc))
        {
            Ok(descriptor) => descriptor,
            Err(e @ GamepadTesterError::Descriptor(_)) => {
                error!("{}", e);
                cache.insert(location, &device_desc);
                continue;
            }
            Err(e) => {
                error!("USB error reading configuration at {:03}:{:03}: {}", location.0, location.1, e);
                continue;
            }
        };
        cache.insert(location, &device_desc);

        let (vid, pid) = descriptor.vid_pid();
        if !options.matches(vid, pid) {
            debug!("Skipping {:04x}:{:04x} (does not match filter)", vid, pid);
            continue;
        }
        info!("{}", descriptor);

        let report_descriptor = if descriptor.device_class == 0x00 {
            read_report_descriptor(&device, &descriptor, options.control_timeout)
        } else {
            None
        };
        let dev_type = classify(&descriptor, report_descriptor.as_ref());
        info!("Found {:04x}:{:04x} at {:03}:{:03}: {}", vid, pid, location.0, location.1, dev_type);

        return Ok(Some(ScanResult {
            dev_type,
            vid,
            pid,
            tag: dev_type.tag(),
            dev_info: descriptor.dev_class_subclass_protocol(),
            int0_info: descriptor.int0_class_subclass_protocol(),
            descriptor,
            report_descriptor,
            device,
        }));
    }
    Ok(None)
}
