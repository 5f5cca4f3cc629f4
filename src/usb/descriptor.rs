//! # USB Descriptor Parser
//!
//! Reads and parses the device descriptor and the configuration descriptor set
//! (configuration, interface, endpoint and HID class descriptors) of a USB
//! device. These details are what gamepad detection keys on.
//!
//! ## Descriptor Layouts
//!
//! | Descriptor | bLength | bDescriptorType |
//! |------------|---------|-----------------|
//! | Device | 18 | 0x01 |
//! | Configuration | 9 | 0x02 |
//! | Interface | 9 | 0x04 |
//! | Endpoint | 7 | 0x05 |
//! | HID | 6 + 3n | 0x21 |
//! | HID Report | - | 0x22 |

use std::fmt;
use std::time::Duration;

use tracing::{debug, error};

use super::device::UsbDevice;
use crate::error::{GamepadTesterError, Result};

pub const DESC_TYPE_DEVICE: u8 = 0x01;
pub const DESC_TYPE_CONFIGURATION: u8 = 0x02;
pub const DESC_TYPE_INTERFACE: u8 = 0x04;
pub const DESC_TYPE_ENDPOINT: u8 = 0x05;
pub const DESC_TYPE_HID: u8 = 0x21;
pub const DESC_TYPE_HID_REPORT: u8 = 0x22;

/// bmRequestType: device-to-host, standard, device recipient
const REQUEST_TYPE_IN_DEVICE: u8 = 0x80;
/// bmRequestType: device-to-host, standard, interface recipient
const REQUEST_TYPE_IN_INTERFACE: u8 = 0x81;
/// bRequest: GET_DESCRIPTOR
const REQUEST_GET_DESCRIPTOR: u8 = 0x06;

/// Device descriptor length
pub const DEVICE_DESC_LEN: usize = 18;

/// Largest configuration descriptor set we are willing to read
const MAX_CONFIG_DESC_LEN: usize = 1024;

/// Endpoint direction bit (set for IN endpoints)
pub const ENDPOINT_DIR_IN: u8 = 0x80;
/// bmAttributes transfer type mask
const ENDPOINT_TRANSFER_TYPE_MASK: u8 = 0x03;
/// bmAttributes transfer type: interrupt
const ENDPOINT_TRANSFER_INTERRUPT: u8 = 0x03;

/// Read a descriptor with GET_DESCRIPTOR.
///
/// # Arguments
///
/// * `desc_type` - descriptor type (high byte of wValue)
/// * `index` - descriptor index (low byte of wValue)
/// * `length` - maximum number of bytes to read
pub fn get_desc<D: UsbDevice + ?Sized>(
    device: &D,
    desc_type: u8,
    index: u8,
    length: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let mut data = vec![0u8; length];
    let value = (u16::from(desc_type) << 8) | u16::from(index);
    let n = device.read_control(
        REQUEST_TYPE_IN_DEVICE,
        REQUEST_GET_DESCRIPTOR,
        value,
        0,
        &mut data,
        timeout,
    )?;
    data.truncate(n);
    Ok(data)
}

/// Read the full configuration descriptor set, sized by its wTotalLength.
pub fn get_config_desc<D: UsbDevice + ?Sized>(device: &D, timeout: Duration) -> Result<Vec<u8>> {
    let header = get_desc(device, DESC_TYPE_CONFIGURATION, 0, 9, timeout)?;
    if header.len() < 4 {
        return Err(GamepadTesterError::Descriptor(
            "Empty Configuration Descriptor".to_string(),
        ));
    }
    let total = usize::from(u16::from_le_bytes([header[2], header[3]])).clamp(9, MAX_CONFIG_DESC_LEN);
    get_desc(device, DESC_TYPE_CONFIGURATION, 0, total, timeout)
}

/// Read an interface's HID report descriptor.
pub fn read_hid_report_descriptor<D: UsbDevice + ?Sized>(
    device: &D,
    interface: u8,
    length: u16,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let mut data = vec![0u8; usize::from(length)];
    let n = device.read_control(
        REQUEST_TYPE_IN_INTERFACE,
        REQUEST_GET_DESCRIPTOR,
        u16::from(DESC_TYPE_HID_REPORT) << 8,
        u16::from(interface),
        &mut data,
        timeout,
    )?;
    data.truncate(n);
    Ok(data)
}

/// Split a combined descriptor into its individual sub-descriptors.
///
/// Each returned slice starts with its own bLength byte. Splitting stops at a
/// zero length byte, or (with an error log) at a length that runs past the end.
pub fn split_desc(data: &[u8]) -> Vec<&[u8]> {
    let mut slices = Vec::new();
    let mut cursor = 0;
    while cursor < data.len() {
        let length = usize::from(data[cursor]);
        if length == 0 {
            break;
        }
        if cursor + length > data.len() {
            error!("Bad descriptor length: data[{}]={}", cursor, length);
            break;
        }
        slices.push(&data[cursor..cursor + length]);
        cursor += length;
    }
    slices
}

/// Hexdump descriptor rows, one row per line, with an optional header.
pub fn dump_rows(rows: &[&[u8]], message: Option<&str>, indent: usize) -> String {
    let mut lines: Vec<String> = message.map(str::to_string).into_iter().collect();
    for row in rows {
        lines.push(format!("{}{}", " ".repeat(indent), hex_bytes(row)));
    }
    lines.join("\n")
}

/// Hexdump a byte buffer, wrapped to fit in 80 columns.
pub fn dump_desc(data: &[u8], message: Option<&str>, indent: usize) -> String {
    let bytes_per_line = ((80 - indent.min(77)) / 3).max(1);
    let rows: Vec<&[u8]> = data.chunks(bytes_per_line).collect();
    dump_rows(&rows, message, indent)
}

fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Configuration descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDesc {
    pub num_interfaces: u8,
    /// Value to pass to SET_CONFIGURATION
    pub configuration_value: u8,
    /// Units of 2 mA
    pub max_power: u8,
}

impl ConfigDesc {
    pub fn parse(d: &[u8]) -> Result<Self> {
        if d.len() != 9 || d[0] != 0x09 || d[1] != DESC_TYPE_CONFIGURATION {
            return Err(GamepadTesterError::Descriptor(
                "Bad configuration descriptor".to_string(),
            ));
        }
        Ok(Self {
            num_interfaces: d[4],
            configuration_value: d[5],
            max_power: d[8],
        })
    }
}

impl fmt::Display for ConfigDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  Config {}: NumInterfaces: {}, MaxPower: {} mA",
            self.configuration_value,
            self.num_interfaces,
            u32::from(self.max_power) * 2
        )
    }
}

/// Endpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDesc {
    pub address: u8,
    /// Low 2 bits: 0 control, 1 isochronous, 2 bulk, 3 interrupt
    pub attributes: u8,
    pub max_packet_size: u16,
    /// Polling interval in ms (full/low speed)
    pub interval: u8,
}

impl EndpointDesc {
    pub fn parse(d: &[u8]) -> Result<Self> {
        if d.len() != 7 || d[0] != 0x07 || d[1] != DESC_TYPE_ENDPOINT {
            return Err(GamepadTesterError::Descriptor(
                "Bad endpoint descriptor".to_string(),
            ));
        }
        Ok(Self {
            address: d[2],
            attributes: d[3],
            max_packet_size: u16::from_le_bytes([d[4], d[5]]),
            interval: d[6],
        })
    }

    #[must_use]
    pub fn is_in(&self) -> bool {
        self.address & ENDPOINT_DIR_IN != 0
    }

    #[must_use]
    pub fn is_interrupt(&self) -> bool {
        self.attributes & ENDPOINT_TRANSFER_TYPE_MASK == ENDPOINT_TRANSFER_INTERRUPT
    }
}

impl fmt::Display for EndpointDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "    Endpoint 0x{:02x}: bmAttributes: 0x{:02x}, wMaxPacketSize: {}, bInterval: {} ms",
            self.address, self.attributes, self.max_packet_size, self.interval
        )
    }
}

/// One (bDescriptorType, wDescriptorLength) entry of a HID descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidSubDesc {
    pub descriptor_type: u8,
    pub descriptor_length: u16,
}

impl fmt::Display for HidSubDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "      bDescriptorType: 0x{:02x}, wDescriptorLength: {}",
            self.descriptor_type, self.descriptor_length
        )
    }
}

/// HID class descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDesc {
    pub length: u8,
    pub sub_descriptors: Vec<HidSubDesc>,
}

impl HidDesc {
    pub fn parse(d: &[u8]) -> Result<Self> {
        if d.len() < 9 || d[0] < 9 || d[1] != DESC_TYPE_HID {
            return Err(GamepadTesterError::Descriptor(
                "Bad HID descriptor".to_string(),
            ));
        }
        let length = d[0];
        let num_descriptors = usize::from(d[5]);
        if 6 + num_descriptors * 3 != usize::from(length) || d.len() < usize::from(length) {
            return Err(GamepadTesterError::Descriptor(
                "Bad HID descriptor (bNumDescriptors)".to_string(),
            ));
        }
        let sub_descriptors = (0..num_descriptors)
            .map(|i| {
                let base = 6 + i * 3;
                HidSubDesc {
                    descriptor_type: d[base],
                    descriptor_length: u16::from_le_bytes([d[base + 1], d[base + 2]]),
                }
            })
            .collect();
        Ok(Self {
            length,
            sub_descriptors,
        })
    }

    /// Length of the HID report descriptor, if one is announced
    #[must_use]
    pub fn report_descriptor_length(&self) -> Option<u16> {
        self.sub_descriptors
            .iter()
            .find(|s| s.descriptor_type == DESC_TYPE_HID_REPORT)
            .map(|s| s.descriptor_length)
    }
}

impl fmt::Display for HidDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "    HID Descriptor:\n      bNumDescriptors: {}", self.sub_descriptors.len())?;
        for sub in &self.sub_descriptors {
            write!(f, "\n{}", sub)?;
        }
        Ok(())
    }
}

/// Interface descriptor with the endpoint and HID descriptors that follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDesc {
    pub number: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub endpoints: Vec<EndpointDesc>,
    pub hid: Option<HidDesc>,
}

impl InterfaceDesc {
    pub fn parse(d: &[u8]) -> Result<Self> {
        if d.len() != 9 || d[0] != 0x09 || d[1] != DESC_TYPE_INTERFACE {
            return Err(GamepadTesterError::Descriptor(
                "Bad interface descriptor".to_string(),
            ));
        }
        Ok(Self {
            number: d[2],
            num_endpoints: d[4],
            class: d[5],
            subclass: d[6],
            protocol: d[7],
            endpoints: Vec::new(),
            hid: None,
        })
    }

    #[must_use]
    pub fn class_subclass_protocol(&self) -> (u8, u8, u8) {
        (self.class, self.subclass, self.protocol)
    }

    /// First interrupt IN endpoint
    #[must_use]
    pub fn interrupt_in(&self) -> Option<&EndpointDesc> {
        self.endpoints.iter().find(|e| e.is_in() && e.is_interrupt())
    }

    /// First interrupt OUT endpoint
    #[must_use]
    pub fn interrupt_out(&self) -> Option<&EndpointDesc> {
        self.endpoints.iter().find(|e| !e.is_in() && e.is_interrupt())
    }
}

impl fmt::Display for InterfaceDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  Interface {}: Endpoints: {}, Class: 0x{:02x}, SubClass: 0x{:02x}, Protocol: 0x{:02x}",
            self.number, self.num_endpoints, self.class, self.subclass, self.protocol
        )?;
        if let Some(hid) = &self.hid {
            write!(f, "\n{}", hid)?;
        }
        for endpoint in &self.endpoints {
            write!(f, "\n{}", endpoint)?;
        }
        Ok(())
    }
}

/// Parsed device descriptor plus its configuration descriptor set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    raw: Vec<u8>,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer_index: u8,
    pub product_index: u8,
    pub serial_number_index: u8,
    pub num_configurations: u8,
    pub configs: Vec<ConfigDesc>,
    pub interfaces: Vec<InterfaceDesc>,
}

impl Descriptor {
    /// Read and parse the device and configuration descriptors of `device`.
    ///
    /// # Errors
    ///
    /// USB transfer errors, or `Descriptor` for malformed data.
    pub fn read<D: UsbDevice + ?Sized>(device: &D, timeout: Duration) -> Result<Self> {
        let device_desc = get_desc(device, DESC_TYPE_DEVICE, 0, DEVICE_DESC_LEN, timeout)?;
        let config_desc = get_config_desc(device, timeout)?;
        Self::parse(&device_desc, &config_desc)
    }

    /// Parse raw device descriptor and configuration descriptor set bytes.
    pub fn parse(device_desc: &[u8], config_desc: &[u8]) -> Result<Self> {
        let length = device_desc.first().copied().unwrap_or(0);
        if length == 0 {
            return Err(GamepadTesterError::Descriptor(
                "Empty Device Descriptor".to_string(),
            ));
        }
        if usize::from(length) != DEVICE_DESC_LEN || device_desc.len() < DEVICE_DESC_LEN {
            return Err(GamepadTesterError::Descriptor(format!(
                "Bad Device Descriptor Length: {}",
                length
            )));
        }
        let d = &device_desc[..DEVICE_DESC_LEN];
        debug!("{}", dump_desc(d, Some("Device Descriptor:"), 1));

        let mut desc = Self {
            raw: d.to_vec(),
            device_class: d[4],
            device_subclass: d[5],
            device_protocol: d[6],
            max_packet_size0: d[7],
            vendor_id: u16::from_le_bytes([d[8], d[9]]),
            product_id: u16::from_le_bytes([d[10], d[11]]),
            manufacturer_index: d[14],
            product_index: d[15],
            serial_number_index: d[16],
            num_configurations: d[17],
            configs: Vec::new(),
            interfaces: Vec::new(),
        };

        let parts = split_desc(config_desc);
        if parts.is_empty() {
            return Err(GamepadTesterError::Descriptor(
                "Empty Configuration Descriptor".to_string(),
            ));
        }
        debug!("{}", dump_rows(&parts, Some("Configuration Descriptor:"), 1));

        for part in parts {
            if part.len() < 2 {
                continue;
            }
            if let Err(e) = desc.parse_part(part) {
                error!("{}", dump_desc(part, Some(e.to_string().as_str()), 1));
                return Err(e);
            }
        }
        Ok(desc)
    }

    fn parse_part(&mut self, d: &[u8]) -> Result<()> {
        let tag = (u16::from(d[0]) << 8) | u16::from(d[1]);
        match tag {
            0x0902 => self.configs.push(ConfigDesc::parse(d)?),
            0x0904 => self.interfaces.push(InterfaceDesc::parse(d)?),
            0x0705 => {
                let endpoint = EndpointDesc::parse(d)?;
                if let Some(interface) = self.interfaces.last_mut() {
                    interface.endpoints.push(endpoint);
                }
            }
            _ if self.device_class == 0x00 && d[1] == DESC_TYPE_HID => {
                let hid = HidDesc::parse(d)?;
                if let Some(interface) = self.interfaces.last_mut() {
                    interface.hid = Some(hid);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Raw 18-byte device descriptor
    #[must_use]
    pub fn to_bytes(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn vid_pid(&self) -> (u16, u16) {
        (self.vendor_id, self.product_id)
    }

    #[must_use]
    pub fn dev_class_subclass_protocol(&self) -> (u8, u8, u8) {
        (self.device_class, self.device_subclass, self.device_protocol)
    }

    /// Interface 0 (class, subclass, protocol); (0, 0, 0) if there is none
    #[must_use]
    pub fn int0_class_subclass_protocol(&self) -> (u8, u8, u8) {
        self.interface0()
            .map(InterfaceDesc::class_subclass_protocol)
            .unwrap_or((0, 0, 0))
    }

    #[must_use]
    pub fn interface0(&self) -> Option<&InterfaceDesc> {
        self.interfaces.iter().find(|i| i.number == 0)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Descriptor:\n  bDeviceClass: 0x{:02x}\n  bDeviceSubClass: 0x{:02x}\n  \
             bDeviceProtocol: 0x{:02x}\n  bMaxPacketSize0: {}\n  idVendor: 0x{:04x}\n  \
             idProduct: 0x{:04x}\n  iManufacturer: {}\n  iProduct: {}\n  \
             iSerialNumber: {}\n  bNumConfigurations: {}",
            self.device_class,
            self.device_subclass,
            self.device_protocol,
            self.max_packet_size0,
            self.vendor_id,
            self.product_id,
            self.manufacturer_index,
            self.product_index,
            self.serial_number_index,
            self.num_configurations
        )?;
        for config in &self.configs {
            write!(f, "\n{}", config)?;
        }
        for interface in &self.interfaces {
            write!(f, "\n{}", interface)?;
        }
        Ok(())
    }
}
