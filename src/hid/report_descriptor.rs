//! # HID Report Descriptor Parser
//!
//! Parses HID report descriptors (bDescriptorType 0x22) into short items and
//! renders them as an indented, human readable listing.
//!
//! ## Usage
//!
//! ```
//! use gamepad_tester::hid::report_descriptor::HidReportDescriptor;
//!
//! // Usage Page (Generic Desktop), Usage (Gamepad), Collection (Application), End Collection
//! let desc = HidReportDescriptor::parse(&[0x05, 0x01, 0x09, 0x05, 0xa1, 0x01, 0xc0])?;
//! assert!(desc.is_gamepad());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;

use super::protocol::*;
use crate::error::{GamepadTesterError, Result};

/// One short item from a report descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Tag and type bits of the prefix (size bits cleared)
    pub tag: u8,
    /// Number of data bytes (0, 1, 2 or 4)
    pub size: u8,
    /// Little endian item data, zero extended
    pub data: u32,
}

impl Item {
    /// Item data interpreted as a two's complement value of `size` bytes
    #[must_use]
    pub fn signed(&self) -> i32 {
        match self.size {
            1 => i32::from(self.data as u8 as i8),
            2 => i32::from(self.data as u16 as i16),
            4 => self.data as i32,
            _ => 0,
        }
    }

    /// Item data, or None for zero-length items
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        (self.size > 0).then_some(self.data)
    }

    /// Split a Usage item into (explicit page, usage id). Four-byte usages
    /// carry their own usage page in the high half.
    #[must_use]
    pub fn usage(&self) -> (Option<u16>, u16) {
        if self.size == 4 {
            (Some((self.data >> 16) as u16), (self.data & 0xffff) as u16)
        } else {
            (None, (self.data & 0xffff) as u16)
        }
    }
}

/// Parsed HID report descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidReportDescriptor {
    items: Vec<Item>,
}

impl HidReportDescriptor {
    /// Parse a report descriptor.
    ///
    /// # Errors
    ///
    /// Returns `HidReport` error if:
    /// - An item's data runs past the end of the descriptor
    /// - A long item is present (not supported)
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut items = Vec::new();
        let mut cursor = 0;
        while cursor < data.len() {
            let prefix = data[cursor];
            if prefix == HID_LONG_ITEM_PREFIX {
                return Err(GamepadTesterError::HidReport(
                    "Long items not supported".to_string(),
                ));
            }
            let size: usize = match prefix & HID_SIZE_MASK {
                3 => 4,
                n => usize::from(n),
            };
            let next_cursor = cursor + 1 + size;
            if next_cursor > data.len() {
                return Err(GamepadTesterError::HidReport(format!(
                    "item size too big at offset {}",
                    cursor
                )));
            }
            let item_data = data[cursor + 1..next_cursor]
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            items.push(Item {
                tag: prefix & (HID_TAG_MASK | HID_TYPE_MASK),
                size: size as u8,
                data: item_data,
            });
            cursor = next_cursor;
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Usage (page, id) of every Application collection, in order.
    #[must_use]
    pub fn application_usages(&self) -> Vec<(u16, u16)> {
        let mut usage_page: u16 = 0;
        let mut page_stack: Vec<u16> = Vec::new();
        let mut local_usages: Vec<(u16, u16)> = Vec::new();
        let mut found = Vec::new();

        for item in &self.items {
            match item.tag {
                HID_USAGE_PAGE => usage_page = item.data as u16,
                HID_PUSH => page_stack.push(usage_page),
                HID_POP => usage_page = page_stack.pop().unwrap_or(usage_page),
                HID_USAGE => {
                    let (page, id) = item.usage();
                    local_usages.push((page.unwrap_or(usage_page), id));
                }
                HID_COLLECTION => {
                    if item.data == COLLECTION_APPLICATION {
                        if let Some(&usage) = local_usages.first() {
                            found.push(usage);
                        }
                    }
                    local_usages.clear();
                }
                HID_INPUT | HID_OUTPUT | HID_FEATURE | HID_END_COLLECTION => local_usages.clear(),
                _ => {}
            }
        }
        found
    }

    /// True if some Application collection is a Joystick or Gamepad.
    #[must_use]
    pub fn is_gamepad(&self) -> bool {
        self.application_usages().iter().any(|&(page, id)| {
            page == USAGE_PAGE_GENERIC_DESKTOP && (id == USAGE_JOYSTICK || id == USAGE_GAMEPAD)
        })
    }

    /// Indented, human readable listing of the descriptor.
    ///
    /// Collections indent their contents. The first Report ID indents the
    /// items that follow it; later Report IDs stay at that depth. Items that
    /// do not help identify controls (logical/physical ranges, units,
    /// designators, strings) are left out.
    #[must_use]
    pub fn describe(&self, indent: usize) -> String {
        let mut listing = Listing {
            lines: Vec::new(),
            indent,
        };
        let mut usage_page: u16 = 0;
        let mut page_stack: Vec<u16> = Vec::new();
        let mut seen_report_id = false;

        for item in &self.items {
            match item.tag {
                HID_MAIN_00_NOP => {}

                // Global items
                HID_USAGE_PAGE => {
                    usage_page = item.data as u16;
                    listing.note_str("Usage Page", &usage_page_name(usage_page));
                }
                HID_LOGICAL_MIN | HID_LOGICAL_MAX | HID_PHYSICAL_MIN | HID_PHYSICAL_MAX
                | HID_UNIT_EXPONENT | HID_UNIT => {}
                HID_REPORT_SIZE => listing.note("Report Size", item.value()),
                HID_REPORT_ID => {
                    if seen_report_id {
                        listing.indent = listing.indent.saturating_sub(2);
                    }
                    listing.note_str("Report ID", &format!("0x{:02x}", item.data));
                    listing.indent += 2;
                    seen_report_id = true;
                }
                HID_REPORT_COUNT => listing.note("Report Count", item.value()),
                HID_PUSH => {
                    page_stack.push(usage_page);
                    listing.note("Push", item.value());
                }
                HID_POP => {
                    usage_page = page_stack.pop().unwrap_or(usage_page);
                    listing.note("Pop", item.value());
                }

                // Local items
                HID_USAGE => {
                    let (page, id) = item.usage();
                    listing.note_str("Usage", &usage_name(page.unwrap_or(usage_page), id));
                }
                HID_USAGE_MIN => listing.note("Usage Min", item.value()),
                HID_USAGE_MAX => listing.note("Usage Max", item.value()),
                HID_DESIGNATOR_IDX | HID_DESIGNATOR_MIN | HID_DESIGNATOR_MAX | HID_STRING_IDX
                | HID_STRING_MIN | HID_STRING_MAX => {}
                HID_DELIMITER => listing.note("Delimiter", item.value()),

                // Main items
                HID_INPUT => listing.note("Input", item.value()),
                HID_OUTPUT => listing.note("Output", item.value()),
                HID_FEATURE => listing.note("Feature", item.value()),
                HID_COLLECTION => {
                    listing.note_str("Collection", &collection_type_name(item.data));
                    listing.indent += 2;
                }
                HID_END_COLLECTION => {
                    listing.indent = listing.indent.saturating_sub(2);
                    listing.note("End Collection", item.value());
                }

                // Unknown tag/type
                _ => {
                    let size_code = if item.size == 4 { 3 } else { item.size };
                    listing.note(&format!("0x{:02x}", item.tag | size_code), item.value());
                }
            }
        }
        listing.lines.join("\n")
    }
}

impl fmt::Display for HidReportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(8))
    }
}

struct Listing {
    lines: Vec<String>,
    indent: usize,
}

impl Listing {
    fn note(&mut self, item: &str, data: Option<u32>) {
        let pad = " ".repeat(self.indent);
        match data {
            Some(value) => self.lines.push(format!("{}{} ({})", pad, item, value)),
            None => self.lines.push(format!("{}{}", pad, item)),
        }
    }

    fn note_str(&mut self, item: &str, data: &str) {
        self.lines.push(format!("{}{} ({})", " ".repeat(self.indent), item, data));
    }
}
