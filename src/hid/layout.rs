//! # HID Input Report Layout
//!
//! Walks a parsed report descriptor to find where each Input item lives in
//! its report, then decodes gamepad input reports into the [`Buttons`]
//! bitfield.
//!
//! ## Report Layout
//!
//! Bit offsets count from the first byte after the report ID. Devices that
//! declare no Report ID send the payload directly. Fields are packed least
//! significant bit first, in descriptor order.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::protocol::*;
use super::report_descriptor::HidReportDescriptor;
use crate::gamepad::buttons::{self, ButtonMap, Buttons};

/// Hat switch positions 0..7, clockwise from north
const HAT_DIRECTIONS: [u16; 8] = [
    buttons::UP,
    buttons::UP | buttons::RIGHT,
    buttons::RIGHT,
    buttons::DOWN | buttons::RIGHT,
    buttons::DOWN,
    buttons::DOWN | buttons::LEFT,
    buttons::LEFT,
    buttons::UP | buttons::LEFT,
];

/// Largest report payload a field may reach into. High speed interrupt
/// endpoints move at most 1024 bytes per transfer.
const MAX_REPORT_BITS: u32 = 1024 * 8;

// Generic Desktop D-pad usages
const USAGE_DPAD_UP: u16 = 0x90;
const USAGE_DPAD_DOWN: u16 = 0x91;
const USAGE_DPAD_RIGHT: u16 = 0x92;
const USAGE_DPAD_LEFT: u16 = 0x93;

/// One Input main item and the global/local state it was declared with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    pub report_id: Option<u8>,
    /// Offset of the first element within the report payload
    pub bit_offset: u32,
    pub report_size: u32,
    pub report_count: u32,
    pub usage_page: u16,
    /// Explicit usages as (page, id)
    pub usages: Vec<(u16, u16)>,
    /// Usage Minimum/Maximum as (page, min, max)
    pub usage_range: Option<(u16, u16, u16)>,
    pub logical_min: i32,
    pub logical_max: i32,
    /// Input item data (Constant, Variable, Null State, ...)
    pub flags: u32,
}

impl InputField {
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.flags & MAIN_FLAG_CONSTANT != 0
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.flags & MAIN_FLAG_VARIABLE != 0
    }

    /// Usage of element `index`. With an explicit usage list the last usage
    /// repeats for the remaining elements.
    #[must_use]
    pub fn usage(&self, index: u32) -> Option<(u16, u16)> {
        if let Some(last) = self.usages.last() {
            return Some(
                self.usages
                    .get(index as usize)
                    .copied()
                    .unwrap_or(*last),
            );
        }
        let (page, min, max) = self.usage_range?;
        let id = u32::from(min).checked_add(index)?;
        (id <= u32::from(max)).then_some((page, id as u16))
    }

    /// Bit offset of element `index` within the payload
    #[must_use]
    pub fn element_offset(&self, index: u32) -> u32 {
        self.bit_offset
            .saturating_add(index.saturating_mul(self.report_size))
    }

    /// Raw value of element `index`, or None if the payload is too short
    #[must_use]
    pub fn read(&self, payload: &[u8], index: u32) -> Option<u32> {
        read_bits(payload, self.element_offset(index), self.report_size)
    }
}

/// Read `bit_size` bits (at most 32) starting at `bit_offset`, LSB first.
fn read_bits(payload: &[u8], bit_offset: u32, bit_size: u32) -> Option<u32> {
    let mut value = 0u32;
    for i in 0..bit_size.min(32) {
        let bit = (bit_offset + i) as usize;
        let byte = payload.get(bit / 8)?;
        value |= u32::from((byte >> (bit % 8)) & 1) << i;
    }
    Some(value)
}

#[derive(Debug, Clone, Copy)]
struct GlobalState {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    report_size: u32,
    report_count: u32,
    report_id: Option<u8>,
}

impl HidReportDescriptor {
    /// Bit layout of every Input item, in descriptor order.
    ///
    /// The walk stops at the first Input item whose size overflows, reaches
    /// past [`MAX_REPORT_BITS`] or counts more elements than that; later
    /// offsets would be meaningless.
    #[must_use]
    pub fn input_fields(&self) -> Vec<InputField> {
        let mut global = GlobalState {
            usage_page: 0,
            logical_min: 0,
            logical_max: 0,
            report_size: 0,
            report_count: 0,
            report_id: None,
        };
        let mut stack: Vec<GlobalState> = Vec::new();
        let mut usages: Vec<(Option<u16>, u16)> = Vec::new();
        let mut usage_min: Option<(Option<u16>, u16)> = None;
        let mut usage_max: Option<u16> = None;
        let mut offsets: HashMap<Option<u8>, u32> = HashMap::new();
        let mut fields = Vec::new();

        for item in self.items() {
            match item.tag {
                HID_USAGE_PAGE => global.usage_page = item.data as u16,
                HID_LOGICAL_MIN => global.logical_min = item.signed(),
                HID_LOGICAL_MAX => global.logical_max = item.signed(),
                HID_REPORT_SIZE => global.report_size = item.data,
                HID_REPORT_COUNT => global.report_count = item.data,
                HID_REPORT_ID => global.report_id = Some(item.data as u8),
                HID_PUSH => stack.push(global),
                HID_POP => {
                    if let Some(saved) = stack.pop() {
                        global = saved;
                    }
                }
                HID_USAGE => usages.push(item.usage()),
                HID_USAGE_MIN => usage_min = Some(item.usage()),
                HID_USAGE_MAX => usage_max = Some(item.usage().1),
                HID_INPUT => {
                    let offset = offsets.entry(global.report_id).or_insert(0);
                    let end = global
                        .report_size
                        .checked_mul(global.report_count)
                        .and_then(|bits| offset.checked_add(bits))
                        .filter(|&end| end <= MAX_REPORT_BITS && global.report_count <= MAX_REPORT_BITS);
                    let Some(end) = end else {
                        warn!(
                            "Input item of {} x {} bits at bit {} exceeds the report size limit; ignoring the rest of the descriptor",
                            global.report_count, global.report_size, offset
                        );
                        break;
                    };
                    let page = global.usage_page;
                    let usage_range = match (usage_min, usage_max) {
                        (Some((min_page, min)), Some(max)) => Some((min_page.unwrap_or(page), min, max)),
                        _ => None,
                    };
                    fields.push(InputField {
                        report_id: global.report_id,
                        bit_offset: *offset,
                        report_size: global.report_size,
                        report_count: global.report_count,
                        usage_page: page,
                        usages: usages.iter().map(|&(p, id)| (p.unwrap_or(page), id)).collect(),
                        usage_range,
                        logical_min: global.logical_min,
                        logical_max: global.logical_max,
                        flags: item.data,
                    });
                    *offset = end;
                    usages.clear();
                    usage_min = None;
                    usage_max = None;
                }
                HID_OUTPUT | HID_FEATURE | HID_COLLECTION | HID_END_COLLECTION => {
                    usages.clear();
                    usage_min = None;
                    usage_max = None;
                }
                _ => {}
            }
        }
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BitMapping {
    bit_offset: u32,
    mask: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HatField {
    bit_offset: u32,
    bit_size: u32,
    logical_min: i32,
    logical_max: i32,
}

/// Decoder for one gamepad input report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamepadLayout {
    report_id: Option<u8>,
    buttons: Vec<BitMapping>,
    hat: Option<HatField>,
}

impl GamepadLayout {
    /// Locate the button, D-pad and hat switch fields of the first report
    /// that carries any of them.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - Parsed report descriptor of interface 0
    /// * `button_map` - Translation from HID button numbers to bitfield masks
    ///
    /// # Returns
    ///
    /// None if the descriptor declares no buttons and no hat switch
    #[must_use]
    pub fn from_descriptor(descriptor: &HidReportDescriptor, button_map: &ButtonMap) -> Option<Self> {
        let fields: Vec<InputField> = descriptor
            .input_fields()
            .into_iter()
            .filter(|f| !f.is_constant() && f.is_variable())
            .collect();

        let report_id = fields
            .iter()
            .find(|f| (0..f.report_count).any(|i| is_gamepad_control(f.usage(i))))?
            .report_id;

        let mut buttons = Vec::new();
        let mut hat = None;
        for field in fields.iter().filter(|f| f.report_id == report_id) {
            for index in 0..field.report_count {
                let Some((page, id)) = field.usage(index) else {
                    continue;
                };
                let bit_offset = field.element_offset(index);
                match (page, id) {
                    (USAGE_PAGE_BUTTON, n) if field.report_size == 1 => {
                        let mask = button_map.mask(u32::from(n));
                        if mask != 0 {
                            buttons.push(BitMapping { bit_offset, mask });
                        }
                    }
                    (USAGE_PAGE_GENERIC_DESKTOP, USAGE_HAT_SWITCH) if hat.is_none() => {
                        hat = Some(HatField {
                            bit_offset,
                            bit_size: field.report_size,
                            logical_min: field.logical_min,
                            logical_max: field.logical_max,
                        });
                    }
                    (USAGE_PAGE_GENERIC_DESKTOP, USAGE_DPAD_UP..=USAGE_DPAD_LEFT)
                        if field.report_size == 1 =>
                    {
                        let mask = match id {
                            USAGE_DPAD_UP => buttons::UP,
                            USAGE_DPAD_DOWN => buttons::DOWN,
                            USAGE_DPAD_RIGHT => buttons::RIGHT,
                            _ => buttons::LEFT,
                        };
                        buttons.push(BitMapping { bit_offset, mask });
                    }
                    _ => {}
                }
            }
        }

        debug!(
            "HID gamepad layout: report id {:?}, {} mapped buttons, hat: {}",
            report_id,
            buttons.len(),
            hat.is_some()
        );
        Some(Self {
            report_id,
            buttons,
            hat,
        })
    }

    #[must_use]
    pub fn report_id(&self) -> Option<u8> {
        self.report_id
    }

    /// Decode an input report as received from the interrupt endpoint.
    ///
    /// # Returns
    ///
    /// None if the report belongs to another report ID or is too short
    #[must_use]
    pub fn decode(&self, report: &[u8]) -> Option<Buttons> {
        let payload = match self.report_id {
            Some(id) => {
                let (&first, rest) = report.split_first()?;
                if first != id {
                    return None;
                }
                rest
            }
            None => report,
        };

        let mut bits = 0u16;
        for button in &self.buttons {
            if read_bits(payload, button.bit_offset, 1)? != 0 {
                bits |= button.mask;
            }
        }
        if let Some(hat) = &self.hat {
            let value = i64::from(read_bits(payload, hat.bit_offset, hat.bit_size)?);
            if value <= i64::from(hat.logical_max) {
                let direction = value - i64::from(hat.logical_min);
                if let Some(&mask) = usize::try_from(direction)
                    .ok()
                    .and_then(|d| HAT_DIRECTIONS.get(d))
                {
                    bits |= mask;
                }
            }
        }
        Some(Buttons(bits))
    }
}

fn is_gamepad_control(usage: Option<(u16, u16)>) -> bool {
    matches!(
        usage,
        Some((USAGE_PAGE_BUTTON, _))
            | Some((USAGE_PAGE_GENERIC_DESKTOP, USAGE_HAT_SWITCH))
            | Some((USAGE_PAGE_GENERIC_DESKTOP, USAGE_DPAD_UP..=USAGE_DPAD_LEFT))
    )
}
