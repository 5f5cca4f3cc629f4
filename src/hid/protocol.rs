//! # HID Report Descriptor Constants
//!
//! Item tags, usage pages, usages and collection types from the USB HID 1.11
//! class definition and the HID Usage Tables.
//!
//! A short item prefix byte is laid out as `tttt TTss`: 4-bit tag, 2-bit type
//! (0 main, 1 global, 2 local) and 2-bit size code (0, 1, 2 or 4 data bytes).

// Bitfield masks
pub const HID_SIZE_MASK: u8 = 0x03;
pub const HID_TYPE_MASK: u8 = 0x0C;
pub const HID_TAG_MASK: u8 = 0xF0;

// Global items
pub const HID_USAGE_PAGE: u8 = 0x04;
pub const HID_LOGICAL_MIN: u8 = 0x14;
pub const HID_LOGICAL_MAX: u8 = 0x24;
pub const HID_PHYSICAL_MIN: u8 = 0x34;
pub const HID_PHYSICAL_MAX: u8 = 0x44;
pub const HID_UNIT_EXPONENT: u8 = 0x54;
pub const HID_UNIT: u8 = 0x64;
pub const HID_REPORT_SIZE: u8 = 0x74;
pub const HID_REPORT_ID: u8 = 0x84;
pub const HID_REPORT_COUNT: u8 = 0x94;
pub const HID_PUSH: u8 = 0xA4;
pub const HID_POP: u8 = 0xB4;

// Local items
pub const HID_USAGE: u8 = 0x08;
pub const HID_USAGE_MIN: u8 = 0x18;
pub const HID_USAGE_MAX: u8 = 0x28;
pub const HID_DESIGNATOR_IDX: u8 = 0x38;
pub const HID_DESIGNATOR_MIN: u8 = 0x48;
pub const HID_DESIGNATOR_MAX: u8 = 0x58;
pub const HID_STRING_IDX: u8 = 0x78;
pub const HID_STRING_MIN: u8 = 0x88;
pub const HID_STRING_MAX: u8 = 0x98;
pub const HID_DELIMITER: u8 = 0xA8;

// Main items
pub const HID_INPUT: u8 = 0x80;
pub const HID_OUTPUT: u8 = 0x90;
pub const HID_FEATURE: u8 = 0xB0;
pub const HID_COLLECTION: u8 = 0xA0;
pub const HID_END_COLLECTION: u8 = 0xC0;

/// Reserved main item tag 0; shows up as padding in some descriptors
pub const HID_MAIN_00_NOP: u8 = 0x00;

/// Long item prefix (tag/type bits, size code 2)
pub const HID_LONG_ITEM_PREFIX: u8 = 0xFE;

/// Main item data bit 0: Constant (padding) rather than Data
pub const MAIN_FLAG_CONSTANT: u32 = 0x01;
/// Main item data bit 1: Variable rather than Array
pub const MAIN_FLAG_VARIABLE: u32 = 0x02;
/// Main item data bit 6: Null state
pub const MAIN_FLAG_NULL_STATE: u32 = 0x40;

// Usage pages
pub const USAGE_PAGE_GENERIC_DESKTOP: u16 = 0x01;
pub const USAGE_PAGE_SIMULATION: u16 = 0x02;
pub const USAGE_PAGE_GENERIC_DEVICE: u16 = 0x06;
pub const USAGE_PAGE_KEYBOARD: u16 = 0x07;
pub const USAGE_PAGE_LEDS: u16 = 0x08;
pub const USAGE_PAGE_BUTTON: u16 = 0x09;
pub const USAGE_PAGE_CONSUMER: u16 = 0x0C;
pub const USAGE_PAGE_PHYSICAL_INPUT: u16 = 0x0F;
pub const USAGE_PAGE_VENDOR_MIN: u16 = 0xFF00;

// Usages within the Generic Desktop page
pub const USAGE_POINTER: u16 = 0x01;
pub const USAGE_MOUSE: u16 = 0x02;
pub const USAGE_JOYSTICK: u16 = 0x04;
pub const USAGE_GAMEPAD: u16 = 0x05;
pub const USAGE_KEYBOARD: u16 = 0x06;
pub const USAGE_MULTI_AXIS_CTRL: u16 = 0x08;
pub const USAGE_X: u16 = 0x30;
pub const USAGE_Y: u16 = 0x31;
pub const USAGE_Z: u16 = 0x32;
pub const USAGE_RX: u16 = 0x33;
pub const USAGE_RY: u16 = 0x34;
pub const USAGE_RZ: u16 = 0x35;
pub const USAGE_SLIDER: u16 = 0x36;
pub const USAGE_DIAL: u16 = 0x37;
pub const USAGE_WHEEL: u16 = 0x38;
pub const USAGE_HAT_SWITCH: u16 = 0x39;
pub const USAGE_SYSTEM_CONTROL: u16 = 0x80;

// Usages within the LEDs page (8BitDo Zero 2 uses these)
pub const USAGE_SLOW_BLINK_ON_T: u16 = 0x43;
pub const USAGE_SLOW_BLINK_OFF_T: u16 = 0x44;
pub const USAGE_FAST_BLINK_ON_T: u16 = 0x45;
pub const USAGE_FAST_BLINK_OFF_T: u16 = 0x46;

// Usages within the Simulation Controls page
pub const USAGE_ACCELERATOR: u16 = 0xC4;
pub const USAGE_BRAKE: u16 = 0xC5;

// Usages within the Generic Device Controls page
pub const USAGE_BATTERY_STRENGTH: u16 = 0x20;

// Collection types
pub const COLLECTION_PHYSICAL: u32 = 0x00;
pub const COLLECTION_APPLICATION: u32 = 0x01;
pub const COLLECTION_LOGICAL: u32 = 0x02;
pub const COLLECTION_REPORT: u32 = 0x03;
pub const COLLECTION_NAMED_ARRAY: u32 = 0x04;
pub const COLLECTION_USAGE_SWITCH: u32 = 0x05;
pub const COLLECTION_USAGE_MODIFIER: u32 = 0x06;

/// Human readable name of a usage page
pub fn usage_page_name(page: u16) -> String {
    let name = match page {
        USAGE_PAGE_GENERIC_DESKTOP => "Generic Desktop",
        USAGE_PAGE_SIMULATION => "Simulation Controls",
        USAGE_PAGE_GENERIC_DEVICE => "Generic Device Controls",
        USAGE_PAGE_KEYBOARD => "Keyboard/Keypad",
        USAGE_PAGE_LEDS => "LEDs",
        USAGE_PAGE_BUTTON => "Button",
        USAGE_PAGE_CONSUMER => "Consumer",
        USAGE_PAGE_PHYSICAL_INPUT => "Physical Input Device",
        USAGE_PAGE_VENDOR_MIN..=u16::MAX => return format!("Vendor Defined 0x{:04x}", page),
        _ => return format!("{:08x}", page),
    };
    name.to_string()
}

/// Human readable name of a usage within the Generic Desktop page
pub fn generic_desktop_usage_name(usage: u16) -> String {
    let name = match usage {
        USAGE_POINTER => "Pointer",
        USAGE_MOUSE => "Mouse",
        USAGE_JOYSTICK => "Joystick",
        USAGE_GAMEPAD => "Gamepad",
        USAGE_KEYBOARD => "Keyboard",
        USAGE_MULTI_AXIS_CTRL => "Multi-axis Controller",
        USAGE_X => "X Axis",
        USAGE_Y => "Y Axis",
        USAGE_Z => "Z Axis",
        USAGE_RX => "Rx Axis",
        USAGE_RY => "Ry Axis",
        USAGE_RZ => "Rz Axis",
        USAGE_SLIDER => "Slider",
        USAGE_DIAL => "Dial",
        USAGE_WHEEL => "Wheel",
        USAGE_HAT_SWITCH => "Hat Switch",
        USAGE_SYSTEM_CONTROL => "System Control",
        _ => return format!("{:08x}", usage),
    };
    name.to_string()
}

/// Human readable name of a usage within `page`
pub fn usage_name(page: u16, usage: u16) -> String {
    match (page, usage) {
        (USAGE_PAGE_GENERIC_DESKTOP, id) => generic_desktop_usage_name(id),
        (USAGE_PAGE_SIMULATION, USAGE_ACCELERATOR) => "Accelerator".to_string(),
        (USAGE_PAGE_SIMULATION, USAGE_BRAKE) => "Brake".to_string(),
        (USAGE_PAGE_GENERIC_DEVICE, USAGE_BATTERY_STRENGTH) => "Battery Strength".to_string(),
        (USAGE_PAGE_KEYBOARD, id) => format!("Keyboard 0x{:04x}", id),
        (USAGE_PAGE_LEDS, USAGE_SLOW_BLINK_ON_T) => "Slow Blink On Time".to_string(),
        (USAGE_PAGE_LEDS, USAGE_SLOW_BLINK_OFF_T) => "Slow Blink Off Time".to_string(),
        (USAGE_PAGE_LEDS, USAGE_FAST_BLINK_ON_T) => "Fast Blink On Time".to_string(),
        (USAGE_PAGE_LEDS, USAGE_FAST_BLINK_OFF_T) => "Fast Blink Off Time".to_string(),
        (USAGE_PAGE_BUTTON, id) => format!("Button 0x{:04x}", id),
        (USAGE_PAGE_CONSUMER, id) => format!("Consumer 0x{:04x}", id),
        (_, id) => format!("0x{:04x}", id),
    }
}

/// Human readable name of a collection type
pub fn collection_type_name(kind: u32) -> String {
    let name = match kind {
        COLLECTION_PHYSICAL => "Physical",
        COLLECTION_APPLICATION => "Application",
        COLLECTION_LOGICAL => "Logical",
        COLLECTION_REPORT => "Report",
        COLLECTION_NAMED_ARRAY => "Named Array",
        COLLECTION_USAGE_SWITCH => "Usage Switch",
        COLLECTION_USAGE_MODIFIER => "Usage Modifier",
        _ => return format!("Unknown 0x{:02x}", kind),
    };
    name.to_string()
}
