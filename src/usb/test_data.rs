//! USB descriptor fixtures for testing gamepad type detection.
//!
//! Captured from assorted gamepads and HID devices. Device and configuration
//! descriptors are rebuilt from the class codes and endpoint lists; the HID
//! report descriptors are verbatim.

use super::device::mocks::FakeDevice;

pub struct InterfaceFixture {
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub endpoints: &'static [u8],
    pub report_hex: &'static str,
}

impl InterfaceFixture {
    pub fn report(&self) -> Vec<u8> {
        hex(self.report_hex)
    }
}

pub struct DeviceFixture {
    pub name: &'static str,
    pub vid: u16,
    pub pid: u16,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub interfaces: &'static [InterfaceFixture],
}

/// Convert a string of space separated hex bytes into bytes
pub fn hex(s: &str) -> Vec<u8> {
    s.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).expect("fixture hex"))
        .collect()
}

impl DeviceFixture {
    pub fn device_descriptor(&self) -> Vec<u8> {
        let [vid_lo, vid_hi] = self.vid.to_le_bytes();
        let [pid_lo, pid_hi] = self.pid.to_le_bytes();
        vec![
            18, 0x01, 0x00, 0x02, self.class, self.subclass, self.protocol, 64, vid_lo, vid_hi,
            pid_lo, pid_hi, 0x00, 0x01, 1, 2, 3, 1,
        ]
    }

    pub fn config_descriptor(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (n, interface) in self.interfaces.iter().enumerate() {
            body.extend_from_slice(&[
                9,
                0x04,
                n as u8,
                0,
                interface.endpoints.len() as u8,
                interface.class,
                interface.subclass,
                interface.protocol,
                0,
            ]);
            if interface.class == 0x03 {
                let [lo, hi] = (interface.report().len() as u16).to_le_bytes();
                body.extend_from_slice(&[9, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, lo, hi]);
            } else if interface.class == 0xff && interface.subclass == 0x5d {
                // XInput vendor descriptor; reuses type 0x21 with its own layout
                body.extend_from_slice(&[
                    0x11, 0x21, 0x00, 0x01, 0x01, 0x25, 0x81, 0x14, 0x00, 0x00, 0x00, 0x00, 0x13,
                    0x02, 0x08, 0x00, 0x00,
                ]);
            }
            for &address in interface.endpoints {
                body.extend_from_slice(&[7, 0x05, address, 0x03, 0x20, 0x00, 0x04]);
            }
        }
        let total = (body.len() + 9) as u16;
        let [lo, hi] = total.to_le_bytes();
        let mut data = vec![9, 0x02, lo, hi, self.interfaces.len() as u8, 1, 0, 0xa0, 0xfa];
        data.extend(body);
        data
    }

    /// Fake device serving this fixture's descriptors
    pub fn fake_device(&self, location: (u8, u8)) -> FakeDevice {
        let mut device = FakeDevice::new(location)
            .with_descriptor(0x0100, 0, self.device_descriptor())
            .with_descriptor(0x0200, 0, self.config_descriptor());
        for (n, interface) in self.interfaces.iter().enumerate() {
            if !interface.report_hex.is_empty() {
                device = device.with_descriptor(0x2200, n as u16, interface.report());
            }
        }
        device
    }
}

/// Compact USB wired keyboard (US QWERTY layout)
pub const COMPACT_KEYBOARD: DeviceFixture = DeviceFixture {
    name: "Compact Keyboard",
    vid: 0x2222,
    pid: 0x0099,
    class: 0x00,
    subclass: 0x00,
    protocol: 0x00,
    interfaces: &[
        InterfaceFixture {
            class: 0x03,
            subclass: 0x01,
            protocol: 0x01,
            endpoints: &[0x81],
            report_hex: "05 01 09 06 a1 01 05 08 19 01 29 03 15 00 25 01 75 01 95 03 91 02 95 05 \
                         91 01 05 07 19 e0 29 e7 95 08 81 02 75 08 95 01 81 01 19 00 2a ff 00 26 \
                         ff 00 95 06 81 00 c0",
        },
        InterfaceFixture {
            class: 0x03,
            subclass: 0x00,
            protocol: 0x00,
            endpoints: &[0x82],
            report_hex: "05 0c 09 01 a1 01 85 01 19 00 2a 3c 02 15 00 26 3c 02 95 01 75 10 81 00 \
                         c0 05 01 09 80 a1 01 85 02 19 81 29 83 25 01 75 01 95 03 81 02 95 05 81 \
                         01 c0",
        },
    ],
};

/// Cheap USB wired scrollwheel mouse
pub const CHEAP_MOUSE: DeviceFixture = DeviceFixture {
    name: "Cheap Mouse",
    vid: 0x413c,
    pid: 0x301a,
    class: 0x00,
    subclass: 0x00,
    protocol: 0x00,
    interfaces: &[InterfaceFixture {
        class: 0x03,
        subclass: 0x01,
        protocol: 0x02,
        endpoints: &[0x81],
        report_hex: "05 01 09 02 a1 01 09 01 a1 00 05 09 19 01 29 03 15 00 25 01 75 01 95 03 \
                     81 02 75 05 95 01 81 03 06 00 ff 09 40 95 02 75 08 15 81 25 7f 81 02 05 \
                     01 09 38 15 81 25 7f 75 08 95 01 81 06 09 30 09 31 16 01 80 26 ff 7f 75 \
                     10 95 02 81 06 c0 c0",
    }],
};

/// PowerA Wired Controller (marketed for use with Switch)
pub const POWERA: DeviceFixture = DeviceFixture {
    name: "PowerA Wired Controller (marketed for Switch)",
    vid: 0x20d6,
    pid: 0xa711,
    class: 0x00,
    subclass: 0x00,
    protocol: 0x00,
    interfaces: &[InterfaceFixture {
        class: 0x03,
        subclass: 0x00,
        protocol: 0x00,
        endpoints: &[0x02, 0x81],
        report_hex: "05 01 09 05 a1 01 15 00 25 01 35 00 45 01 75 01 95 0e 05 09 19 01 29 0e \
                     81 02 95 02 81 01 05 01 25 07 46 3b 01 75 04 95 01 65 14 09 39 81 42 65 \
                     00 95 01 81 01 26 ff 00 46 ff 00 09 30 09 31 09 32 09 35 75 08 95 04 81 \
                     02 75 08 95 01 81 01 05 0c 09 00 15 80 25 7f 75 08 95 40 b1 02 c0",
    }],
};

const SWITCH_PRO_REPORT: &str =
    "05 01 15 00 09 04 a1 01 85 30 05 01 05 09 19 01 29 0a 15 00 25 01 75 01 \
     95 0a 55 00 65 00 81 02 05 09 19 0b 29 0e 15 00 25 01 75 01 95 04 81 02 \
     75 01 95 02 81 03 0b 01 00 01 00 a1 00 0b 30 00 01 00 0b 31 00 01 00 0b \
     32 00 01 00 0b 35 00 01 00 15 00 27 ff ff 00 00 75 10 95 04 81 02 c0 0b \
     39 00 01 00 15 00 25 07 35 00 46 3b 01 65 14 75 04 95 01 81 02 05 09 19 \
     0f 29 12 15 00 25 01 75 01 95 04 81 02 75 08 95 34 81 03 06 00 ff 85 21 \
     09 01 75 08 95 3f 81 03 85 81 09 02 75 08 95 3f 81 03 85 01 09 03 75 08 \
     95 3f 91 83 85 10 09 04 75 08 95 3f 91 83 85 80 09 05 75 08 95 3f 91 83 \
     85 82 09 06 75 08 95 3f 91 83 c0";

/// 8BitDo Ultimate Bluetooth Controller USB adapter (Switch Pro compatible)
pub const ULTIMATE_BT: DeviceFixture = DeviceFixture {
    name: "8BitDo Ultimate Bluetooth Controller (Switch Pro compatible)",
    vid: 0x057e,
    pid: 0x2009,
    class: 0x00,
    subclass: 0x00,
    protocol: 0x00,
    interfaces: &[InterfaceFixture {
        class: 0x03,
        subclass: 0x00,
        protocol: 0x00,
        endpoints: &[0x81, 0x02],
        report_hex: SWITCH_PRO_REPORT,
    }],
};

/// 8BitDo Zero 2 (connected by USB-C, generic HID)
pub const ZERO2: DeviceFixture = DeviceFixture {
    name: "8BitDo Zero 2 (USB-C, BT mode has no effect on USB descriptor)",
    vid: 0x2dc8,
    pid: 0x9018,
    class: 0x00,
    subclass: 0x00,
    protocol: 0x00,
    interfaces: &[InterfaceFixture {
        class: 0x03,
        subclass: 0x00,
        protocol: 0x00,
        endpoints: &[0x81, 0x02],
        report_hex: "05 01 09 05 a1 01 15 00 25 01 35 00 45 01 75 01 95 0f 05 09 19 01 29 0f \
                     81 02 95 01 81 01 05 01 25 07 46 3b 01 75 04 95 01 65 14 09 39 81 42 65 \
                     00 95 01 81 01 26 ff 00 46 ff 00 09 30 09 31 09 32 09 35 75 08 95 04 81 \
                     02 65 00 75 08 95 02 81 01 05 08 09 43 15 00 26 ff 00 35 00 46 ff 00 75 \
                     08 95 02 91 82 09 44 91 82 09 45 91 82 09 46 91 82 c0",
    }],
};

/// 8BitDo SN30 Pro Bluetooth gamepad (USB-C + DInput mode)
pub const SN30PRO_BT_DINPUT: DeviceFixture = DeviceFixture {
    name: "8BitDo SN30 Pro Bluetooth (USB-C + DInput mode)",
    vid: 0x2dc8,
    pid: 0x6001,
    class: 0x00,
    subclass: 0x00,
    protocol: 0x00,
    interfaces: &[InterfaceFixture {
        class: 0x03,
        subclass: 0x00,
        protocol: 0x00,
        endpoints: &[0x81, 0x02],
        report_hex: "05 01 09 05 a1 01 85 03 05 01 15 00 25 07 46 3b 01 95 01 75 04 65 14 09 \
                     39 81 42 75 01 95 04 81 01 15 00 26 ff 00 09 30 09 31 09 32 09 35 95 04 \
                     75 08 81 02 05 02 15 00 26 ff 00 09 c4 09 c5 95 02 75 08 81 02 05 09 19 \
                     01 29 10 15 00 25 01 75 01 95 10 81 02 05 06 09 20 15 00 25 64 75 08 95 \
                     01 81 02 05 0f 09 70 85 05 15 00 25 64 75 08 95 04 91 02 85 02 09 02 75 \
                     08 95 3f 81 03 85 81 09 03 75 08 95 3f 91 83 c0",
    }],
};

/// 8BitDo SN30 Pro Bluetooth gamepad (USB-C + Switch mode)
pub const SN30PRO_BT_SWITCH: DeviceFixture = DeviceFixture {
    name: "8BitDo SN30 Pro Bluetooth (USB-C + Switch mode)",
    vid: 0x057e,
    pid: 0x2009,
    class: 0x00,
    subclass: 0x00,
    protocol: 0x00,
    interfaces: &[InterfaceFixture {
        class: 0x03,
        subclass: 0x00,
        protocol: 0x00,
        endpoints: &[0x81, 0x02],
        report_hex: SWITCH_PRO_REPORT,
    }],
};

/// 8BitDo SN30 Pro Bluetooth gamepad (USB-C + XInput mode)
pub const SN30PRO_BT_XINPUT: DeviceFixture = DeviceFixture {
    name: "8BitDo SN30 Pro Bluetooth (USB-C + XInput mode)",
    vid: 0x045e,
    pid: 0x028e,
    class: 0xff,
    subclass: 0xff,
    protocol: 0xff,
    interfaces: &[
        InterfaceFixture { class: 0xff, subclass: 0x5d, protocol: 0x01, endpoints: &[0x81, 0x01], report_hex: "" },
        InterfaceFixture { class: 0xff, subclass: 0x5d, protocol: 0x03, endpoints: &[0x82, 0x02, 0x83, 0x03], report_hex: "" },
        InterfaceFixture { class: 0xff, subclass: 0x5d, protocol: 0x02, endpoints: &[0x84], report_hex: "" },
        InterfaceFixture { class: 0xff, subclass: 0xfd, protocol: 0x13, endpoints: &[], report_hex: "" },
    ],
};

/// 8BitDo SN30 Pro USB gamepad (the wired XInput version)
pub const SN30PRO_USB: DeviceFixture = DeviceFixture {
    name: "8BitDo SN30 Pro USB (XInput)",
    vid: 0x045e,
    pid: 0x028e,
    class: 0xff,
    subclass: 0xff,
    protocol: 0xff,
    interfaces: &[
        InterfaceFixture { class: 0xff, subclass: 0x5d, protocol: 0x01, endpoints: &[0x81, 0x02], report_hex: "" },
        InterfaceFixture { class: 0xff, subclass: 0x5d, protocol: 0x03, endpoints: &[0x83, 0x04], report_hex: "" },
        InterfaceFixture { class: 0xff, subclass: 0x5d, protocol: 0x02, endpoints: &[0x86], report_hex: "" },
        InterfaceFixture { class: 0xff, subclass: 0xfd, protocol: 0x13, endpoints: &[], report_hex: "" },
    ],
};

/// Report descriptor that changes Report ID, Report Size and Usage Page
/// between Push and Pop, then declares an X axis inside a Delimiter set
pub const PUSH_POP_REPORT: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x85, 0x01, // Report ID (1)
    0x75, 0x08, // Report Size (8)
    0x95, 0x01, // Report Count (1)
    0xa4, // Push
    0x85, 0x02, //   Report ID (2)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x08, //   Usage Maximum (8)
    0x81, 0x02, //   Input (Data,Var,Abs)
    0xb4, // Pop
    0xa9, 0x01, // Delimiter (Open)
    0x09, 0x30, //   Usage (X)
    0xa9, 0x00, // Delimiter (Close)
    0x81, 0x02, // Input (Data,Var,Abs)
];

/// The full set of fixtures
pub const ALL: [&DeviceFixture; 9] = [
    &COMPACT_KEYBOARD,
    &CHEAP_MOUSE,
    &POWERA,
    &ULTIMATE_BT,
    &ZERO2,
    &SN30PRO_BT_DINPUT,
    &SN30PRO_BT_SWITCH,
    &SN30PRO_BT_XINPUT,
    &SN30PRO_USB,
];
