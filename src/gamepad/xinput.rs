//! # XInput Gamepad Driver
//!
//! Wired Xbox 360 compatible gamepads. The button bitfield of an input report
//! is already in the tester's layout, so no mapping is needed.
//!
//! ## Input Report (endpoint 0x81)
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0 | Message type (0x00 = input) |
//! | 1 | Message length |
//! | 2-3 | Buttons (u16 LE) |
//! | 4 | Left trigger |
//! | 5 | Right trigger |
//! | 6-7 | Left stick X (i16 LE) |
//! | 8-9 | Left stick Y (i16 LE) |
//! | 10-11 | Right stick X (i16 LE) |
//! | 12-13 | Right stick Y (i16 LE) |

use std::time::Duration;

use bytes::Buf;
use tracing::{debug, info};

use super::buttons::Buttons;
use crate::error::{GamepadTesterError, Result};
use crate::usb::UsbDevice;

/// Interface 0 interrupt IN endpoint on every pad seen so far
pub const XINPUT_IN_ENDPOINT: u8 = 0x81;
/// Interface 0 interrupt OUT endpoint, used when the descriptor has none
pub const XINPUT_OUT_ENDPOINT: u8 = 0x02;

const MSG_TYPE_INPUT: u8 = 0x00;
const MSG_TYPE_LED: u8 = 0x01;
const INPUT_REPORT_LEN: usize = 14;

const LED_TIMEOUT: Duration = Duration::from_millis(100);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(5);

/// Decoded XInput input report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XInputReport {
    pub buttons: Buttons,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_stick: (i16, i16),
    pub right_stick: (i16, i16),
}

impl XInputReport {
    /// Parse an input report.
    ///
    /// # Returns
    ///
    /// None for other message types (LED status, rumble acks) and short reads
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < INPUT_REPORT_LEN {
            return None;
        }
        let mut buf = data;
        if buf.get_u8() != MSG_TYPE_INPUT {
            return None;
        }
        let _length = buf.get_u8();
        let buttons = Buttons(buf.get_u16_le());
        let left_trigger = buf.get_u8();
        let right_trigger = buf.get_u8();
        let left_stick = (buf.get_i16_le(), buf.get_i16_le());
        let right_stick = (buf.get_i16_le(), buf.get_i16_le());
        Some(Self {
            buttons,
            left_trigger,
            right_trigger,
            left_stick,
            right_stick,
        })
    }
}

/// Player LED command for player 1..4
///
/// # Errors
///
/// Returns `InvalidPlayer` for any other player number
///
/// # Examples
///
/// ```
/// use gamepad_tester::gamepad::xinput::led_report;
///
/// assert_eq!(led_report(1)?, [0x01, 0x03, 0x02]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn led_report(player: u8) -> Result<[u8; 3]> {
    if !(1..=4).contains(&player) {
        return Err(GamepadTesterError::InvalidPlayer(player));
    }
    Ok([MSG_TYPE_LED, 0x03, player + 1])
}

/// Light the player LED
pub fn set_led<D: UsbDevice + ?Sized>(device: &D, endpoint: u8, player: u8) -> Result<()> {
    let report = led_report(player)?;
    device.write_interrupt(endpoint, &report, LED_TIMEOUT)?;
    debug!("XInput LED set for player {}", player);
    Ok(())
}

/// Discard stale reports buffered in the gamepad. Stops at the first error,
/// which normally just means there is nothing left to read.
pub fn drain<D: UsbDevice + ?Sized>(device: &D, endpoint: u8, count: u32) -> u32 {
    let mut buf = [0u8; 64];
    let mut drained = 0;
    for _ in 0..count {
        if device.read_interrupt(endpoint, &mut buf, DRAIN_TIMEOUT).is_err() {
            break;
        }
        drained += 1;
    }
    drained
}

/// Prepare an XInput gamepad for polling: drain old input, then set the
/// player LED.
///
/// # Errors
///
/// Returns `InvalidPlayer` or the USB error from the LED write
pub fn init<D: UsbDevice + ?Sized>(
    device: &D,
    in_endpoint: u8,
    out_endpoint: u8,
    player: u8,
    drain_reads: u32,
) -> Result<()> {
    info!("Initializing XInput gamepad");
    let drained = drain(device, in_endpoint, drain_reads);
    debug!("Drained {} stale XInput reports", drained);
    set_led(device, out_endpoint, player)
}
