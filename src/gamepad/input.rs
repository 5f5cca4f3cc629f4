//! # Gamepad Input Polling
//!
//! Connects to a scanned gamepad and turns its interrupt IN reports into
//! button events, whichever backend (XInput or generic HID) the device needs.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::buttons::Buttons;
use super::detect::{DeviceType, ScanResult};
use super::xinput::{self, XInputReport, XINPUT_IN_ENDPOINT, XINPUT_OUT_ENDPOINT};
use crate::config::Config;
use crate::error::Result;
use crate::hid::GamepadLayout;
use crate::usb::UsbDevice;

const INTERFACE: u8 = 0;

/// Limits polling to the endpoint's interval.
///
/// Elapsed time accumulates across calls; a poll is due once the total
/// reaches the interval, and the total then starts over.
#[derive(Debug, Clone)]
pub struct PollThrottle {
    interval: Duration,
    accumulated: Duration,
    last: Option<Instant>,
}

impl PollThrottle {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
            last: None,
        }
    }

    /// True if a poll is due at `now`
    pub fn ready(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            self.accumulated += now.saturating_duration_since(last);
        }
        self.last = Some(now);
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated = Duration::ZERO;
        true
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Button state after one report, and which buttons changed since the last
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub buttons: Buttons,
    pub diff: Buttons,
}

#[derive(Debug)]
enum Backend {
    XInput { endpoint: u8 },
    Hid { endpoint: u8, layout: GamepadLayout },
    Unsupported,
}

/// A connected gamepad
pub struct InputDevice<D: UsbDevice> {
    device: D,
    dev_type: DeviceType,
    vid: u16,
    pid: u16,
    device_desc: Vec<u8>,
    backend: Backend,
    throttle: PollThrottle,
    read_timeout: Duration,
    prev: Buttons,
    buf: [u8; 64],
}

impl<D: UsbDevice> InputDevice<D> {
    /// Take over a scanned device and prepare it for polling.
    ///
    /// # Arguments
    ///
    /// * `scan` - Result of [`super::detect::find_usb_device`]
    /// * `player` - Player number for the XInput LED (1-4)
    /// * `config` - Timeouts, poll interval fallback and HID button map
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Detaching the kernel driver, configuring or claiming interface 0 fails
    /// - XInput LED setup fails or `player` is out of range
    /// - The configured HID button map is invalid
    pub fn connect(scan: ScanResult<D>, player: u8, config: &Config) -> Result<Self> {
        let ScanResult {
            mut device,
            dev_type,
            vid,
            pid,
            descriptor,
            report_descriptor,
            ..
        } = scan;

        if device.kernel_driver_active(INTERFACE)? {
            debug!("Detaching interface {} from kernel", INTERFACE);
            device.detach_kernel_driver(INTERFACE)?;
        }
        let configuration = descriptor
            .configs
            .first()
            .map_or(1, |c| c.configuration_value);
        device.set_configuration(configuration)?;
        device.claim_interface(INTERFACE)?;

        let interface0 = descriptor.interface0();
        let in_endpoint = interface0.and_then(|i| i.interrupt_in());
        let interval_ms = match in_endpoint.map(|e| e.interval) {
            Some(interval) if interval > 0 => interval,
            _ => config.usb.default_poll_interval_ms,
        };

        let backend = match dev_type {
            DeviceType::SwitchPro => {
                warn!("Switch Pro handshake not supported; input will not be read");
                Backend::Unsupported
            }
            DeviceType::XInput => {
                let endpoint = in_endpoint.map_or(XINPUT_IN_ENDPOINT, |e| e.address);
                let out_endpoint = interface0
                    .and_then(|i| i.interrupt_out())
                    .map_or(XINPUT_OUT_ENDPOINT, |e| e.address);
                xinput::init(&device, endpoint, out_endpoint, player, config.usb.drain_reads)?;
                Backend::XInput { endpoint }
            }
            DeviceType::HidGamepad => {
                let button_map = config.hid.button_map()?;
                let layout = report_descriptor
                    .as_ref()
                    .and_then(|report| GamepadLayout::from_descriptor(report, &button_map));
                match (layout, in_endpoint) {
                    (Some(layout), Some(endpoint)) => {
                        info!("Initializing HID gamepad");
                        Backend::Hid {
                            endpoint: endpoint.address,
                            layout,
                        }
                    }
                    _ => {
                        warn!("No usable HID report layout; input will not be read");
                        Backend::Unsupported
                    }
                }
            }
            DeviceType::BootKeyboard | DeviceType::BootMouse | DeviceType::Hid | DeviceType::Other => {
                debug!("No input backend for device type {}", dev_type);
                Backend::Unsupported
            }
        };

        Ok(Self {
            device,
            dev_type,
            vid,
            pid,
            device_desc: descriptor.to_bytes().to_vec(),
            backend,
            throttle: PollThrottle::new(Duration::from_millis(u64::from(interval_ms))),
            read_timeout: config.usb.read_timeout(),
            prev: Buttons::default(),
            buf: [0u8; 64],
        })
    }

    #[must_use]
    pub fn dev_type(&self) -> DeviceType {
        self.dev_type
    }

    #[must_use]
    pub fn vid_pid(&self) -> (u16, u16) {
        (self.vid, self.pid)
    }

    /// Bus location of the device
    #[must_use]
    pub fn location(&self) -> (u8, u8) {
        self.device.location()
    }

    /// Raw device descriptor, for [`super::detect::DeviceCache::forget`]
    #[must_use]
    pub fn device_descriptor(&self) -> &[u8] {
        &self.device_desc
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.throttle.interval()
    }

    /// Poll for input.
    ///
    /// # Returns
    ///
    /// `Some(event)` for every decoded input report, even if no button
    /// changed. `None` while throttled, when the read timed out, for reports
    /// that carry no button state, and for devices without an input backend.
    ///
    /// # Errors
    ///
    /// USB errors other than timeouts, e.g. when the device was unplugged.
    pub fn poll(&mut self, now: Instant) -> Result<Option<InputEvent>> {
        let endpoint = match &self.backend {
            Backend::XInput { endpoint } | Backend::Hid { endpoint, .. } => *endpoint,
            Backend::Unsupported => return Ok(None),
        };
        if !self.throttle.ready(now) {
            return Ok(None);
        }

        let n = match self
            .device
            .read_interrupt(endpoint, &mut self.buf, self.read_timeout)
        {
            Ok(n) => n,
            Err(e) if e.is_timeout() => return Ok(None),
            Err(e) => return Err(e),
        };
        let data = &self.buf[..n];

        let buttons = match &self.backend {
            Backend::XInput { .. } => match XInputReport::parse(data) {
                Some(report) => {
                    trace!(
                        "LT {} RT {} L {:?} R {:?}",
                        report.left_trigger,
                        report.right_trigger,
                        report.left_stick,
                        report.right_stick
                    );
                    report.buttons
                }
                None => {
                    trace!("Ignoring XInput message: {:02x?}", data);
                    return Ok(None);
                }
            },
            Backend::Hid { layout, .. } => match layout.decode(data) {
                Some(buttons) => buttons,
                None => {
                    trace!("Ignoring HID report: {:02x?}", data);
                    return Ok(None);
                }
            },
            Backend::Unsupported => return Ok(None),
        };

        let diff = buttons.diff(self.prev);
        self.prev = buttons;
        Ok(Some(InputEvent { buttons, diff }))
    }
}
