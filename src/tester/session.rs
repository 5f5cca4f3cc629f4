//! # Tester Session
//!
//! Scan, connect, poll and display loop, one step at a time. The binary
//! drives [`Tester::step`] from a timer; tests drive it with fake devices.
//!
//! ## Terminal Output
//!
//! The scene (if enabled) is drawn above a `button bits:` line. Redraws move
//! the cursor back up over the scene and rewrite the bits line in place, so
//! the display never scrolls while a gamepad is connected.

use std::io::Write;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, warn};

use super::recorder::{ButtonRecord, Recorder};
use super::scene::{bits_line, Scene, SCENE_HEIGHT};
use crate::config::Config;
use crate::error::Result;
use crate::gamepad::{find_usb_device, Buttons, DeviceCache, DeviceType, InputDevice, InputEvent, ScanOptions};
use crate::usb::UsbHost;

/// What one call to [`Tester::step`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Waiting for the next bus scan
    Waiting,
    /// Scanned; nothing new on the bus
    NoDevice,
    /// Found a device that is not a gamepad
    Skipped(DeviceType),
    /// Connected to a gamepad
    Connected(DeviceType),
    /// Polled; no button changed
    Idle,
    /// Buttons changed
    Changed(InputEvent),
    /// Connection lost or failed; back to scanning
    Disconnected,
}

/// The gamepad tester state machine
pub struct Tester<H: UsbHost, W: Write> {
    host: H,
    config: Config,
    options: ScanOptions,
    cache: DeviceCache,
    input: Option<InputDevice<H::Device>>,
    scene: Scene,
    prev: Buttons,
    recorder: Option<Recorder>,
    out: W,
    next_scan: Option<Instant>,
    scene_drawn: bool,
    need_newline: bool,
}

impl<H: UsbHost, W: Write> Tester<H, W> {
    /// # Errors
    ///
    /// Returns `Io` error if the recorder is enabled and its log directory
    /// cannot be created
    pub fn new(host: H, config: Config, out: W) -> Result<Self> {
        let recorder = if config.recorder.enabled {
            Some(Recorder::new(&config.recorder)?)
        } else {
            None
        };
        Ok(Self {
            host,
            options: ScanOptions::from_config(&config),
            config,
            cache: DeviceCache::new(),
            input: None,
            scene: Scene::new(),
            prev: Buttons::default(),
            recorder,
            out,
            next_scan: None,
            scene_drawn: false,
            need_newline: false,
        })
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.input.is_some()
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Do one unit of work: poll the connected gamepad, or scan the bus if
    /// a scan is due.
    ///
    /// # Errors
    ///
    /// Only enumeration of the USB bus itself and terminal output can fail.
    /// Gamepad USB errors end the connection and return `Disconnected`.
    pub fn step(&mut self, now: Instant) -> Result<Status> {
        if self.input.is_some() {
            return self.poll(now);
        }
        if self.next_scan.map_or(false, |at| now < at) {
            return Ok(Status::Waiting);
        }
        self.scan(now)
    }

    fn scan(&mut self, now: Instant) -> Result<Status> {
        let found = find_usb_device(&self.host, &mut self.cache, &self.options);
        if !matches!(found, Ok(Some(_))) {
            // Nothing to connect to, or the bus could not be listed
            self.next_scan = Some(now + self.config.usb.rescan_interval());
        }
        let Some(result) = found? else {
            return Ok(Status::NoDevice);
        };
        let dev_type = result.dev_type;
        if !dev_type.is_gamepad() {
            info!("Ignoring {:04x}:{:04x} ({})", result.vid, result.pid, dev_type);
            return Ok(Status::Skipped(dev_type));
        }

        info!("Found device. Connecting...");
        match InputDevice::connect(result, self.config.gamepad.player, &self.config) {
            Ok(input) => {
                info!("Connected to {} gamepad, polling every {:?}", dev_type, input.poll_interval());
                self.input = Some(input);
                self.prev = Buttons::default();
                self.scene.reset();
                self.scene_drawn = false;
                self.draw(Buttons::default())?;
                Ok(Status::Connected(dev_type))
            }
            Err(e) => {
                error!("Gamepad connection error: {}", e);
                self.next_scan = Some(now + self.config.usb.rescan_interval());
                Ok(Status::Disconnected)
            }
        }
    }

    fn poll(&mut self, now: Instant) -> Result<Status> {
        let Some(input) = self.input.as_mut() else {
            return Ok(Status::Waiting);
        };
        let event = match input.poll(now) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(Status::Idle),
            Err(e) => {
                self.finish_line()?;
                error!("USB error: {}", e);
                info!("Gamepad disconnected. Looking for gamepad...");
                self.disconnect(now);
                return Ok(Status::Disconnected);
            }
        };
        if event.diff.is_empty() {
            return Ok(Status::Idle);
        }

        self.scene.update(self.prev, event.buttons);
        self.prev = event.buttons;
        self.draw(event.buttons)?;

        if let (Some(recorder), Some(input)) = (self.recorder.as_mut(), self.input.as_ref()) {
            let record = ButtonRecord::new(input.dev_type().tag(), input.vid_pid(), &event, Utc::now());
            if let Err(e) = recorder.record(&record) {
                warn!("Could not record button event: {}", e);
            }
        }
        Ok(Status::Changed(event))
    }

    /// Drop the connection and allow the device to be found again
    fn disconnect(&mut self, now: Instant) {
        if let Some(input) = self.input.take() {
            self.cache.forget(input.location(), input.device_descriptor());
        }
        self.prev = Buttons::default();
        self.scene.reset();
        self.next_scan = Some(now + self.config.usb.rescan_interval());
    }

    fn draw(&mut self, buttons: Buttons) -> Result<()> {
        let display = &self.config.display;
        if display.show_scene {
            if self.scene_drawn {
                write!(self.out, "\x1b[{}A", SCENE_HEIGHT)?;
            }
            writeln!(self.out, "\r{}", self.scene.render().replace('\n', "\n\r"))?;
            self.scene_drawn = true;
        }
        if display.show_bits {
            write!(self.out, "{}", bits_line(buttons))?;
            self.need_newline = true;
        }
        self.out.flush()?;
        Ok(())
    }

    /// End the bits line so log output starts on a fresh line
    fn finish_line(&mut self) -> Result<()> {
        if self.need_newline || self.scene_drawn {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        self.need_newline = false;
        self.scene_drawn = false;
        Ok(())
    }

    /// Finish output and flush the recorder before exit
    pub fn shutdown(&mut self) -> Result<()> {
        self.finish_line()?;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.flush()?;
        }
        Ok(())
    }

    /// Time until the next scan is due, if one is scheduled
    #[must_use]
    pub fn until_next_scan(&self, now: Instant) -> Option<Duration> {
        self.next_scan.map(|at| at.saturating_duration_since(now))
    }
}
