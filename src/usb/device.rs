//! Trait abstraction for USB host operations to enable testing

use std::time::Duration;

use rusb::UsbContext;
use tracing::debug;

use crate::error::{GamepadTesterError, Result};

/// Operations the tester needs from one USB device
#[cfg_attr(test, mockall::automock)]
pub trait UsbDevice {
    /// (bus number, device address)
    fn location(&self) -> (u8, u8);

    /// Control IN transfer; returns the number of bytes read
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize>;

    /// Interrupt IN transfer; returns the number of bytes read
    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Interrupt OUT transfer; returns the number of bytes written
    fn write_interrupt(&self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize>;

    fn kernel_driver_active(&self, interface: u8) -> Result<bool>;

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<()>;

    fn set_configuration(&mut self, configuration: u8) -> Result<()>;

    fn claim_interface(&mut self, interface: u8) -> Result<()>;
}

/// Source of USB devices (the bus)
pub trait UsbHost {
    type Device: UsbDevice;

    /// Open every device currently attached. Devices that cannot be opened
    /// (permissions, hubs) are skipped.
    fn devices(&self) -> Result<Vec<Self::Device>>;
}

/// Map libusb errors, keeping timeouts distinguishable
fn map_rusb(e: rusb::Error) -> GamepadTesterError {
    match e {
        rusb::Error::Timeout => GamepadTesterError::UsbTimeout,
        other => GamepadTesterError::Usb(other),
    }
}

/// libusb-backed host
pub struct RusbHost {
    context: rusb::Context,
}

impl RusbHost {
    pub fn new() -> Result<Self> {
        Ok(Self {
            context: rusb::Context::new()?,
        })
    }
}

impl UsbHost for RusbHost {
    type Device = RusbDevice;

    fn devices(&self) -> Result<Vec<RusbDevice>> {
        let list = self.context.devices()?;
        let mut opened = Vec::new();
        for device in list.iter() {
            let location = (device.bus_number(), device.address());
            match device.open() {
                Ok(handle) => opened.push(RusbDevice { handle, location }),
                Err(e) => {
                    debug!("Could not open USB device {:03}:{:03}: {}", location.0, location.1, e);
                }
            }
        }
        Ok(opened)
    }
}

/// Wrapper around an open rusb handle that implements UsbDevice
pub struct RusbDevice {
    handle: rusb::DeviceHandle<rusb::Context>,
    location: (u8, u8),
}

impl std::fmt::Debug for RusbDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusbDevice")
            .field("bus", &self.location.0)
            .field("address", &self.location.1)
            .finish_non_exhaustive()
    }
}

impl UsbDevice for RusbDevice {
    fn location(&self) -> (u8, u8) {
        self.location
    }

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        self.handle
            .read_control(request_type, request, value, index, buf, timeout)
            .map_err(map_rusb)
    }

    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.handle
            .read_interrupt(endpoint, buf, timeout)
            .map_err(map_rusb)
    }

    fn write_interrupt(&self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize> {
        self.handle
            .write_interrupt(endpoint, data, timeout)
            .map_err(map_rusb)
    }

    fn kernel_driver_active(&self, interface: u8) -> Result<bool> {
        match self.handle.kernel_driver_active(interface) {
            // Platforms without kernel drivers (or libusb builds without the
            // capability) report NotSupported
            Err(rusb::Error::NotSupported) => Ok(false),
            other => other.map_err(map_rusb),
        }
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<()> {
        self.handle
            .detach_kernel_driver(interface)
            .map_err(map_rusb)
    }

    fn set_configuration(&mut self, configuration: u8) -> Result<()> {
        match self.handle.set_active_configuration(configuration) {
            // Already configured and in use by us
            Err(rusb::Error::Busy) => Ok(()),
            other => other.map_err(map_rusb),
        }
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        self.handle.claim_interface(interface).map_err(map_rusb)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;

    /// Outcome of one queued interrupt read
    #[derive(Debug, Clone)]
    pub enum ReadOutcome {
        Data(Vec<u8>),
        Timeout,
        Disconnected,
    }

    /// Fake USB device serving canned descriptors and queued interrupt reads
    #[derive(Debug, Clone)]
    pub struct FakeDevice {
        pub location: (u8, u8),
        /// (wValue, wIndex) -> descriptor bytes
        pub descriptors: HashMap<(u16, u16), Vec<u8>>,
        pub reads: Rc<RefCell<VecDeque<ReadOutcome>>>,
        pub read_endpoints: Rc<RefCell<Vec<u8>>>,
        pub written: Rc<RefCell<Vec<(u8, Vec<u8>)>>>,
        pub kernel_driver: Rc<RefCell<bool>>,
        pub claimed: Rc<RefCell<Vec<u8>>>,
        pub configuration: Rc<RefCell<Option<u8>>>,
        pub control_error: bool,
    }

    impl FakeDevice {
        pub fn new(location: (u8, u8)) -> Self {
            Self {
                location,
                descriptors: HashMap::new(),
                reads: Rc::new(RefCell::new(VecDeque::new())),
                read_endpoints: Rc::new(RefCell::new(Vec::new())),
                written: Rc::new(RefCell::new(Vec::new())),
                kernel_driver: Rc::new(RefCell::new(false)),
                claimed: Rc::new(RefCell::new(Vec::new())),
                configuration: Rc::new(RefCell::new(None)),
                control_error: false,
            }
        }

        pub fn with_descriptor(mut self, value: u16, index: u16, data: Vec<u8>) -> Self {
            self.descriptors.insert((value, index), data);
            self
        }

        pub fn queue_read(&self, outcome: ReadOutcome) {
            self.reads.borrow_mut().push_back(outcome);
        }

        pub fn get_written_data(&self) -> Vec<(u8, Vec<u8>)> {
            self.written.borrow().clone()
        }
    }

    impl UsbDevice for FakeDevice {
        fn location(&self) -> (u8, u8) {
            self.location
        }

        fn read_control(
            &self,
            _request_type: u8,
            _request: u8,
            value: u16,
            index: u16,
            buf: &mut [u8],
            _timeout: Duration,
        ) -> Result<usize> {
            if self.control_error {
                return Err(GamepadTesterError::Usb(rusb::Error::Pipe));
            }
            let data = self
                .descriptors
                .get(&(value, index))
                .ok_or(GamepadTesterError::Usb(rusb::Error::Pipe))?;
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            Ok(n)
        }

        fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            self.read_endpoints.borrow_mut().push(endpoint);
            match self.reads.borrow_mut().pop_front() {
                Some(ReadOutcome::Data(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(ReadOutcome::Disconnected) => Err(GamepadTesterError::Usb(rusb::Error::NoDevice)),
                Some(ReadOutcome::Timeout) | None => Err(GamepadTesterError::UsbTimeout),
            }
        }

        fn write_interrupt(&self, endpoint: u8, data: &[u8], _timeout: Duration) -> Result<usize> {
            self.written.borrow_mut().push((endpoint, data.to_vec()));
            Ok(data.len())
        }

        fn kernel_driver_active(&self, _interface: u8) -> Result<bool> {
            Ok(*self.kernel_driver.borrow())
        }

        fn detach_kernel_driver(&mut self, _interface: u8) -> Result<()> {
            *self.kernel_driver.borrow_mut() = false;
            Ok(())
        }

        fn set_configuration(&mut self, configuration: u8) -> Result<()> {
            *self.configuration.borrow_mut() = Some(configuration);
            Ok(())
        }

        fn claim_interface(&mut self, interface: u8) -> Result<()> {
            self.claimed.borrow_mut().push(interface);
            Ok(())
        }
    }

    /// Fake bus holding a fixed list of devices
    pub struct FakeHost {
        pub devices: Vec<FakeDevice>,
    }

    impl UsbHost for FakeHost {
        type Device = FakeDevice;

        fn devices(&self) -> Result<Vec<FakeDevice>> {
            Ok(self.devices.clone())
        }
    }
}
