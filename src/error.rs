//! # Error Types
//!
//! Custom error types for the gamepad tester using `thiserror`.

use thiserror::Error;

/// Main error type for the gamepad tester
#[derive(Debug, Error)]
pub enum GamepadTesterError {
    /// Malformed USB descriptor
    #[error("Descriptor error: {0}")]
    Descriptor(String),

    /// Malformed HID report descriptor
    #[error("HID report descriptor error: {0}")]
    HidReport(String),

    /// libusb errors other than timeouts
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// USB transfer timed out (normal while a gamepad is idle)
    #[error("USB transfer timed out")]
    UsbTimeout,

    /// Player number outside 1..=4
    #[error("Player number must be in range 1..4, got {0}")]
    InvalidPlayer(u8),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event record serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GamepadTesterError {
    /// True for errors that only mean "nothing arrived in time".
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::UsbTimeout)
    }
}

/// Result type alias for the gamepad tester
pub type Result<T> = std::result::Result<T, GamepadTesterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_timeout() {
        assert!(GamepadTesterError::UsbTimeout.is_timeout());
        assert!(!GamepadTesterError::Usb(rusb::Error::NoDevice).is_timeout());
    }

    #[test]
    fn test_error_messages() {
        let err = GamepadTesterError::InvalidPlayer(7);
        assert_eq!(err.to_string(), "Player number must be in range 1..4, got 7");

        let err = GamepadTesterError::Descriptor("Bad endpoint descriptor".to_string());
        assert_eq!(err.to_string(), "Descriptor error: Bad endpoint descriptor");
    }
}
