//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; missing values fall back to the
//! defaults below, so an empty file is a valid configuration.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{GamepadTesterError, Result};
use crate::gamepad::buttons::ButtonMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub usb: UsbConfig,
    #[serde(default)]
    pub gamepad: GamepadConfig,
    #[serde(default)]
    pub hid: HidConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// USB transfer timing
#[derive(Debug, Deserialize, Clone)]
pub struct UsbConfig {
    /// Timeout for GET_DESCRIPTOR control transfers
    #[serde(default = "default_control_timeout_ms")]
    pub control_timeout_ms: u64,

    /// Timeout for one interrupt IN read while polling
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Delay between bus scans while no gamepad is connected
    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,

    /// Stale reports discarded right after connecting to an XInput gamepad
    #[serde(default = "default_drain_reads")]
    pub drain_reads: u32,

    /// Poll interval used when the endpoint descriptor gives none
    #[serde(default = "default_poll_interval_ms")]
    pub default_poll_interval_ms: u8,
}

/// Gamepad selection
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    /// Player number shown on the XInput LED ring (1-4)
    #[serde(default = "default_player")]
    pub player: u8,

    /// Only connect to devices with this vendor ID
    #[serde(default)]
    pub vendor_id: Option<u16>,

    /// Only connect to devices with this product ID
    #[serde(default)]
    pub product_id: Option<u16>,
}

/// Generic HID gamepad settings
#[derive(Debug, Deserialize, Clone)]
pub struct HidConfig {
    /// Button name for each HID button number, starting at button 1
    #[serde(default = "default_button_map")]
    pub button_map: Vec<String>,
}

/// Terminal output
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_bits: bool,

    #[serde(default = "default_true")]
    pub show_scene: bool,
}

/// Button event recorder
#[derive(Debug, Deserialize, Clone)]
pub struct RecorderConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Write tracing output to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<String>,
}

// Default value functions
fn default_control_timeout_ms() -> u64 { 300 }
fn default_read_timeout_ms() -> u64 { 8 }
fn default_rescan_interval_ms() -> u64 { 300 }
fn default_drain_reads() -> u32 { 8 }
fn default_poll_interval_ms() -> u8 { 8 }

fn default_player() -> u8 { 1 }

fn default_button_map() -> Vec<String> {
    ["Y", "B", "A", "X", "L", "R", "", "", "SELECT", "START", "L3", "R3", "HOME"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool { true }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            control_timeout_ms: default_control_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            rescan_interval_ms: default_rescan_interval_ms(),
            drain_reads: default_drain_reads(),
            default_poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl UsbConfig {
    #[must_use]
    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            vendor_id: None,
            product_id: None,
        }
    }
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            button_map: default_button_map(),
        }
    }
}

impl HidConfig {
    /// Build the button map from the configured names
    ///
    /// # Errors
    ///
    /// Returns `Config` error for an unknown button name
    pub fn button_map(&self) -> Result<ButtonMap> {
        ButtonMap::from_names(&self.button_map)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_bits: default_true(),
            show_scene: default_true(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gamepad_tester::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate USB timing
        if self.usb.control_timeout_ms == 0 || self.usb.control_timeout_ms > 5000 {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("control_timeout_ms must be between 1 and 5000")
            ));
        }

        if self.usb.read_timeout_ms == 0 || self.usb.read_timeout_ms > 1000 {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("read_timeout_ms must be between 1 and 1000")
            ));
        }

        if self.usb.rescan_interval_ms == 0 || self.usb.rescan_interval_ms > 60000 {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("rescan_interval_ms must be between 1 and 60000")
            ));
        }

        if self.usb.drain_reads > 64 {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("drain_reads must be at most 64")
            ));
        }

        if self.usb.default_poll_interval_ms == 0 {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("default_poll_interval_ms must be between 1 and 255")
            ));
        }

        // Validate gamepad selection
        if !(1..=4).contains(&self.gamepad.player) {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("player must be between 1 and 4")
            ));
        }

        // Validate button names
        self.hid.button_map()?;

        // Validate recorder configuration
        if self.recorder.enabled && self.recorder.log_dir.is_empty() {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("recorder log_dir cannot be empty when enabled")
            ));
        }

        if self.recorder.max_records_per_file == 0 {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0")
            ));
        }

        if self.recorder.max_files_to_keep == 0 {
            return Err(GamepadTesterError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0")
            ));
        }

        if let Some(path) = &self.logging.log_file {
            if path.is_empty() {
                return Err(GamepadTesterError::Config(
                    toml::de::Error::custom("log_file cannot be empty")
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_str(toml_content: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.usb.control_timeout(), Duration::from_millis(300));
        assert_eq!(config.usb.read_timeout(), Duration::from_millis(8));
        assert_eq!(config.usb.rescan_interval(), Duration::from_millis(300));
        assert!(!config.recorder.enabled);
        assert!(config.logging.log_file.is_none());
    }

    #[test]
    fn test_load_empty_file() {
        let config = load_str("").unwrap();
        assert_eq!(config.gamepad.player, 1);
        assert_eq!(config.usb.drain_reads, 8);
        assert_eq!(config.hid.button_map.len(), 13);
        assert!(config.display.show_bits);
        assert!(config.display.show_scene);
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[usb]
read_timeout_ms = 16

[gamepad]
player = 3
vendor_id = 0x045e
product_id = 0x028e

[hid]
button_map = ["B", "A", "", "Y", "X"]

[display]
show_scene = false

[recorder]
enabled = true
log_dir = "/tmp/gamepad-logs"
max_files_to_keep = 3

[logging]
log_file = "tester.log"
"#;

        let config = load_str(toml_content).unwrap();
        assert_eq!(config.usb.read_timeout_ms, 16);
        assert_eq!(config.usb.control_timeout_ms, 300);
        assert_eq!(config.gamepad.player, 3);
        assert_eq!(config.gamepad.vendor_id, Some(0x045e));
        assert_eq!(config.gamepad.product_id, Some(0x028e));
        assert_eq!(config.hid.button_map().unwrap().len(), 5);
        assert!(config.display.show_bits);
        assert!(!config.display.show_scene);
        assert!(config.recorder.enabled);
        assert_eq!(config.recorder.max_files_to_keep, 3);
        assert_eq!(config.recorder.max_records_per_file, 10000);
        assert_eq!(config.logging.log_file.as_deref(), Some("tester.log"));
    }

    #[test]
    fn test_load_missing_file() {
        match Config::load("/nonexistent/gamepad-tester.toml") {
            Err(GamepadTesterError::Io(_)) => {}
            other => panic!("Expected Io error, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_invalid_toml() {
        match load_str("[usb\nread_timeout_ms = ") {
            Err(GamepadTesterError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_player() {
        for player in [0, 5] {
            let mut config = Config::default();
            config.gamepad.player = player;
            assert!(config.validate().is_err(), "player {} should be invalid", player);
        }
    }

    #[test]
    fn test_valid_players() {
        for player in 1..=4 {
            let mut config = Config::default();
            config.gamepad.player = player;
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_unknown_button_name() {
        let result = load_str("[hid]\nbutton_map = [\"A\", \"TURBO\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_control_timeout_out_of_range() {
        let mut config = Config::default();
        config.usb.control_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.usb.control_timeout_ms = 5001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_timeout_out_of_range() {
        let mut config = Config::default();
        config.usb.read_timeout_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rescan_interval_zero() {
        let mut config = Config::default();
        config.usb.rescan_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_drain_reads_too_high() {
        let mut config = Config::default();
        config.usb.drain_reads = 65;
        assert!(config.validate().is_err());
        config.usb.drain_reads = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_poll_interval_zero() {
        let mut config = Config::default();
        config.usb.default_poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recorder_empty_log_dir() {
        let mut config = Config::default();
        config.recorder.log_dir = String::new();
        // Only checked when the recorder is on
        assert!(config.validate().is_ok());
        config.recorder.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recorder_file_limits() {
        let mut config = Config::default();
        config.recorder.max_records_per_file = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.recorder.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_file() {
        let mut config = Config::default();
        config.logging.log_file = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_control_timeout_ms(), 300);
        assert_eq!(default_read_timeout_ms(), 8);
        assert_eq!(default_rescan_interval_ms(), 300);
        assert_eq!(default_drain_reads(), 8);
        assert_eq!(default_poll_interval_ms(), 8);
        assert_eq!(default_player(), 1);
        assert_eq!(default_button_map()[0], "Y");
        assert_eq!(default_button_map()[12], "HOME");
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
    }
}
