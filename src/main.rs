//! # Gamepad Tester
//!
//! Detect USB gamepads and show their buttons live in the terminal.
//!
//! Plug in a gamepad and press buttons: the tester prints the 16-bit button
//! state and a small picture of a gamepad that lights up as buttons change.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use gamepad_tester::config::Config;
use gamepad_tester::tester::Tester;
use gamepad_tester::usb::RusbHost;

/// Config file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Period of the main loop tick. Polls are throttled further to each
/// gamepad's own interval.
const TICK_MS: u64 = 1;

/// Load the config named on the command line, else the default config file
/// if present, else built-in defaults.
fn load_config(arg: Option<String>) -> Result<Config> {
    let path = match arg {
        Some(path) => PathBuf::from(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => PathBuf::from(DEFAULT_CONFIG_PATH),
        None => return Ok(Config::default()),
    };
    Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Set up tracing. Logs go to stderr so they don't mix into the button
/// display on stdout, or to `logging.log_file` if configured.
///
/// # Returns
///
/// The file writer's guard, which must live until exit so buffered lines
/// are written
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match config.logging.log_file.as_deref() {
        Some(log_file) => {
            let path = Path::new(log_file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().map_or_else(|| log_file.into(), |n| n.to_os_string());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
            None
        }
    }
}

/// Call `step` on every tick until `shutdown` completes.
///
/// `shutdown` is pinned once and polled first on every pass, so a Ctrl+C
/// that arrives while a step is blocked in a USB transfer ends the loop
/// right after that step.
async fn run_until<S, F>(shutdown: S, mut step: F)
where
    S: Future<Output = io::Result<()>>,
    F: FnMut(Instant),
{
    let mut ticker = interval(Duration::from_millis(TICK_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            result = &mut shutdown => {
                match result {
                    Ok(()) => info!("Received Ctrl+C, shutting down..."),
                    Err(e) => error!("Could not listen for Ctrl+C: {}", e),
                }
                break;
            }

            _ = ticker.tick() => {
                let now = Instant::now();
                tokio::task::block_in_place(|| step(now));
            }
        }
    }
}

/// Main entry point for the gamepad tester
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (`gamepad-tester [config.toml]`)
///    - Set up logging
///    - Open libusb
///
/// 2. **Main Loop**
///    - Scan the bus until a gamepad appears, logging other devices once
///    - Poll the gamepad at its endpoint interval and redraw on changes
///    - Go back to scanning when it is unplugged
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C ends the loop
///    - Finish the display line and flush the event recorder
///
/// # Errors
///
/// Returns error if:
/// - The config file cannot be read or is invalid
/// - libusb cannot be initialized
/// - The event recorder directory cannot be created
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO gamepad_tester: Gamepad Tester v0.1.0 starting...
/// INFO gamepad_tester: Looking for USB gamepad...
/// INFO gamepad_tester::gamepad::detect: Found 045e:028e at 001:007: XInput
/// INFO gamepad_tester::tester::session: Connected to XInput gamepad, polling every 4ms
/// button bits: 0010000000000000
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(std::env::args().nth(1))?;
    let _log_guard = init_logging(&config);

    info!("Gamepad Tester v{} starting...", env!("CARGO_PKG_VERSION"));

    let host = RusbHost::new().context("Failed to initialize libusb")?;
    let mut tester = Tester::new(host, config, io::stdout())?;

    info!("Looking for USB gamepad...");
    info!("Press Ctrl+C to exit");

    run_until(tokio::signal::ctrl_c(), |now| {
        if let Err(e) = tester.step(now) {
            error!("Scan failed: {}", e);
        }
    })
    .await;

    tester.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_tick_is_faster_than_any_poll_interval() {
        // USB full speed interrupt endpoints poll at most every 1ms
        assert_eq!(TICK_MS, 1);
    }

    /// Step that blocks like a USB read, counting calls
    fn blocking_step(steps: &mut u32) -> impl FnMut(Instant) + '_ {
        move |_| {
            *steps += 1;
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_during_blocking_step_ends_loop() {
        let mut steps = 0;
        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        };
        tokio::time::timeout(
            Duration::from_secs(2),
            run_until(shutdown, blocking_step(&mut steps)),
        )
        .await
        .expect("loop should stop after the blocked step");
        assert_eq!(steps, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_error_ends_loop() {
        let mut steps = 0;
        let shutdown = async { Err(io::Error::other("no signal driver")) };
        run_until(shutdown, blocking_step(&mut steps)).await;
        assert_eq!(steps, 0);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sigint_during_blocking_step_ends_loop() {
        let mut steps = 0;
        let pid = std::process::id().to_string();
        let step = |_: Instant| {
            steps += 1;
            if steps == 1 {
                let status = std::process::Command::new("kill")
                    .args(["-INT", pid.as_str()])
                    .status()
                    .unwrap();
                assert!(status.success());
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        };
        tokio::time::timeout(
            Duration::from_secs(2),
            run_until(tokio::signal::ctrl_c(), step),
        )
        .await
        .expect("Ctrl+C sent during a step should stop the loop");
        assert_eq!(steps, 1);
    }

    #[test]
    fn test_load_config_from_argument() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tester.toml");
        fs::write(&path, "[gamepad]\nplayer = 3\n").unwrap();

        let config = load_config(Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.gamepad.player, 3);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some("/nonexistent/tester.toml".to_string())).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tester.toml"));
    }

    #[test]
    fn test_default_config_file_is_valid() {
        let config = Config::load(DEFAULT_CONFIG_PATH).unwrap();
        let defaults = Config::default();
        assert_eq!(config.usb.rescan_interval_ms, defaults.usb.rescan_interval_ms);
        assert_eq!(config.hid.button_map, defaults.hid.button_map);
        assert!(!config.recorder.enabled);
    }
}
