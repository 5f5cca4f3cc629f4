//! # Tester Module
//!
//! Everything between a decoded button event and the user.
//!
//! This module handles:
//! - The scan, connect and poll loop ([`session::Tester`])
//! - The gamepad tile scene and the button bits line
//! - Recording button events to JSONL files

pub mod recorder;
pub mod scene;
pub mod session;

pub use recorder::{ButtonRecord, Recorder};
pub use scene::{bits_line, Scene};
pub use session::{Status, Tester};
