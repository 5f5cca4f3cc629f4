//! # Button Event Recorder
//!
//! Writes one JSON object per button change to rotating JSONL files.
//!
//! Files are named `buttons_<YYYYMMDD_HHMMSS>_<seq>.jsonl` after the time of
//! their first record, so sorting by name sorts by age. A new file is started
//! after `max_records_per_file` records, and only the newest
//! `max_files_to_keep` files are kept.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RecorderConfig;
use crate::error::Result;
use crate::gamepad::InputEvent;

const FILE_PREFIX: &str = "buttons_";
const FILE_SUFFIX: &str = ".jsonl";

/// One button change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonRecord {
    pub timestamp: DateTime<Utc>,
    /// Device type tag, e.g. "XInput"
    pub device: String,
    pub vid: u16,
    pub pid: u16,
    pub buttons: u16,
    pub diff: u16,
    pub pressed: Vec<String>,
}

impl ButtonRecord {
    #[must_use]
    pub fn new(tag: &str, vid_pid: (u16, u16), event: &InputEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            device: tag.to_string(),
            vid: vid_pid.0,
            pid: vid_pid.1,
            buttons: event.buttons.bits(),
            diff: event.diff.bits(),
            pressed: event
                .buttons
                .pressed_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Rotating JSONL writer
pub struct Recorder {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    file_seq: u64,
}

impl Recorder {
    /// Create the log directory if needed. No file is opened until the first
    /// record arrives.
    ///
    /// # Errors
    ///
    /// Returns `Io` error if the directory cannot be created
    pub fn new(config: &RecorderConfig) -> Result<Self> {
        let log_dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&log_dir)?;
        info!("Recording button events to {}", log_dir.display());
        Ok(Self {
            log_dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Append a record, rotating first if the current file is full.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json` errors from writing the record
    pub fn record(&mut self, record: &ButtonRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate(record.timestamp)?;
        }
        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Flush buffered records to disk
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// File currently being written, if any
    #[must_use]
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.flush()?;
        let name = format!(
            "{}{}_{:04}{}",
            FILE_PREFIX,
            now.format("%Y%m%d_%H%M%S"),
            self.file_seq,
            FILE_SUFFIX
        );
        self.file_seq += 1;
        let path = self.log_dir.join(name);
        debug!("Opening event log {}", path.display());
        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.current_path = Some(path);
        self.records_in_file = 0;
        self.prune()
    }

    /// Delete the oldest event logs beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
            })
            .collect();
        files.sort();

        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old event log {}", path.display()),
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Could not flush event log: {}", e);
        }
    }
}
