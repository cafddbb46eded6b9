//! Action Logger - persists bus traffic to a JSONL file
//!
//! The ActionLogger taps the ActionBus and appends every action, with
//! a UTC timestamp, to a single JSONL file for debugging and replay.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::bus::{ActionBus, ActionFilter};
use crate::action::Action;

/// One line of the action log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub action: Action,
}

impl ActionLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(action: Action) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
        }
    }
}

/// Action logger that appends actions to a JSONL file
pub struct ActionLogger {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl ActionLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "ActionLogger::new: creating logger");
        Self { path, writer: None }
    }

    /// Append one action to the log file
    pub fn write_action(&mut self, action: &Action) -> eyre::Result<()> {
        debug!(action_type = %action.action_type, "ActionLogger::write_action");

        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.open()?,
        };
        let writer = self.writer.insert(writer);

        let entry = ActionLogEntry::new(action.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    fn open(&self) -> std::io::Result<BufWriter<File>> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        debug!(path = ?self.path, "ActionLogger: opening log file");
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(BufWriter::new(file))
    }

    /// Run the logger until the bus closes
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Action>) {
        debug!("ActionLogger::run: starting action logger");

        while let Some(action) = rx.recv().await {
            if let Err(e) = self.write_action(&action) {
                error!(action_type = %action.action_type, error = %e, "ActionLogger: failed to write action");
            }
        }
        debug!("ActionLogger: bus closed, shutting down");

        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

/// Read every entry of an action log
pub fn read_action_log(path: impl AsRef<Path>) -> eyre::Result<Vec<ActionLogEntry>> {
    let path = path.as_ref();
    debug!(?path, "read_action_log: reading log file");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ActionLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_action_log: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_action_log: loaded entries");
    Ok(entries)
}

/// Spawn the action logger as a background task
///
/// The tap is taken before spawning, so nothing published after this call
/// returns is missed.
pub fn spawn_action_logger(bus: &ActionBus, path: impl AsRef<Path>) -> tokio::task::JoinHandle<()> {
    let rx = bus.tap(ActionFilter::All);
    let logger = ActionLogger::new(path);
    tokio::spawn(logger.run(rx))
}
