//! Per-run structured logging.
//!
//! Process-wide diagnostics go through the `log` crate (wired up in
//! `main.rs` via `env_logger`), but every simulation or tuning worker also
//! writes its own `InMemorySim.log` into its workspace directory, so a run
//! can be inspected in isolation after the fact. This mirrors the
//! teacher's background log-collector thread: callers send records down a
//! channel and a dedicated thread owns the file handle.

use crossbeam_channel::{Receiver, Sender};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

struct Record {
    level: Level,
    message: String,
}

/// A handle to a background thread appending records to a single log
/// file. Cloning the handle is cheap -- it just clones the sending end of
/// the channel, so many parts of a simulation can log concurrently.
#[derive(Clone)]
pub struct SimulationLogger {
    sender: Sender<Record>,
}

pub struct SimulationLoggerHandle {
    join_handle: Option<JoinHandle<()>>,
}

impl SimulationLogger {
    /// Spawn the writer thread for `path` (created/truncated on start).
    /// Returns the logger handle plus a join handle that flushes and
    /// closes the file once every clone of the sender has been dropped.
    pub fn spawn(path: &Path) -> std::io::Result<(SimulationLogger, SimulationLoggerHandle)> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver): (Sender<Record>, Receiver<Record>) = crossbeam_channel::unbounded();

        let join_handle = thread::spawn(move || {
            while let Ok(record) = receiver.recv() {
                let _ = writeln!(file, "{} - {}", record.level.as_str(), record.message);
            }
            let _ = file.flush();
        });

        Ok((
            SimulationLogger { sender },
            SimulationLoggerHandle { join_handle: Some(join_handle) },
        ))
    }

    pub fn info(&self, message: impl Into<String>) {
        let _ = self.sender.send(Record { level: Level::Info, message: message.into() });
    }

    pub fn warn(&self, message: impl Into<String>) {
        let _ = self.sender.send(Record { level: Level::Warn, message: message.into() });
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.sender.send(Record { level: Level::Error, message: message.into() });
    }
}

impl Drop for SimulationLoggerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn writes_records_to_file_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("InMemorySim.log");
        let (logger, handle) = SimulationLogger::spawn(&path).unwrap();

        logger.info("starting simulation");
        logger.warn("window not yet full");
        drop(logger);
        drop(handle);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines, vec!["INFO - starting simulation", "WARN - window not yet full"]);
    }
}
