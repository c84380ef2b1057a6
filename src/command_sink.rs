// SPDX-License-Identifier: GPL-3.0-only

//! Line-oriented command channel to the rendering server
//!
//! The server reads newline-terminated commands from a named pipe. Delivery
//! is best-effort: if nobody is listening the command is dropped, and the
//! next state change supersedes it anyway.

use crate::backends::camera::types::Resolution;
use crate::errors::{AppError, AppResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings change announced to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `RESOLUTION:<WxH>`
    Resolution(Resolution),
    /// `FPS:<n>`
    Fps(u32),
    /// `DEVICE:<path>`
    Device(String),
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Resolution(resolution) => write!(f, "RESOLUTION:{}", resolution),
            Command::Fps(fps) => write!(f, "FPS:{}", fps),
            Command::Device(path) => write!(f, "DEVICE:{}", path),
        }
    }
}

/// Destination for commands
pub trait CommandSink: Send + Sync {
    fn send(&self, command: &Command) -> AppResult<()>;
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn send(&self, command: &Command) -> AppResult<()> {
        (**self).send(command)
    }
}

/// Writes commands to a named pipe without ever blocking
///
/// The pipe is opened per command with `O_NONBLOCK`, so a server that is not
/// running makes `send` fail immediately instead of hanging.
#[derive(Debug, Clone)]
pub struct FifoSink {
    path: PathBuf,
}

impl FifoSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandSink for FifoSink {
    fn send(&self, command: &Command) -> AppResult<()> {
        let line = format!("{}\n", command);

        let mut pipe = OpenOptions::new()
            .append(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| AppError::Sink(format!("{}: {}", self.path.display(), e)))?;

        pipe.write_all(line.as_bytes())
            .map_err(|e| AppError::Sink(format!("{}: {}", self.path.display(), e)))?;

        debug!(pipe = %self.path.display(), command = %command, "Sent command");
        Ok(())
    }
}

/// Discards every command
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl CommandSink for NullSink {
    fn send(&self, _command: &Command) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    #[test]
    fn test_command_wire_format() {
        assert_eq!(
            Command::Resolution(Resolution::new(1280, 720)).to_string(),
            "RESOLUTION:1280x720"
        );
        assert_eq!(Command::Fps(30).to_string(), "FPS:30");
        assert_eq!(
            Command::Device("/dev/video2".to_string()).to_string(),
            "DEVICE:/dev/video2"
        );
    }

    #[test]
    fn test_fifo_sink_appends_lines() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sink = FifoSink::new(file.path());

        sink.send(&Command::Fps(60)).unwrap();
        sink.send(&Command::Device("/dev/video0".to_string())).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "FPS:60\nDEVICE:/dev/video0\n");
    }

    #[test]
    fn test_fifo_sink_missing_pipe_is_error() {
        let sink = FifoSink::new("/nonexistent/camcaps/cmd.pipe");
        assert!(matches!(sink.send(&Command::Fps(30)), Err(AppError::Sink(_))));
    }

    #[test]
    fn test_fifo_without_reader_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.pipe");
        let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);

        let sink = FifoSink::new(&path);
        assert!(sink.send(&Command::Fps(30)).is_err());
    }
}
