// SPDX-License-Identifier: GPL-3.0-only

//! Error types for capability discovery and negotiation
//!
//! Probe failures degrade to an empty capability map inside negotiation;
//! only [`V4l2Ctl::try_probe`](crate::backends::camera::V4l2Ctl::try_probe)
//! hands them out, for the CLI to report. The remaining variants surface
//! where a caller can act on them, e.g. an unwritable settings file.

use std::fmt;
use std::time::Duration;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Device query errors
    Probe(ProbeError),
    /// Configuration errors
    Config(String),
    /// Preference store read/write errors
    Storage(String),
    /// Command channel delivery errors
    Sink(String),
}

/// External tool invocation errors
#[derive(Debug, Clone)]
pub enum ProbeError {
    /// Tool binary or device node missing, or the process could not start
    ToolUnavailable(String),
    /// Tool did not finish before the deadline
    Timeout(Duration),
    /// Tool exited with a failure status
    Failed { code: Option<i32>, stderr: String },
    /// Tool succeeded but printed nothing
    EmptyOutput,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Probe(e) => write!(f, "Probe error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Sink(msg) => write!(f, "Command sink error: {}", msg),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::ToolUnavailable(msg) => write!(f, "Tool unavailable: {}", msg),
            ProbeError::Timeout(after) => write!(f, "Timed out after {} ms", after.as_millis()),
            ProbeError::Failed { code, stderr } => match code {
                Some(code) => write!(f, "Exited with status {}: {}", code, stderr),
                None => write!(f, "Terminated by signal: {}", stderr),
            },
            ProbeError::EmptyOutput => write!(f, "No output"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ProbeError {}

impl From<ProbeError> for AppError {
    fn from(err: ProbeError) -> Self {
        AppError::Probe(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}
