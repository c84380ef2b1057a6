// SPDX-License-Identifier: GPL-3.0-only

//! External format-query tool invocation
//!
//! Every call runs under a deadline and the child is killed when it passes.
//! Failures are reported as [`ProbeError`] internally but never reach the
//! negotiation layer: [`V4l2Ctl::probe`] turns them into an empty map.

use super::capabilities::{ParserConfig, parse_capabilities};
use super::types::CapabilityMap;
use crate::config::Config;
use crate::constants::tool;
use crate::errors::{AppResult, ProbeError};
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Source of raw capability text for a device
///
/// Implemented by [`V4l2Ctl`]; tests substitute canned output.
pub trait CapabilitySource: Send + Sync {
    /// Raw `--list-formats-ext` style text, or `None` when unavailable
    fn query_formats(&self, device_path: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Run `<tool> -d <device> <arg>` and return its stdout
pub async fn run_tool(
    program: &str,
    device_path: &str,
    arg: &str,
    deadline: Duration,
) -> Result<String, ProbeError> {
    if !Path::new(device_path).exists() {
        return Err(ProbeError::ToolUnavailable(format!(
            "device {} not found",
            device_path
        )));
    }

    let child = Command::new(program)
        .args(["-d", device_path, arg])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ProbeError::ToolUnavailable(format!("{}: {}", program, e)))?;

    // Dropping the wait future on timeout drops the child, which kills it
    let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| ProbeError::ToolUnavailable(e.to_string()))?,
        Err(_) => return Err(ProbeError::Timeout(deadline)),
    };

    if !output.status.success() {
        return Err(ProbeError::Failed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(ProbeError::EmptyOutput);
    }
    Ok(stdout)
}

/// Extract the `Card type` field from `--info` output
pub fn parse_card_type(info: &str) -> Option<String> {
    info.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "Card type")
        .map(|(_, value)| value.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// `v4l2-ctl` front end
#[derive(Debug, Clone)]
pub struct V4l2Ctl {
    program: String,
    probe_timeout: Duration,
    info_timeout: Duration,
}

impl Default for V4l2Ctl {
    fn default() -> Self {
        Self {
            program: tool::NAME.to_string(),
            probe_timeout: tool::PROBE_TIMEOUT,
            info_timeout: tool::INFO_TIMEOUT,
        }
    }
}

impl V4l2Ctl {
    pub fn new(program: impl Into<String>, probe_timeout: Duration, info_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            probe_timeout,
            info_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tool.clone(),
            config.probe_timeout(),
            config.info_timeout(),
        )
    }

    /// Raw format listing for a device
    pub async fn list_formats(&self, device_path: &str) -> Result<String, ProbeError> {
        run_tool(
            &self.program,
            device_path,
            tool::LIST_FORMATS_ARG,
            self.probe_timeout,
        )
        .await
    }

    /// Card name from `--info`, if the tool can provide one
    pub async fn card_name(&self, device_path: &str) -> Option<String> {
        match run_tool(&self.program, device_path, tool::INFO_ARG, self.info_timeout).await {
            Ok(info) => parse_card_type(&info),
            Err(e) => {
                debug!(device_path, error = %e, "Device info unavailable");
                None
            }
        }
    }

    /// Probe and parse, reporting why the tool gave nothing
    pub async fn try_probe(&self, device_path: &str, parser: &ParserConfig) -> AppResult<CapabilityMap> {
        let text = self.list_formats(device_path).await?;
        Ok(parse_capabilities(&text, parser))
    }

    /// Probe and parse; any failure yields an empty map
    pub async fn probe(&self, device_path: &str, parser: &ParserConfig) -> CapabilityMap {
        match self.try_probe(device_path, parser).await {
            Ok(map) => map,
            Err(e) => {
                warn!(device_path, tool = %self.program, error = %e, "Format query failed; capabilities unknown");
                CapabilityMap::new()
            }
        }
    }
}

impl CapabilitySource for V4l2Ctl {
    async fn query_formats(&self, device_path: &str) -> Option<String> {
        match self.list_formats(device_path).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(device_path, tool = %self.program, error = %e, "Format query failed; capabilities unknown");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_card_type() {
        let info = "Driver Info:\n\tDriver name      : uvcvideo\n\tCard type        : Integrated Camera: Integrated C\n\tBus info         : usb-0000:00:14.0-8\n";
        assert_eq!(
            parse_card_type(info),
            Some("Integrated Camera: Integrated C".to_string())
        );
        assert_eq!(parse_card_type("Driver name : uvcvideo"), None);
        assert_eq!(parse_card_type("Card type :   "), None);
    }

    #[tokio::test]
    async fn test_missing_device_is_tool_unavailable() {
        let result = run_tool(
            "v4l2-ctl",
            "/nonexistent/video99",
            tool::LIST_FORMATS_ARG,
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::ToolUnavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_unavailable() {
        let device = tempfile::NamedTempFile::new().unwrap();
        let result = run_tool(
            "camcaps-no-such-tool",
            device.path().to_str().unwrap(),
            tool::LIST_FORMATS_ARG,
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::ToolUnavailable(_))));
    }

    /// Executable shell script standing in for the format tool
    fn script_tool(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-v4l2-ctl");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let device = tempfile::NamedTempFile::new().unwrap();
        let device = device.path().to_str().unwrap();
        let program = script_tool(dir.path(), "sleep 5");
        let deadline = Duration::from_millis(200);

        let started = std::time::Instant::now();
        let result = run_tool(&program, device, tool::LIST_FORMATS_ARG, deadline).await;
        assert!(matches!(result, Err(ProbeError::Timeout(d)) if d == deadline));
        assert!(started.elapsed() < Duration::from_secs(2));

        let ctl = V4l2Ctl::new(program, deadline, deadline);
        assert!(ctl.probe(device, &ParserConfig::default()).await.is_empty());
        assert_eq!(ctl.query_formats(device).await, None);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let device = tempfile::NamedTempFile::new().unwrap();
        let program = script_tool(dir.path(), "echo 'Cannot open device' >&2\nexit 3");

        let result = run_tool(
            &program,
            device.path().to_str().unwrap(),
            tool::LIST_FORMATS_ARG,
            Duration::from_secs(5),
        )
        .await;
        match result {
            Err(ProbeError::Failed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "Cannot open device");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_tool_is_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let device = tempfile::NamedTempFile::new().unwrap();
        let program = script_tool(dir.path(), "true");

        let result = run_tool(
            &program,
            device.path().to_str().unwrap(),
            tool::LIST_FORMATS_ARG,
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::EmptyOutput)));
    }

    #[tokio::test]
    async fn test_script_tool_output_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let device = tempfile::NamedTempFile::new().unwrap();
        let program = script_tool(
            dir.path(),
            "printf 'Size: Discrete 640x480\\n(30.000 fps)\\n'",
        );
        let ctl = V4l2Ctl::new(program, Duration::from_secs(5), Duration::from_secs(5));

        let map = ctl
            .try_probe(device.path().to_str().unwrap(), &ParserConfig::default())
            .await
            .unwrap();
        assert_eq!(
            map.framerates(&crate::backends::camera::types::Resolution::new(640, 480)),
            Some(&[30][..])
        );
    }

    #[tokio::test]
    async fn test_tool_failure_surfaces_as_app_error() {
        let device = tempfile::NamedTempFile::new().unwrap();
        let ctl = V4l2Ctl::new(
            "camcaps-no-such-tool",
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        let result = ctl
            .try_probe(device.path().to_str().unwrap(), &ParserConfig::default())
            .await;
        assert!(matches!(
            result,
            Err(crate::errors::AppError::Probe(ProbeError::ToolUnavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_failed_probe_yields_empty_map() {
        let device = tempfile::NamedTempFile::new().unwrap();
        let ctl = V4l2Ctl::new(
            "camcaps-no-such-tool",
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        let map = ctl
            .probe(device.path().to_str().unwrap(), &ParserConfig::default())
            .await;
        assert!(map.is_empty());
    }
}
