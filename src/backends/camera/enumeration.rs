// SPDX-License-Identifier: GPL-3.0-only

//! Capture device enumeration
//!
//! Scans the device directory for `video*` nodes, skips our own virtual
//! output and metadata-only nodes, and labels each with the best name we
//! can find. Enumeration itself never fails: with nothing found, a single
//! default device is returned so callers always have a candidate.

use super::probe::V4l2Ctl;
use super::types::CameraDevice;
use super::v4l2_utils;
use crate::config::Config;
use crate::constants::defaults;
use std::path::Path;
use tracing::{debug, info};

/// Placeholder label for a device whose name could not be looked up
pub fn placeholder_name(path: &str) -> String {
    format!("Camera ({})", path)
}

/// Whether a directory entry name looks like a V4L2 video node (`video<N>`)
fn is_video_node(name: &str) -> bool {
    name.strip_prefix("video")
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Candidate node paths, sorted, excluding the virtual output
fn scan_nodes(device_dir: &Path, virtual_device: &str) -> Vec<(String, String)> {
    let entries = match std::fs::read_dir(device_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %device_dir.display(), error = %e, "Cannot read device directory");
            return Vec::new();
        }
    };

    let mut nodes: Vec<(String, String)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_video_node(&name) {
                return None;
            }
            let path = entry.path().to_string_lossy().to_string();
            if path == virtual_device {
                debug!(path = %path, "Skipping virtual output device");
                return None;
            }
            Some((path, name))
        })
        .collect();

    nodes.sort();
    nodes
}

/// `VIDIOC_QUERYCAP` on the blocking pool
async fn query_node_caps(path: &str) -> Option<v4l2_utils::NodeCaps> {
    let path = path.to_string();
    match tokio::task::spawn_blocking(move || v4l2_utils::query_node_caps(&path)).await {
        Ok(caps) => caps,
        Err(e) => {
            debug!(error = %e, "Capability query task failed");
            None
        }
    }
}

/// Enumerate capture devices
pub async fn enumerate_cameras(config: &Config) -> Vec<CameraDevice> {
    let ctl = V4l2Ctl::from_config(config);
    let mut cameras = Vec::new();

    for (path, node) in scan_nodes(&config.device_dir, &config.virtual_device) {
        let caps = query_node_caps(&path).await;

        // Unqueryable nodes (permissions, not a real device) are kept
        if let Some(caps) = &caps
            && !caps.is_video_capture()
        {
            debug!(path = %path, driver = %caps.driver, "Skipping non-capture node");
            continue;
        }

        let name = match ctl.card_name(&path).await {
            Some(name) => name,
            None => caps
                .map(|caps| caps.card)
                .filter(|card| !card.is_empty())
                .or_else(|| v4l2_utils::sysfs_name(&config.sysfs_dir, &node))
                .unwrap_or_else(|| placeholder_name(&path)),
        };

        debug!(path = %path, name = %name, "Found capture device");
        cameras.push(CameraDevice { path, name });
    }

    if cameras.is_empty() {
        info!("No capture devices found; offering default device");
        cameras.push(CameraDevice {
            path: defaults::DEVICE_PATH.to_string(),
            name: defaults::DEVICE_NAME.to_string(),
        });
    }

    cameras
}
