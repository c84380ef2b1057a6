// SPDX-License-Identifier: GPL-3.0-only

//! Shared V4L2 utility functions
//!
//! Direct ioctl and sysfs lookups used by device enumeration when the
//! external tool is missing or a node needs classifying.

use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use tracing::debug;

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

/// Single-planar video capture
const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
/// Multi-planar video capture
const V4L2_CAP_VIDEO_CAPTURE_MPLANE: u32 = 0x0000_1000;
/// `device_caps` field is valid
const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

/// Capabilities reported by a device node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCaps {
    /// Driver name (e.g. "uvcvideo")
    pub driver: String,
    /// Human-readable card name
    pub card: String,
    /// Capabilities of this node (device_caps when the driver reports it)
    pub caps: u32,
}

impl NodeCaps {
    /// Whether frames can be captured from this node
    ///
    /// UVC cameras expose a second node for metadata that fails this check.
    pub fn is_video_capture(&self) -> bool {
        self.caps & (V4L2_CAP_VIDEO_CAPTURE | V4L2_CAP_VIDEO_CAPTURE_MPLANE) != 0
    }
}

/// Issue `VIDIOC_QUERYCAP`, or `None` if the ioctl fails
fn query_v4l2_cap(fd: RawFd) -> Option<V4l2Capability> {
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut cap as *mut V4l2Capability) };
    if result < 0 { None } else { Some(cap) }
}

/// Read a NUL-terminated fixed-size C string field
fn c_field(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim().to_string()
}

/// Query node capabilities
///
/// Returns `None` if the node cannot be opened or is not a V4L2 device.
pub fn query_node_caps(device_path: &str) -> Option<NodeCaps> {
    let file = std::fs::File::open(device_path).ok()?;
    let cap = query_v4l2_cap(file.as_raw_fd())?;

    let caps = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
        cap.device_caps
    } else {
        cap.capabilities
    };

    let node = NodeCaps {
        driver: c_field(&cap.driver),
        card: c_field(&cap.card),
        caps,
    };
    debug!(device_path, driver = %node.driver, card = %node.card, caps = %format!("{:#x}", caps), "Queried V4L2 capabilities");
    Some(node)
}

/// Read the node name the kernel exposes under sysfs
pub fn sysfs_name(sysfs_root: &Path, node: &str) -> Option<String> {
    let name = std::fs::read_to_string(sysfs_root.join(node).join("name")).ok()?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
