// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Candidate resolutions used when a device only reports a continuous range
///
/// Ordered ascending by width, then height. Synthesized capability maps only
/// ever contain members of this table.
pub const STANDARD_RESOLUTIONS: &[(u32, u32)] = &[
    (160, 120),
    (176, 144),
    (320, 240),
    (352, 288),
    (640, 360),
    (640, 480),
    (800, 600),
    (960, 540),
    (1024, 768),
    (1280, 720),
    (1280, 960),
    (1280, 1024),
    (1600, 1200),
    (1920, 1080),
    (2560, 1440),
    (3840, 2160),
];

/// Frame rate limits and candidate sets
pub mod framerates {
    /// Frame rates offered for stepwise devices, filtered against the reported range
    pub const STEPWISE_CANDIDATES: &[u32] = &[15, 24, 30, 60, 120];

    /// Frame rate attached to synthesized resolutions when nothing else is known
    pub const FALLBACK_FPS: u32 = 30;

    /// Upper bound (inclusive) for any accepted frame rate
    pub const MAX_FPS: u32 = 240;
}

/// Built-in capability table used when a device reports nothing usable
pub mod defaults {
    pub const RESOLUTIONS: &[(u32, u32)] = &[(640, 480), (1280, 720), (1920, 1080)];

    pub const FRAMERATES: &[u32] = &[15, 24, 30, 60];

    /// Device offered when enumeration finds no capture nodes at all
    pub const DEVICE_PATH: &str = "/dev/video0";
    pub const DEVICE_NAME: &str = "Default Camera";
}

/// External tool invocation
pub mod tool {
    use super::Duration;

    /// v4l2-utils control binary
    pub const NAME: &str = "v4l2-ctl";

    pub const LIST_FORMATS_ARG: &str = "--list-formats-ext";
    pub const INFO_ARG: &str = "--info";

    /// Deadline for `--list-formats-ext`
    pub const PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

    /// Deadline for `--info` (display name lookup only)
    pub const INFO_TIMEOUT: Duration = Duration::from_millis(1000);
}

/// Filesystem locations shared with the rendering process
pub mod paths {
    /// Directory scanned for `video*` capture nodes
    pub const DEVICE_DIR: &str = "/dev";

    /// Our own v4l2loopback output; never offered as an input
    pub const VIRTUAL_DEVICE: &str = "/dev/video10";

    /// Named pipe read line-by-line by the rendering server
    pub const COMMAND_PIPE: &str = "/tmp/blucast/cmd.pipe";

    /// sysfs class directory holding per-node `name` files
    pub const SYSFS_VIDEO4LINUX: &str = "/sys/class/video4linux";

    /// Subdirectory of the user config dir
    pub const APP_DIR: &str = "camcaps";
    pub const SETTINGS_FILE: &str = "settings.json";
    pub const CONFIG_FILE: &str = "config.json";
}

/// Preference store keys
pub mod keys {
    pub const RESOLUTION: &str = "resolution";
    pub const FPS: &str = "fps";
    pub const INPUT_DEVICE: &str = "input_device";
}

/// Application information utilities
pub mod app_info {
    /// Version string baked in by the build script
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
