// SPDX-License-Identifier: GPL-3.0-only

//! Camera capability discovery
//!
//! ```text
//! enumeration ──► probe ──► capabilities ──► CapabilityMap
//!  (/dev/video*)   (v4l2-ctl)  (text parser)
//! ```

pub mod capabilities;
pub mod enumeration;
pub mod probe;
pub mod types;
pub mod v4l2_utils;

pub use capabilities::{ParserConfig, parse_capabilities};
pub use enumeration::enumerate_cameras;
pub use probe::{CapabilitySource, V4l2Ctl};
pub use types::*;
