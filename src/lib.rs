// SPDX-License-Identifier: GPL-3.0-only

//! camcaps - capture device capability discovery and format negotiation
//!
//! Finds V4L2 capture devices, asks `v4l2-ctl` what each one supports, and
//! settles on one concrete resolution and frame rate that the device can
//! actually deliver, honouring the user's previous choice where possible.
//!
//! # Architecture
//!
//! - [`backends`]: device enumeration, capability probing and parsing
//! - [`negotiation`]: format selection, preference storage, session handling
//! - [`command_sink`]: notifications to the rendering server
//! - [`config`]: runtime configuration
//!
//! # Example
//!
//! ```
//! use camcaps::backends::camera::{ParserConfig, parse_capabilities};
//! use camcaps::negotiation::Negotiator;
//!
//! let text = "Size: Discrete 1280x720\n(30.000 fps)\n(60.000 fps)\n";
//! let caps = parse_capabilities(text, &ParserConfig::default());
//! let selection = Negotiator::default().negotiate(&caps, None, None);
//! assert_eq!(selection.to_string(), "1280x720 @ 30fps");
//! ```

pub mod backends;
pub mod command_sink;
pub mod config;
pub mod constants;
pub mod errors;
pub mod negotiation;

// Re-export commonly used types
pub use backends::camera::{CameraDevice, CapabilityMap, Resolution, Selection};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use negotiation::{NegotiationSession, Negotiator, Outcome};
