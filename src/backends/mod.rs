// SPDX-License-Identifier: GPL-3.0-only

//! Backend layer for capture device access
//!
//! Everything that touches the operating system lives here: scanning for
//! device nodes, V4L2 ioctls and invoking the external format-query tool.
//! The negotiation layer only sees the parsed results.
//!
//! # Modules
//!
//! - [`camera`]: device enumeration, capability probing and parsing

pub mod camera;
