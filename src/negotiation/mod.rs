// SPDX-License-Identifier: GPL-3.0-only

//! Format negotiation
//!
//! Combines device capabilities with the stored user preference, persists
//! the outcome and announces it to the rendering server.

pub mod negotiator;
pub mod preferences;
pub mod session;

pub use negotiator::Negotiator;
pub use preferences::{JsonFileStore, MemoryStore, PreferenceStore};
pub use session::{NegotiationSession, Outcome};
