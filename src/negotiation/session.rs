// SPDX-License-Identifier: GPL-3.0-only

//! Event-driven negotiation
//!
//! Each trigger (startup, device switch, manual refresh) runs one
//! probe → parse → negotiate → store → notify cycle. Triggers can overlap
//! when the user switches devices quickly; only the most recent one is
//! allowed to apply its result, since an older probe finishing late would
//! otherwise revert the user's latest choice.

use super::negotiator::Negotiator;
use super::preferences::PreferenceStore;
use crate::backends::camera::capabilities::{ParserConfig, parse_capabilities};
use crate::backends::camera::probe::CapabilitySource;
use crate::backends::camera::types::{CameraDevice, CapabilityMap, Selection};
use crate::command_sink::{Command, CommandSink};
use crate::config::Config;
use crate::constants::{defaults, keys};
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Result of one negotiation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Selection stored and announced
    Applied(Selection),
    /// A newer request started first; nothing was stored or sent
    Superseded,
}

impl Outcome {
    pub fn selection(&self) -> Option<Selection> {
        match self {
            Outcome::Applied(selection) => Some(*selection),
            Outcome::Superseded => None,
        }
    }
}

/// Ties a capability source, the preference store and the command sink together
pub struct NegotiationSession<C, P, K> {
    source: C,
    store: Mutex<P>,
    sink: K,
    parser: ParserConfig,
    negotiator: Negotiator,
    generation: AtomicU64,
}

impl<C, P, K> NegotiationSession<C, P, K>
where
    C: CapabilitySource,
    P: PreferenceStore,
    K: CommandSink,
{
    pub fn new(source: C, store: P, sink: K, config: &Config) -> Self {
        Self {
            source,
            store: Mutex::new(store),
            sink,
            parser: config.parser.clone(),
            negotiator: Negotiator::from_config(config),
            generation: AtomicU64::new(0),
        }
    }

    /// Run `f` against the preference store
    pub fn with_store<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let mut store = self.store.lock().unwrap();
        f(&mut *store)
    }

    /// Query, parse and negotiate for `device_path`
    pub async fn refresh(&self, device_path: &str) -> Outcome {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let raw = self.source.query_formats(device_path).await;

        if !self.is_current(ticket) {
            info!(device = %device_path, "Discarding capabilities from superseded request");
            return Outcome::Superseded;
        }

        let capabilities = raw
            .map(|text| parse_capabilities(&text, &self.parser))
            .unwrap_or_else(CapabilityMap::new);

        // Checked again under the lock: a newer request may have finished
        // while this one was parsing or waiting for the store
        let applied = self.with_store(|store| {
            if !self.is_current(ticket) {
                return None;
            }
            let selection = self.negotiator.negotiate_with_store(&capabilities, store);
            self.deliver(&Command::Resolution(selection.resolution));
            self.deliver(&Command::Fps(selection.fps));
            Some(selection)
        });

        match applied {
            Some(selection) => Outcome::Applied(selection),
            None => {
                info!(device = %device_path, "Discarding selection from superseded request");
                Outcome::Superseded
            }
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Make `device_path` the active input and negotiate for it
    pub async fn switch_device(&self, device_path: &str) -> Outcome {
        info!(device = %device_path, "Switching input device");

        self.with_store(|store| {
            if let Err(e) = store.set(keys::INPUT_DEVICE, json!(device_path)) {
                warn!(error = %e, "Failed to store input device");
            }
        });
        self.deliver(&Command::Device(device_path.to_string()));

        self.refresh(device_path).await
    }

    /// Pick the stored device if it is still present, else the first one
    pub async fn startup(&self, cameras: &[CameraDevice]) -> Outcome {
        let stored = self.with_store(|store| store.input_device());

        let device = stored
            .filter(|path| cameras.iter().any(|camera| &camera.path == path))
            .or_else(|| cameras.first().map(|camera| camera.path.clone()))
            .unwrap_or_else(|| defaults::DEVICE_PATH.to_string());

        self.switch_device(&device).await
    }

    fn deliver(&self, command: &Command) {
        if let Err(e) = self.sink.send(command) {
            warn!(command = %command, error = %e, "Command not delivered");
        }
    }
}
