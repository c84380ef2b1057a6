// SPDX-License-Identifier: GPL-3.0-only

//! Persisted user preferences
//!
//! A flat key/value store shared with the rest of the application. This
//! crate reads and writes `resolution`, `fps` and `input_device`; any other
//! keys in the file belong to other components and are preserved.

use crate::constants::keys;
use crate::errors::{AppError, AppResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Durable key/value collaborator
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> AppResult<()>;

    /// Stored `"WxH"` label
    fn preferred_resolution(&self) -> Option<String> {
        self.get(keys::RESOLUTION)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// Stored frame rate; numeric strings are accepted
    fn preferred_fps(&self) -> Option<u32> {
        match self.get(keys::FPS)? {
            Value::Number(n) => n.as_u64().and_then(|fps| u32::try_from(fps).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Last selected input device path
    fn input_device(&self) -> Option<String> {
        self.get(keys::INPUT_DEVICE)
            .and_then(|value| value.as_str().map(str::to_string))
            .filter(|path| !path.is_empty())
    }
}

/// Preferences kept in a JSON object on disk
///
/// The file is rewritten on every `set`. A missing or corrupt file reads as
/// empty rather than failing, so a damaged settings file never blocks
/// negotiation.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Map<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = Self::read(&path);
        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Map<String, Value> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No settings file; starting empty");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %path.display(), "Settings file is not a JSON object; ignoring");
                Map::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt settings file; ignoring");
                Map::new()
            }
        }
    }

    fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let text = serde_json::to_string_pretty(&self.data)?;

        // Write then rename so readers never see a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> AppResult<()> {
        self.data.insert(key.to_string(), value);
        self.save()
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> AppResult<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }
}
