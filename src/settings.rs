//! Worker settings loading.
//!
//! The `--config` flag points at a JSON object file. Each worker loads it at
//! startup into an immutable [`Settings`] map that its work unit may read;
//! the supervisor itself only carries the path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;

/// Immutable key/value settings read from a JSON object file.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, Value>);

impl Settings {
    /// Look up a setting by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of settings loaded.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether any settings were loaded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Load settings from a JSON object file.
///
/// A relative path is resolved against the current working directory before
/// reading, so workers spawned from the same directory agree on the file.
pub fn load(path: &Path) -> Result<Settings> {
    let path: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        debug!(path = %path.display(), "Settings path is not absolute; resolving");
        std::env::current_dir()?.join(path)
    };

    info!(path = %path.display(), "Loading settings");

    let data = fs::read_to_string(&path)?;
    let settings = serde_json::from_str(&data)?;
    Ok(settings)
}
