//! Layered JSON loading.

use std::path::Path;

use serde_json::Value;

use super::Config;
use crate::error::{Error, Result};

impl Config {
    /// Loads defaults, then `base`, then `local` on top.
    ///
    /// Objects merge key by key at every depth; any other value replaces
    /// what was there. A missing file is skipped. A file that cannot be
    /// parsed is reported and skipped, so a broken override never hides
    /// the settings below it.
    ///
    /// # Errors
    ///
    /// Fails only if the merged document no longer fits the schema, for
    /// example a string where a number is expected.
    pub fn load(base: &Path, local: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        for path in [base, local] {
            if let Some(layer) = read_layer(path) {
                merge_json(&mut merged, layer);
            }
        }

        serde_json::from_value(merged).map_err(|e| Error::Config(e.to_string()))
    }

    /// Parses a single JSON document over the defaults.
    ///
    /// # Errors
    ///
    /// Fails on invalid JSON or a value of the wrong type.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, serde_json::from_str(text)?);
        serde_json::from_value(merged).map_err(|e| Error::Config(e.to_string()))
    }
}

fn read_layer(path: &Path) -> Option<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(file = %path.display(), "config file not found, skipping");
            return None;
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "could not read config file");
            return None;
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(value @ Value::Object(_)) => {
            tracing::info!(file = %path.display(), "loaded config file");
            Some(value)
        }
        Ok(_) => {
            tracing::warn!(file = %path.display(), "config file is not a JSON object, skipping");
            None
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "could not parse config file");
            None
        }
    }
}

/// Merges `overlay` into `base`. Objects merge recursively; everything
/// else in `overlay` replaces the value in `base`.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
