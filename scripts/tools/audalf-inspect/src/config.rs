//! # Inspector Configuration
//!
//! Optional TOML file passed with `--config`. Every field has a default, so an
//! empty file (or no file) behaves like the built-in settings.
//!
//! ```toml
//! max_entries = 100
//!
//! [deserialization]
//! timestamp_shape = "offset_aware"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use audalf::DeserializationSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Passed to the decoder when listing entries
    pub deserialization: DeserializationSettings,

    /// Entry listing stops after this many entries
    pub max_entries: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            deserialization: DeserializationSettings::default(),
            max_entries: 1000,
        }
    }
}

impl InspectorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }
}
