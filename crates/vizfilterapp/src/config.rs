//! # Configuration
//!
//! Engine tunables, loaded with [`confique`] from layered sources.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `VIZFILTER_SEPARATOR`, `VIZFILTER_SCAN_LIMIT`, etc.
//! 2. **Config file**: a `vizfilter.toml` passed explicitly (CLI `--config`).
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `separator` | `_` | Name separator used when a selection leaves it blank |
//! | `max_name_length` | `120` | Filter names are truncated to this many characters |
//! | `real_epsilon` | `1e-6` | Tolerance for real-number rules and keys |
//! | `scan_limit` | `10000` | Element cap for value enumeration |

use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Separator joining name parts when the selection does not set one.
    #[config(env = "VIZFILTER_SEPARATOR", default = "_")]
    pub separator: String,

    /// Maximum length of a composed filter name, in characters.
    #[config(env = "VIZFILTER_MAX_NAME_LENGTH", default = 120)]
    pub max_name_length: usize,

    /// Tolerance for real-number equality.
    #[config(env = "VIZFILTER_REAL_EPSILON", default = 1e-6)]
    pub real_epsilon: f64,

    /// Elements visited before value enumeration stops.
    #[config(env = "VIZFILTER_SCAN_LIMIT", default = 10000)]
    pub scan_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            separator: "_".to_string(),
            max_name_length: 120,
            real_epsilon: 1e-6,
            scan_limit: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load from the environment, then `file` if given, then defaults.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = EngineConfig::builder().env();
        if let Some(path) = file {
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    /// The separator to use for a run: the selection's own, or the configured one.
    pub fn separator_for<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.trim().is_empty() {
            &self.separator
        } else {
            requested
        }
    }
}
