//! TOML configuration file support for power users.
//!
//! Instead of passing many CLI flags, users can specify build settings in a
//! config file:
//!
//! ```toml
//! # locstore.toml
//! [build]
//! workers = 8
//! marker = "_MMStack_"
//! channels = ["A488", "A647", "A750", "DAPI", "Cy5"]
//!
//! [build.extensions]
//! "locResults.dat" = "Localizations"
//! "locMetadata.json" = "LocMetadata"
//! "fiducialTracks.dat" = "FiducialTracks"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use locstore::build::{BuildOptions, ExtensionRule};

/// Root configuration structure for locstore.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Build-specific settings.
    #[serde(default)]
    pub build: BuildConfig,
}

/// Configuration for the build command.
#[derive(Debug, Default, Deserialize)]
pub struct BuildConfig {
    /// Worker threads for the parse/read stage.
    pub workers: Option<usize>,

    /// Acquisition marker for the acquisition parser.
    pub marker: Option<String>,

    /// Channel vocabulary for the acquisition parser.
    pub channels: Option<Vec<String>>,

    /// Filename suffix to dataset type mapping. Replaces the default rules
    /// when present.
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

impl Config {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Fold the config's build settings into a set of build options.
    pub fn apply(&self, mut options: BuildOptions) -> BuildOptions {
        if let Some(workers) = self.build.workers {
            options.workers = workers;
        }
        if !self.build.extensions.is_empty() {
            options.extensions = self
                .build
                .extensions
                .iter()
                .map(|(suffix, dataset_type)| ExtensionRule::new(suffix, dataset_type))
                .collect();
        }
        options
    }
}
