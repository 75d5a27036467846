//! Pool configuration
//!
//! Per-pool options plus a manifest format so pools can be authored in RON
//! or JSON next to scene files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::triggers::ReleaseTrigger;

/// Number of instances a pool warms up with when no size is given
pub const DEFAULT_POOL_SIZE: usize = 200;

/// Options for a single pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Instances cloned up front; the pool grows past this on demand
    pub initial_size: usize,
    /// Whether the pool survives scene transitions
    pub persistent: bool,
    /// Release triggers applied to every instance
    pub triggers: Vec<ReleaseTrigger>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: DEFAULT_POOL_SIZE,
            persistent: false,
            triggers: Vec::new(),
        }
    }
}

impl PoolConfig {
    /// Config with the given warm size and persistence
    pub fn new(initial_size: usize, persistent: bool) -> Self {
        Self {
            initial_size,
            persistent,
            triggers: Vec::new(),
        }
    }

    /// Set the warm size
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Make the pool persistent (or not)
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Add a release trigger
    pub fn with_trigger(mut self, trigger: ReleaseTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }
}

/// Pool configs keyed by prototype name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolManifest {
    /// Config per prototype name
    #[serde(default)]
    pub pools: BTreeMap<String, PoolConfig>,
}

impl PoolManifest {
    /// Create an empty manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the config for a prototype
    pub fn insert(&mut self, prototype: impl Into<String>, config: PoolConfig) {
        self.pools.insert(prototype.into(), config);
    }

    /// Config for a prototype, if the manifest lists it
    #[must_use]
    pub fn get(&self, prototype: &str) -> Option<&PoolConfig> {
        self.pools.get(prototype)
    }

    /// Config for a prototype, falling back to the defaults
    #[must_use]
    pub fn config_for(&self, prototype: &str) -> PoolConfig {
        self.get(prototype).cloned().unwrap_or_default()
    }

    /// Parse a manifest from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid manifest
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Parse a manifest from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid manifest
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Serialize the manifest to pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load a manifest from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Load a manifest from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Save the manifest to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
