//! Chain file format and operations.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::effect_config::EffectConfig;
use crate::error::ConfigError;

/// A chain of effects as stored on disk.
///
/// # TOML Format
///
/// ```toml
/// name = "Dub Echo"
/// description = "Filtered feedback delay"
/// sample_rate = 48000
///
/// [[effects]]
/// effect = "filter"
/// type = "bandpass"
/// freq = 900
///
/// [[effects]]
/// effect = "delay"
/// preset = "echos"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    /// Name of the chain.
    pub name: String,

    /// Optional description of the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sample rate the chain was designed at (defaults to 48000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Effects in signal order.
    #[serde(default)]
    pub effects: Vec<EffectConfig>,
}

fn default_sample_rate() -> u32 {
    48000
}

impl ChainConfig {
    /// Create a new empty chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sample_rate: default_sample_rate(),
            effects: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the sample rate hint.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Append an effect.
    pub fn with_effect(mut self, effect: impl Into<EffectConfig>) -> Self {
        self.effects.push(effect.into());
        self
    }

    /// Load a chain from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), name = %config.name, effects = config.len(), "chain loaded");
        Ok(config)
    }

    /// Parse a chain from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Render the chain as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the chain to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Number of effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether the chain has no effects.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Effect configuration at `index`.
    pub fn get(&self, index: usize) -> Option<&EffectConfig> {
        self.effects.get(index)
    }
}
