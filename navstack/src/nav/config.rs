//! Navigator configuration with builder pattern
//!
//! Read once when a [`Navigator`](crate::Navigator) is constructed. Can be
//! loaded from TOML; every field has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::nav::TransitionDurations;
use crate::nav::transition::millis;

/// Navigation core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Delay between leaving a non-retained screen and disposing it
    #[serde(rename = "disposal_delay_ms", with = "millis")]
    pub disposal_delay: Duration,

    /// Close the app when hardware back has nowhere to go
    pub close_app_on_back: bool,

    /// Diagnostics mode: listener failures are logged but never alerted
    pub diagnostics: bool,

    pub transitions: TransitionDurations,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            disposal_delay: Duration::from_millis(500),
            close_app_on_back: true,
            diagnostics: false,
            transitions: TransitionDurations::default(),
        }
    }
}

impl NavConfig {
    /// Create a new builder for NavConfig
    pub fn builder() -> NavConfigBuilder {
        NavConfigBuilder::new()
    }

    /// No animation time and near-immediate disposal (for testing)
    pub fn instant() -> Self {
        Self {
            disposal_delay: Duration::from_millis(10),
            close_app_on_back: true,
            diagnostics: true,
            transitions: TransitionDurations::instant(),
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse navigation config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read navigation config {}", path.display()))?;
        let config = Self::from_toml_str(&source)?;
        log::info!("Loaded navigation config from {}", path.display());
        Ok(config)
    }
}

/// Builder for NavConfig
#[derive(Debug)]
pub struct NavConfigBuilder {
    config: NavConfig,
}

impl NavConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: NavConfig::default(),
        }
    }

    pub fn disposal_delay(mut self, delay: Duration) -> Self {
        self.config.disposal_delay = delay;
        self
    }

    pub fn close_app_on_back(mut self, enabled: bool) -> Self {
        self.config.close_app_on_back = enabled;
        self
    }

    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.config.diagnostics = enabled;
        self
    }

    pub fn transitions(mut self, durations: TransitionDurations) -> Self {
        self.config.transitions = durations;
        self
    }

    pub fn build(self) -> NavConfig {
        self.config
    }
}

impl Default for NavConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
