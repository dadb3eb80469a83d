// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for keytape.
//!
//! This module provides the engine configuration (recording limits,
//! playback speed range, storage and export settings) loaded from YAML.

pub mod watcher;

pub use watcher::{validate_config, ConfigEvent, ConfigWatcher};

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::recording::ExportFormat;

/// Default maximum recording length: 5 minutes
pub const DEFAULT_MAX_DURATION_MS: u64 = 5 * 60 * 1000;
/// Slowest accepted playback speed
pub const DEFAULT_MIN_SPEED: f64 = 0.1;
/// Fastest accepted playback speed
pub const DEFAULT_MAX_SPEED: f64 = 4.0;

/// Root engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineConfig {
    /// Recording settings
    #[serde(default)]
    pub recording: RecordingConfig,
    /// Playback settings
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl EngineConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.recording.max_duration_ms > 0,
            "recording.max_duration_ms must be positive"
        );
        let playback = &self.playback;
        ensure!(
            playback.min_speed.is_finite() && playback.min_speed > 0.0,
            "playback.min_speed must be a positive number"
        );
        ensure!(
            playback.max_speed.is_finite() && playback.max_speed >= playback.min_speed,
            "playback.max_speed must be at least playback.min_speed"
        );
        ensure!(
            playback.default_speed >= playback.min_speed
                && playback.default_speed <= playback.max_speed,
            "playback.default_speed must lie within [min_speed, max_speed]"
        );
        ensure!(!self.storage.key.trim().is_empty(), "storage.key must not be empty");
        Ok(())
    }
}

/// Recording settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingConfig {
    /// Sessions are force-stopped past this length
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
    /// Prefix of auto-assigned names ("Recording 3")
    #[serde(default = "default_name_prefix")]
    pub default_name_prefix: String,
}

fn default_max_duration_ms() -> u64 {
    DEFAULT_MAX_DURATION_MS
}
fn default_name_prefix() -> String {
    "Recording".to_string()
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: default_max_duration_ms(),
            default_name_prefix: default_name_prefix(),
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Speed used when none is given
    #[serde(default = "default_speed")]
    pub default_speed: f64,
    /// Slowest accepted speed
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,
    /// Fastest accepted speed
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
}

fn default_speed() -> f64 {
    1.0
}
fn default_min_speed() -> f64 {
    DEFAULT_MIN_SPEED
}
fn default_max_speed() -> f64 {
    DEFAULT_MAX_SPEED
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed: default_speed(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Key the recording collection is stored under
    #[serde(default = "default_storage_key")]
    pub key: String,
    /// Directory for the file-backed store
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Byte quota for stored recordings (none = unbounded)
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

fn default_storage_key() -> String {
    "keytape.recordings".to_string()
}
fn default_storage_path() -> String {
    ".keytape".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            path: default_storage_path(),
            quota_bytes: None,
        }
    }
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExportConfig {
    /// Format used by `export`
    #[serde(default)]
    pub format: ExportFormat,
}
