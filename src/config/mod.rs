// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for Beatle.
//!
//! Game settings (snippet progression, turn budget, catalog and audio
//! locations, selection retries) are loaded from a YAML or TOML file. Every
//! field has a default, so an empty file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::SnippetLadder;

/// Configuration validation errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// No snippet lengths configured
    #[error("At least one snippet length is required")]
    NoSnippetLengths,

    /// A snippet length is zero, negative or not finite
    #[error("Snippet length {index} must be a positive number of seconds, got {value}")]
    InvalidSnippetLength { index: usize, value: f64 },

    /// Snippet lengths must grow turn by turn
    #[error("Snippet lengths must be strictly increasing (entry {index})")]
    NotIncreasing { index: usize },

    /// One snippet length per turn
    #[error("max_turns ({max_turns}) must equal the number of snippet lengths ({lengths})")]
    TurnMismatch { max_turns: usize, lengths: usize },

    /// Snippet start offset is negative or not finite
    #[error("Snippet offset must be zero or more seconds, got {0}")]
    InvalidOffset(f64),

    /// Song selection needs at least one attempt
    #[error("max_selection_attempts must be at least 1")]
    NoSelectionAttempts,
}

/// Root game configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    /// Snippet length per turn, in seconds
    #[serde(default = "default_snippet_lengths")]
    pub snippet_lengths: Vec<f64>,
    /// Turns per round
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Where every snippet starts, in seconds
    #[serde(default)]
    pub snippet_offset: f64,
    /// Song catalog file (JSON or YAML)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    /// Prefix for audio locators
    #[serde(default = "default_audio_base")]
    pub audio_base: String,
    /// Distinct songs tried when starting a round
    #[serde(default = "default_max_selection_attempts")]
    pub max_selection_attempts: usize,
    /// Start the round anyway, silent, when no song's audio loads.
    /// Off by default: the round start fails and the current round keeps
    /// its audio.
    #[serde(default)]
    pub proceed_without_audio: bool,
    /// Seed for reproducible song selection
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_snippet_lengths() -> Vec<f64> {
    vec![2.0, 3.0, 5.0, 8.0, 16.0]
}
fn default_max_turns() -> usize {
    5
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("songs.json")
}
fn default_audio_base() -> String {
    "audio".to_string()
}
fn default_max_selection_attempts() -> usize {
    3
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            snippet_lengths: default_snippet_lengths(),
            max_turns: default_max_turns(),
            snippet_offset: 0.0,
            catalog_path: default_catalog_path(),
            audio_base: default_audio_base(),
            max_selection_attempts: default_max_selection_attempts(),
            proceed_without_audio: false,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Load and validate a configuration file.
    ///
    /// `.toml` files are parsed as TOML, anything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&contents)?,
            _ => Self::from_yaml(&contents)?,
        };
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;
        Ok(config)
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Check the invariants the game relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.snippet_ladder()?;

        if self.max_turns != self.snippet_lengths.len() {
            return Err(ConfigError::TurnMismatch {
                max_turns: self.max_turns,
                lengths: self.snippet_lengths.len(),
            });
        }
        if Duration::try_from_secs_f64(self.snippet_offset).is_err() {
            return Err(ConfigError::InvalidOffset(self.snippet_offset));
        }
        if self.max_selection_attempts == 0 {
            return Err(ConfigError::NoSelectionAttempts);
        }
        Ok(())
    }

    /// The snippet progression as durations
    pub fn snippet_ladder(&self) -> Result<SnippetLadder, ConfigError> {
        let lengths = self
            .snippet_lengths
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                match Duration::try_from_secs_f64(value) {
                    Ok(length) if !length.is_zero() => Ok(length),
                    _ => Err(ConfigError::InvalidSnippetLength { index, value }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        SnippetLadder::new(lengths)
    }

    /// Snippet start offset; zero when the value is out of range
    pub fn snippet_offset(&self) -> Duration {
        Duration::try_from_secs_f64(self.snippet_offset).unwrap_or_default()
    }
}
