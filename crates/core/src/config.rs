// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Store configuration.
//!
//! Stored as TOML and includes:
//! - `prefix`: prefix for generated issue IDs (e.g., "bl" → "bl-a1b2")
//! - `id_length`: number of base-36 characters after the prefix
//! - `busy_timeout_ms`: how long a file-backed store waits on a locked database

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::id::{validate_prefix, MAX_ID_LENGTH, MIN_ID_LENGTH};

/// Store configuration, usually loaded from a `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Prefix for issue IDs (2+ lowercase alphanumeric with at least one letter).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Length of the base-36 id suffix.
    #[serde(default = "default_id_length")]
    pub id_length: usize,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_prefix() -> String {
    "bl".to_string()
}

fn default_id_length() -> usize {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prefix: default_prefix(),
            id_length: default_id_length(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Config {
    /// Creates a config with the given prefix and default settings otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if prefix is not 2+ lowercase alphanumeric with at least one letter.
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let config = Config {
            prefix: prefix.into(),
            ..Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks every setting is usable.
    pub fn validate(&self) -> Result<()> {
        if !validate_prefix(&self.prefix) {
            return Err(Error::InvalidPrefix);
        }
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&self.id_length) {
            return Err(Error::Validation(format!(
                "id_length must be {MIN_ID_LENGTH}-{MAX_ID_LENGTH}, got {}",
                self.id_length
            )));
        }
        Ok(())
    }

    /// The busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
