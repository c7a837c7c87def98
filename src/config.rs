// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Shell server configuration bag with TOML loading and key/value set.
// Author: Lukas Bower

//! Shell server configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 2323;
/// Default history depth per session.
pub const DEFAULT_MAX_HISTORY: usize = 100;
/// Default idle timeout before the reaper closes a session.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Errors surfaced by configuration loading and adjustment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `set` was called with a key the configuration does not know.
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    /// `set` was called with a value the key cannot parse.
    #[error("invalid value '{value}' for config key {key}")]
    InvalidValue {
        /// Key being set.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// The configuration file could not be read.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// The configuration file could not be parsed.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
}

/// Configuration bag for a [`crate::ShellServer`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root prompt; `"> "` is appended unless it already ends in `>` or `#`.
    pub prompt: String,
    /// TCP listen port; 0 binds an ephemeral port.
    pub port: u16,
    /// Welcome banner sent on connect.
    pub welcome: String,
    /// Per-session history depth.
    pub max_history: usize,
    /// Idle threshold in milliseconds before the reaper closes a session.
    pub idle_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "cmdline".to_owned(),
            port: DEFAULT_PORT,
            welcome: "Welcome to Command Line Interface!\r\nType '?' for available commands.\r\n"
                .to_owned(),
            max_history: DEFAULT_MAX_HISTORY,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file; missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Idle threshold as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Adjust one setting by string key and value. Keys: `prompt`,
    /// `welcome`, `maxhistory`, `port`, `idletimeout` (seconds).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: &str| ConfigError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        };
        match key {
            "prompt" => self.prompt = value.to_owned(),
            "welcome" => self.welcome = value.to_owned(),
            "maxhistory" => {
                self.max_history = value.parse().map_err(|_| invalid(key, value))?;
            }
            "port" => {
                self.port = value.parse().map_err(|_| invalid(key, value))?;
            }
            "idletimeout" => {
                let secs: u64 = value.parse().map_err(|_| invalid(key, value))?;
                self.idle_timeout_ms = secs.saturating_mul(1000);
            }
            other => return Err(ConfigError::UnknownKey(other.to_owned())),
        }
        Ok(())
    }
}
