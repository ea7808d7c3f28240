// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Application configuration.
//!
//! Settings are read from a TOML file. Every section and field is optional;
//! missing values fall back to the defaults below. API tokens may also come
//! from the environment, which takes precedence over the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::device::{EventType, Model};
use crate::midi::ConnectOptions;
use crate::query::QueryOptions;

/// Config file used when no other path is given
pub const DEFAULT_CONFIG_FILE: &str = "axe-setlist.toml";
/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "AXE_SETLIST_CONFIG";
pub const PCO_TOKEN_ENV: &str = "PCO_ACCESS_TOKEN";
pub const SPOTIFY_TOKEN_ENV: &str = "SPOTIFY_ACCESS_TOKEN";

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiSettings,
    #[serde(default)]
    pub presets: PresetSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub services: ServiceSettings,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = ?path.as_ref(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Override tokens from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| env::var(name).ok());
    }

    /// Override tokens using `lookup` for environment variables
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(token) = non_empty(PCO_TOKEN_ENV) {
            self.services.pco_token = Some(token);
        }
        if let Some(token) = non_empty(SPOTIFY_TOKEN_ENV) {
            self.services.spotify_token = Some(token);
        }
    }

    /// Connection options for the configured device
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            log_decoded_messages: self.midi.log_decoded,
            quiet_events: self.midi.quiet_events.clone(),
            device_filter: self.midi.device.clone(),
            model: self.midi.model,
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            timeout: Duration::from_millis(self.midi.query_timeout_ms),
            retries: self.midi.query_retries,
        }
    }

    /// Pause between provisioning messages
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.midi.send_interval_ms)
    }
}

/// Config path from the command line, the environment or the default
pub fn config_path(cli_override: Option<&str>) -> PathBuf {
    cli_override
        .map(PathBuf::from)
        .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// MIDI transport settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MidiSettings {
    /// Port-name fragment of the device (e.g., "AXE-FX II")
    #[serde(default)]
    pub device: Option<String>,
    /// Model override; resolved from the port name when absent
    #[serde(default)]
    pub model: Option<Model>,
    /// Log every decoded inbound event
    #[serde(default)]
    pub log_decoded: bool,
    /// Event types left out of the decoded-event log
    #[serde(default = "default_quiet_events")]
    pub quiet_events: Vec<EventType>,
    /// Pause between provisioning messages (ms)
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    /// Wait for a preset name reply (ms)
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Re-sends of an unanswered name request
    #[serde(default)]
    pub query_retries: u32,
}

fn default_quiet_events() -> Vec<EventType> {
    vec![EventType::TempoBeat]
}
fn default_send_interval_ms() -> u64 {
    20
}
fn default_query_timeout_ms() -> u64 {
    2000
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            device: None,
            model: None,
            log_decoded: false,
            quiet_events: default_quiet_events(),
            send_interval_ms: default_send_interval_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            query_retries: 0,
        }
    }
}

/// Template and target slots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresetSettings {
    /// Template preset copied for every song
    #[serde(default = "default_base_preset")]
    pub base: u16,
    /// Slot of the first song
    #[serde(default = "default_starting_preset")]
    pub starting: u16,
}

fn default_base_preset() -> u16 {
    209
}
fn default_starting_preset() -> u16 {
    217
}

impl Default for PresetSettings {
    fn default() -> Self {
        Self {
            base: default_base_preset(),
            starting: default_starting_preset(),
        }
    }
}

/// Setlist storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSettings {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// User whose setlists the CLI works on
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("setlists.yaml")
}
fn default_user() -> String {
    "default".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            user: default_user(),
        }
    }
}

/// Planning Center and Spotify access
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSettings {
    #[serde(default)]
    pub pco_token: Option<String>,
    #[serde(default)]
    pub spotify_token: Option<String>,
    /// Tracks requested per Spotify search
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

fn default_search_limit() -> u32 {
    5
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            pco_token: None,
            spotify_token: None,
            search_limit: default_search_limit(),
        }
    }
}
