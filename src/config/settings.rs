use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::persistor::{PersistorConfig, DEFAULT_EVENT_CAPACITY, UNVERSIONED};

/// Resolved settings for a file-backed persistor
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// File holding the persisted envelope
    pub storage_path: PathBuf,
    /// Target version
    pub version: i64,
    /// Capacity of the loaded-state and error channels
    pub event_capacity: usize,
    /// Write indented JSON
    pub pretty: bool,
}

/// TOML `[storage]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlStorageConfig {
    pub path: Option<PathBuf>,
    pub pretty: Option<bool>,
}

/// TOML `[persist]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlPersistConfig {
    pub version: Option<i64>,
    pub event_capacity: Option<usize>,
}

/// TOML representation of the settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlSettings {
    pub storage: Option<TomlStorageConfig>,
    pub persist: Option<TomlPersistConfig>,
}

/// Default data directory (~/.statekeep)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".statekeep"))
        .unwrap_or_else(|| PathBuf::from(".statekeep"))
}

/// Default settings file (~/.statekeep/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_path: data_dir().join("state.json"),
            version: UNVERSIONED,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            pretty: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`, using defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Parse settings from TOML, filling unset fields with defaults.
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let parsed: TomlSettings = toml::from_str(contents)?;
        let mut settings = Self::default();

        if let Some(storage) = parsed.storage {
            if let Some(path) = storage.path {
                settings.storage_path = path;
            }
            if let Some(pretty) = storage.pretty {
                settings.pretty = pretty;
            }
        }

        if let Some(persist) = parsed.persist {
            if let Some(version) = persist.version {
                settings.version = version;
            }
            if let Some(capacity) = persist.event_capacity {
                anyhow::ensure!(capacity > 0, "persist.event_capacity must be at least 1");
                settings.event_capacity = capacity;
            }
        }

        Ok(settings)
    }

    /// Persistor configuration carrying these settings; transforms and
    /// migrations are left for the caller to attach.
    pub fn into_config<T>(self) -> PersistorConfig<T> {
        PersistorConfig::new(self.version)
            .with_pretty(self.pretty)
            .with_event_capacity(self.event_capacity)
    }
}
