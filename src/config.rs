//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! - Default values
//! - TOML configuration file (`.docsync/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCSYNC_` and use double
//! underscores to separate nested levels:
//! - `DOCSYNC_WATCHER__DEBOUNCE_MS=500` sets `watcher.debounce_ms`
//! - `DOCSYNC_SYNC__REFRESH_DELAY_MS=100` sets `sync.refresh_delay_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Directory holding workspace-local configuration.
pub const CONFIG_DIR: &str = ".docsync";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file already exists at {path}. Use --force to overwrite")]
    AlreadyExists { path: PathBuf },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// File detection settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Snapshot synchronization settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Quiet window before a burst of file events is reconciled
    #[serde(default = "default_watch_debounce_ms")]
    pub debounce_ms: u64,

    /// File name pattern for documents
    #[serde(default = "default_document_pattern")]
    pub document_pattern: String,

    /// File name of serialized project info files
    #[serde(default = "default_project_info_file_name")]
    pub project_info_file_name: String,

    /// Directory names never descended into
    #[serde(default = "default_ignored_directories")]
    pub ignored_directories: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SyncConfig {
    /// Quiet window before a workspace refresh is sent to the client
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Quiet window before changed documents are reprocessed
    #[serde(default = "default_generator_delay_ms")]
    pub generator_delay_ms: u64,

    /// Capacity of the change event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `"docsync::watcher" = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_watch_debounce_ms() -> u64 {
    1000
}
fn default_document_pattern() -> String {
    "*.razor".to_string()
}
fn default_project_info_file_name() -> String {
    "project.razor.json".to_string()
}
fn default_ignored_directories() -> Vec<String> {
    ["node_modules", "bin", "obj", ".git"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_refresh_delay_ms() -> u64 {
    250
}
fn default_generator_delay_ms() -> u64 {
    100
}
fn default_event_capacity() -> usize {
    1024
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watcher: WatcherConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_watch_debounce_ms(),
            document_pattern: default_document_pattern(),
            project_info_file_name: default_project_info_file_name(),
            ignored_directories: default_ignored_directories(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_delay_ms: default_refresh_delay_ms(),
            generator_delay_ms: default_generator_delay_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl SyncConfig {
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn generator_delay(&self) -> Duration {
        Duration::from_millis(self.generator_delay_ms)
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration layered on top of a specific file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting; single underscores stay in field names
            .merge(
                Env::prefixed("DOCSYNC_")
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Find the settings file by looking for `.docsync` from the current
    /// directory up to the filesystem root.
    pub fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_config_from(&current)
    }

    fn find_config_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create a default settings file under `root`.
    pub fn init_config_file(root: &Path, force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err(ConfigError::AlreadyExists { path: config_path });
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.watcher.debounce_ms, 1000);
        assert_eq!(settings.watcher.document_pattern, "*.razor");
        assert!(
            settings
                .watcher
                .ignored_directories
                .contains(&"node_modules".to_string())
        );
        assert_eq!(settings.sync.refresh_delay(), Duration::from_millis(250));
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[watcher]
debounce_ms = 300
ignored_directories = ["target"]

[sync]
refresh_delay_ms = 50

[logging.modules]
"docsync::state" = "debug"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.watcher.debounce_ms, 300);
        assert_eq!(settings.watcher.ignored_directories, vec!["target"]);
        assert_eq!(settings.sync.refresh_delay_ms, 50);
        assert_eq!(settings.logging.modules["docsync::state"], "debug");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[sync]\ngenerator_delay_ms = 10\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.sync.generator_delay_ms, 10);
        assert_eq!(settings.sync.refresh_delay_ms, 250);
        assert_eq!(settings.watcher, WatcherConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.watcher.debounce_ms, default_watch_debounce_ms());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.watcher.document_pattern = "*.cshtml".to_string();
        settings.sync.event_capacity = 16;
        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watcher.document_pattern, "*.cshtml");
        assert_eq!(loaded.sync.event_capacity, 16);
    }

    #[test]
    fn test_init_config_file_respects_force() {
        let temp_dir = TempDir::new().unwrap();

        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.exists());

        let again = Settings::init_config_file(temp_dir.path(), false);
        assert!(matches!(again, Err(ConfigError::AlreadyExists { .. })));

        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_find_config_walks_ancestors() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(CONFIG_DIR)).unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = Settings::find_config_from(&nested).unwrap();
        assert_eq!(found, temp_dir.path().join(CONFIG_DIR).join(CONFIG_FILE));
    }
}
