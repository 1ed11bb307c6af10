//! Configuration module for macrotape
//!
//! This module handles:
//! - The user configuration file (`config.toml`) with capture and playback
//!   defaults
//! - Application state persistence (recent macros, last opened file)
//!
//! # Locations
//!
//! Both files live in platform-appropriate directories from `dirs-next`:
//! - **Linux**: `~/.config/dev.macrotape/config.toml`,
//!   `~/.local/share/dev.macrotape/app_state.json`
//! - **macOS**: `~/Library/Application Support/dev.macrotape/`
//! - **Windows**: `%APPDATA%\dev.macrotape\`
//!
//! # Example
//!
//! ```ignore
//! use macrotape::config::{AppConfig, AppState};
//!
//! let config = AppConfig::load_or_default(None);
//! let mut state = AppState::load_or_default();
//! state.add_recent_macro("demo.json", 42);
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{MacroError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.macrotape";

/// Configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Macro file extension
pub const MACRO_FILE_EXTENSION: &str = "json";

/// Maximum number of recent macros to remember
pub const MAX_RECENT_MACROS: usize = 10;

// ==================== Directories ====================

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir()
        .ok_or_else(|| MacroError::Config("Could not determine app data directory".to_string()))?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            MacroError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the default path of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

// ==================== App Config ====================

/// User configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture defaults
    pub capture: CaptureSettings,

    /// Playback defaults
    pub playback: PlaybackSettings,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the defaults. Missing fields take their
    /// defaults as well.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| MacroError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_toml_str(&content)
            .map_err(|e| e.with_context(format!("loading {}", path.display())))
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MacroError::Config(format!("Failed to parse config: {}", e)))?;
        config.playback.validate()?;
        Ok(config)
    }

    /// Load from `path`, or the default location when `None`
    ///
    /// Falls back to defaults (with a warning) on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => return Self::default(),
        };

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MacroError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MacroError::Config(format!("Failed to write config: {}", e)))
    }
}

// ==================== Recent Macro Entry ====================

/// Information about a recently used macro file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMacro {
    /// Path to the macro file
    pub path: PathBuf,

    /// Number of events in the macro when last used
    pub event_count: usize,

    /// Last used timestamp (Unix seconds)
    pub last_used: u64,
}

impl RecentMacro {
    /// Create a new recent macro entry
    pub fn new(path: impl Into<PathBuf>, event_count: usize) -> Self {
        Self {
            path: path.into(),
            event_count,
            last_used: unix_now(),
        }
    }

    /// Check if the macro file still exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ==================== App State ====================

/// Persistent application state, separate from macro files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Recently used macros, newest first
    #[serde(default)]
    pub recent_macros: Vec<RecentMacro>,

    /// Path of the last saved or loaded macro
    #[serde(default)]
    pub last_macro_path: Option<PathBuf>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            recent_macros: Vec::new(),
            last_macro_path: None,
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path()
            .ok_or_else(|| MacroError::Config("Could not determine app state path".to_string()))?;
        Self::load_from(&path)
    }

    /// Load app state from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| MacroError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| MacroError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(&dir.join(APP_STATE_FILE))
    }

    /// Save app state to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| MacroError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MacroError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Add or refresh a recent macro, moving it to the front
    pub fn add_recent_macro(&mut self, path: impl AsRef<Path>, event_count: usize) {
        let path = path.as_ref().to_path_buf();

        self.recent_macros.retain(|m| m.path != path);
        self.recent_macros
            .insert(0, RecentMacro::new(path.clone(), event_count));
        self.recent_macros.truncate(MAX_RECENT_MACROS);

        self.last_macro_path = Some(path);
    }

    /// Remove a macro from recents
    pub fn remove_recent_macro(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.recent_macros.retain(|m| m.path != path);

        if self.last_macro_path.as_deref() == Some(path) {
            self.last_macro_path = None;
        }
    }

    /// Drop recents whose files no longer exist
    pub fn cleanup_missing_macros(&mut self) {
        self.recent_macros.retain(|m| m.exists());

        if let Some(ref last) = self.last_macro_path {
            if !last.exists() {
                self.last_macro_path = None;
            }
        }
    }

    /// The most recent macro path, if the file still exists
    pub fn last_macro(&self) -> Option<&Path> {
        self.last_macro_path
            .as_deref()
            .filter(|p| p.exists())
    }
}
