//! Persistent settings for the bootcfg tool
//!
//! Settings are stored in a TOML configuration file at:
//! - Linux/macOS: `~/.config/bootcfg/bootcfg_config.toml`
//! - Windows: `%APPDATA%\bootcfg\bootcfg_config.toml`
//!
//! They describe the emulated device the tool works on, not the loader
//! configuration itself.
//!
//! # Example Configuration
//!
//! ```toml
//! [paths]
//! data_dir = "/media/sd/luma"
//! config_file = "config.ini"
//! mirror_image = "mcu_registers.bin"
//!
//! [firmware]
//! major = 13
//! minor = 1
//! build = 0
//! commit_hash = 0
//! release = true
//! build_mode = "standard"
//!
//! [device]
//! is_n3ds = true
//! has_emunand = false
//! ```

use crate::firmware::{BuildInfo, BuildMode, FirmwareVersion};
use crate::menu::MenuContext;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name
const CONFIG_FILE_NAME: &str = "bootcfg_config.toml";

/// Application name for config directory
const APP_NAME: &str = "bootcfg";

/// Tool settings loaded from the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Where the emulated stores live
    pub paths: PathSettings,

    /// Identity of the emulated loader build
    pub firmware: FirmwareSettings,

    /// Emulated hardware
    pub device: DeviceSettings,
}

/// Locations of the emulated stores
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathSettings {
    /// Directory standing in for the SD card folder; platform data dir when unset
    pub data_dir: Option<PathBuf>,

    /// Name of the text document inside `data_dir`
    pub config_file: String,

    /// Name of the register image inside `data_dir`
    pub mirror_image: String,
}

/// Loader build the tool acts as
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FirmwareSettings {
    /// Major version
    pub major: u8,

    /// Minor version
    pub minor: u8,

    /// Build number
    pub build: u8,

    /// Commit hash shown on non-release builds
    pub commit_hash: u32,

    /// Release build
    pub release: bool,

    /// `standard` or `gdb`
    pub build_mode: BuildMode,
}

/// Emulated hardware features
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    /// New 3DS hardware
    pub is_n3ds: bool,

    /// An EmuNAND is present
    pub has_emunand: bool,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            config_file: crate::codec::CONFIG_FILE_NAME.to_string(),
            mirror_image: "mcu_registers.bin".to_string(),
        }
    }
}

impl Default for FirmwareSettings {
    fn default() -> Self {
        let version = FirmwareVersion::default();
        Self {
            major: version.major,
            minor: version.minor,
            build: version.build,
            commit_hash: 0,
            release: true,
            build_mode: BuildMode::Standard,
        }
    }
}

impl Settings {
    /// Load settings from the configuration file
    ///
    /// Returns default settings if the file doesn't exist or can't be parsed
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config path available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::read_from(&path) {
            Ok(settings) => {
                tracing::debug!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Read and parse an existing settings file
    pub fn read_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| SettingsError::Deserialize {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save settings to the configuration file
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        self.save_to_path(Self::config_path())
    }

    /// Save settings to a specific path
    pub fn save_to_path(&self, path: Option<PathBuf>) -> Result<PathBuf, SettingsError> {
        let path = path.ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;

        std::fs::write(&path, contents).map_err(|e| SettingsError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE_NAME))
    }

    /// Get the path to the configuration directory
    pub fn config_dir() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_NAME))
    }

    /// Check if a configuration file exists
    pub fn config_exists() -> bool {
        Self::config_path().is_some_and(|p| p.exists())
    }

    /// Generate a default configuration file content as a string
    pub fn default_config_string() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate default config"))
    }

    /// Directory holding the emulated stores
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.paths
            .data_dir
            .clone()
            .or_else(|| dirs_next::data_dir().map(|p| p.join(APP_NAME)))
    }

    /// Build identity for the store
    pub fn build_info(&self) -> BuildInfo {
        let firmware = &self.firmware;
        BuildInfo::new()
            .version(FirmwareVersion::new(
                firmware.major,
                firmware.minor,
                firmware.build,
            ))
            .commit_hash(firmware.commit_hash)
            .release(firmware.release)
            .build_mode(firmware.build_mode)
    }

    /// Menu visibility context for the emulated device
    pub fn menu_context(&self, pin_exists: bool) -> MenuContext {
        MenuContext {
            has_emunand: self.device.has_emunand,
            is_n3ds: self.device.is_n3ds,
            pin_exists,
        }
    }
}

/// Errors that can occur when working with settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No configuration directory available
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Failed to read or write config file
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path that caused the error
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),

    /// Settings file is not valid TOML or has wrong value types
    #[error("Failed to parse settings file {path}: {source}")]
    Deserialize {
        /// Settings file
        path: PathBuf,
        /// The TOML error
        source: toml::de::Error,
    },
}
