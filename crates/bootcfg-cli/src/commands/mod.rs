//! CLI command implementations

pub mod check;
pub mod config;
pub mod defaults;
pub mod format;
pub mod init;
pub mod menu;
pub mod mirror;
pub mod set;
pub mod show;

use anyhow::{bail, Context, Result};
use bootcfg_core::{ConfigStore, Settings};
use bootcfg_platform::{DirFileStore, ImageRegisterBus, MemoryRegisterBus};
use std::path::PathBuf;

/// Name of the PIN file next to the configuration document
pub const PIN_FILE_NAME: &str = "pin.bin";

/// The emulated device a command works on: tool settings plus the resolved
/// data directory
pub struct Device {
    /// Loaded tool settings
    pub settings: Settings,
    data_dir: Option<PathBuf>,
}

impl Device {
    /// Load settings from `settings_path` (or the default location); an
    /// explicit `data_dir` wins over the one in the settings
    pub fn load(settings_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        let settings = match settings_path {
            Some(path) => Settings::load_from_path(Some(path)),
            None => Settings::load(),
        };
        let data_dir = data_dir.or_else(|| settings.data_dir());
        Self { settings, data_dir }
    }

    /// Directory standing in for the SD card folder
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.data_dir
            .clone()
            .context("Could not determine data directory; pass --data-dir")
    }

    /// Path of the text document
    pub fn config_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.settings.paths.config_file))
    }

    /// Path of the register image
    pub fn mirror_image(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.settings.paths.mirror_image))
    }

    /// Whether a PIN file exists
    pub fn pin_exists(&self) -> bool {
        self.data_dir()
            .map(|dir| dir.join(PIN_FILE_NAME).exists())
            .unwrap_or(false)
    }

    fn files(&self) -> Result<DirFileStore> {
        Ok(DirFileStore::new(self.data_dir()?))
    }

    fn image_bus(&self) -> Result<ImageRegisterBus> {
        let path = self.mirror_image()?;
        ImageRegisterBus::open(&path)
            .with_context(|| format!("Failed to open register image {}", path.display()))
    }

    /// Store that persists saves to the data directory and register image
    pub fn open_store(&self) -> Result<ConfigStore<DirFileStore, ImageRegisterBus>> {
        Ok(
            ConfigStore::new(self.files()?, self.image_bus()?, self.settings.build_info())
                .with_file_name(self.settings.paths.config_file.clone()),
        )
    }

    /// Store whose mirror writes stay in memory, so loading never repairs
    /// the register image on disk
    pub fn open_store_read_only(&self) -> Result<ConfigStore<DirFileStore, MemoryRegisterBus>> {
        let bus = MemoryRegisterBus::from_space(*self.image_bus()?.space());
        Ok(
            ConfigStore::new(self.files()?, bus, self.settings.build_info())
                .with_file_name(self.settings.paths.config_file.clone()),
        )
    }
}

/// Split `section.key` into its parts
pub fn split_option(name: &str) -> Result<(&str, &str)> {
    match name.split_once('.') {
        Some((section, key)) if !section.is_empty() && !key.is_empty() => Ok((section, key)),
        _ => bail!("Option must be written as SECTION.KEY, got '{}'", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_option() {
        assert_eq!(
            split_option("boot.autoboot_emunand").unwrap(),
            ("boot", "autoboot_emunand")
        );
        assert!(split_option("autoboot_emunand").is_err());
        assert!(split_option(".key").is_err());
        assert!(split_option("boot.").is_err());
    }

    #[test]
    fn test_device_paths() {
        let temp_dir = TempDir::new().unwrap();
        let device = Device::load(
            Some(temp_dir.path().join("missing.toml")),
            Some(temp_dir.path().to_path_buf()),
        );
        assert_eq!(
            device.config_path().unwrap(),
            temp_dir.path().join("config.ini")
        );
        assert_eq!(
            device.mirror_image().unwrap(),
            temp_dir.path().join("mcu_registers.bin")
        );
        assert!(!device.pin_exists());

        std::fs::write(temp_dir.path().join(PIN_FILE_NAME), b"pin").unwrap();
        assert!(device.pin_exists());
    }

    #[test]
    fn test_read_only_store_leaves_image_alone() {
        let temp_dir = TempDir::new().unwrap();
        let device = Device::load(
            Some(temp_dir.path().join("missing.toml")),
            Some(temp_dir.path().to_path_buf()),
        );
        let mut store = device.open_store_read_only().unwrap();
        assert!(!store.read_config());
        assert!(!device.mirror_image().unwrap().exists());
    }
}
