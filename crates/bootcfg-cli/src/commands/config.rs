//! Config command - reports the emulated device the other commands act on

use super::{Device, PIN_FILE_NAME};
use anyhow::{Context, Result};
use bootcfg_core::Settings;
use console::style;
use std::path::{Path, PathBuf};

/// What the config command should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Describe the resolved device
    Show,
    /// Print the settings file path
    Path,
    /// Write a settings file pinned to the current data directory
    Init,
}

/// Presence of one file of the emulated device
#[derive(Debug)]
struct FileState {
    path: Option<PathBuf>,
    exists: bool,
}

impl FileState {
    fn of(path: Option<PathBuf>) -> Self {
        let exists = path.as_ref().is_some_and(|p| p.exists());
        Self { path, exists }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "path": self.path, "exists": self.exists })
    }
}

/// Settings file location: the `--settings` override or the platform default
pub fn settings_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(Settings::config_path)
}

/// Execute the config command
pub fn execute(
    device: &Device,
    settings_file: Option<PathBuf>,
    action: ConfigAction,
    json: bool,
    silent: bool,
) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = settings_file.context("Could not determine the settings location")?;
            if !silent {
                println!("{}", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => init(device, settings_file, silent),
        ConfigAction::Show => show(device, settings_file.as_deref(), json, silent),
    }
}

/// Write the loaded settings with the resolved data directory filled in, so
/// later runs need no `--data-dir`
fn init(device: &Device, settings_file: Option<PathBuf>, silent: bool) -> Result<()> {
    let path = settings_file.context("Could not determine the settings location")?;
    if path.exists() {
        if !silent {
            eprintln!(
                "{} {} already exists, leaving it unchanged",
                style("Warning:").yellow(),
                path.display()
            );
        }
        return Ok(());
    }

    let mut settings = device.settings.clone();
    settings.paths.data_dir = device.data_dir().ok();
    let saved = settings
        .save_to_path(Some(path))
        .context("Failed to write the settings file")?;

    if !silent {
        println!("{} Wrote {}", style("Success:").green(), saved.display());
        match &settings.paths.data_dir {
            Some(dir) => println!("  data_dir = {}", dir.display()),
            None => println!(
                "  {}",
                style("No data directory known; edit [paths] data_dir before use").yellow()
            ),
        }
    }
    Ok(())
}

fn show(device: &Device, settings_file: Option<&Path>, json: bool, silent: bool) -> Result<()> {
    // A broken settings file falls back to defaults; say why
    let settings_error = settings_file
        .filter(|p| p.exists())
        .and_then(|p| Settings::read_from(p).err())
        .map(|e| e.to_string());

    let data_dir = device.data_dir().ok();
    let document = FileState::of(device.config_path().ok());
    let image = FileState::of(device.mirror_image().ok());
    let pin = FileState::of(data_dir.as_ref().map(|d| d.join(PIN_FILE_NAME)));
    let build = device.settings.build_info();
    let ctx = device.settings.menu_context(pin.exists);

    // JSON output mode - always output even in silent mode (it's machine-readable)
    if json {
        let output = serde_json::json!({
            "settings_file": {
                "path": settings_file,
                "exists": settings_file.is_some_and(|p| p.exists()),
                "error": settings_error,
            },
            "data_dir": data_dir,
            "document": document.to_json(),
            "register_image": image.to_json(),
            "pin_file": pin.to_json(),
            "firmware": {
                "name": format!("{}{}", build.version_string(), build.revision_suffix()),
                "mcu_version": build.version.encoded_mcu(),
                "build_mode": build.build_mode,
            },
            "menu": {
                "has_emunand": ctx.has_emunand,
                "is_n3ds": ctx.is_n3ds,
                "pin_exists": ctx.pin_exists,
            },
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize device")?
        );
        return Ok(());
    }

    if silent {
        return Ok(());
    }

    println!("{}", style("Emulated device").bold());
    println!();
    match settings_file {
        Some(path) if path.exists() => {
            println!("  {} {}", style("Settings:").dim(), path.display())
        }
        Some(path) => println!(
            "  {} {} {}",
            style("Settings:").dim(),
            path.display(),
            style("(absent, defaults)").dim()
        ),
        None => println!("  {} {}", style("Settings:").dim(), style("(defaults)").dim()),
    }
    if let Some(e) = &settings_error {
        println!("  {} {}", style("Warning:").yellow(), e);
    }

    match &data_dir {
        Some(dir) => println!("  {} {}", style("Data dir:").dim(), dir.display()),
        None => println!(
            "  {} {}",
            style("Data dir:").dim(),
            style("unknown, pass --data-dir").red()
        ),
    }
    print_file("Document:", &document);
    print_file("Register image:", &image);
    print_file("PIN file:", &pin);
    println!();

    println!(
        "  {} {}{} ({}, MCU 0x{:04x})",
        style("Firmware:").dim(),
        build.version_string(),
        build.revision_suffix(),
        build.build_mode,
        build.version.encoded_mcu()
    );
    println!(
        "  {} {}, {}",
        style("Hardware:").dim(),
        if ctx.is_n3ds { "New 3DS" } else { "Old 3DS" },
        if ctx.has_emunand {
            "EmuNAND present"
        } else {
            "no EmuNAND"
        }
    );

    if settings_file.is_some_and(|p| !p.exists()) {
        println!();
        println!(
            "{}",
            style("'bootcfg config --init' saves these paths as the default.").dim()
        );
    }
    Ok(())
}

fn print_file(label: &str, file: &FileState) {
    let Some(path) = &file.path else {
        return;
    };
    let state = if file.exists {
        style("present").green()
    } else {
        style("missing").yellow()
    };
    println!("  {} {} {}", style(label).dim(), path.display(), state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn device_in(dir: &TempDir) -> Device {
        Device::load(
            Some(dir.path().join("bootcfg_config.toml")),
            Some(dir.path().join("sd")),
        )
    }

    #[test]
    fn test_settings_path_prefers_explicit() {
        let explicit = PathBuf::from("/tmp/custom.toml");
        assert_eq!(settings_path(Some(explicit.clone())), Some(explicit));
    }

    #[test]
    fn test_file_state() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("config.ini");
        std::fs::write(&present, "").unwrap();

        assert!(FileState::of(Some(present)).exists);
        assert!(!FileState::of(Some(dir.path().join("absent.ini"))).exists);
        assert!(!FileState::of(None).exists);
    }

    #[test]
    fn test_init_pins_data_dir() {
        let dir = TempDir::new().unwrap();
        let device = device_in(&dir);
        let path = dir.path().join("bootcfg_config.toml");

        execute(&device, Some(path.clone()), ConfigAction::Init, false, true).unwrap();

        let saved = Settings::read_from(&path).unwrap();
        assert_eq!(saved.paths.data_dir, Some(dir.path().join("sd")));
    }

    #[test]
    fn test_init_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bootcfg_config.toml");
        std::fs::write(&path, "[device]\nis_n3ds = true\n").unwrap();

        let device = device_in(&dir);
        execute(&device, Some(path.clone()), ConfigAction::Init, false, true).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[device]\nis_n3ds = true\n"
        );
    }

    #[test]
    fn test_show_silent_and_json() {
        let dir = TempDir::new().unwrap();
        let device = device_in(&dir);
        let path = Some(dir.path().join("bootcfg_config.toml"));

        assert!(execute(&device, path.clone(), ConfigAction::Show, false, true).is_ok());
        assert!(execute(&device, path, ConfigAction::Show, true, true).is_ok());
    }

    #[test]
    fn test_path_needs_location() {
        let dir = TempDir::new().unwrap();
        let device = device_in(&dir);
        assert!(execute(&device, None, ConfigAction::Path, false, true).is_err());
    }
}
