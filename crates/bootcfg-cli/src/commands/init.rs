//! Init command - writes factory defaults to both stores

use super::Device;
use anyhow::{bail, Context, Result};
use console::style;
use dialoguer::Confirm;

/// Execute the init command
pub fn execute(device: &Device, skip_confirm: bool, silent: bool) -> Result<()> {
    let config_path = device.config_path()?;
    let image_path = device.mirror_image()?;

    if (config_path.exists() || image_path.exists()) && !skip_confirm {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Overwrite the configuration in {}?",
                device.data_dir()?.display()
            ))
            .default(false)
            .interact()
            .context("Failed to get user confirmation")?;

        if !proceed {
            bail!("Aborted by user");
        }
    }

    let mut store = device.open_store()?;
    let report = store.write_all()?;

    if !silent {
        println!(
            "{} Wrote default configuration to {}",
            style("Success:").green(),
            config_path.display()
        );
        if report.mirror_written {
            println!(
                "{} Wrote mirror block to {}",
                style("Success:").green(),
                image_path.display()
            );
        }
    }
    if let Some(e) = report.mirror_error {
        eprintln!(
            "{} Mirror block not written: {}",
            style("Warning:").yellow(),
            e
        );
    }

    Ok(())
}
