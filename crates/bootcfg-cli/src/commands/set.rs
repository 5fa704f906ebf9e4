//! Get and set commands - read or change one option

use super::{split_option, Device};
use anyhow::{Context, Result};
use console::style;

/// Execute the get command
pub fn get(device: &Device, option: &str) -> Result<()> {
    let (section, key) = split_option(option)?;
    let mut store = device.open_store_read_only()?;
    store.read_config();
    println!("{}", store.option_value(section, key)?);
    Ok(())
}

/// Execute the set command
pub fn execute(device: &Device, option: &str, value: &str, silent: bool) -> Result<()> {
    let (section, key) = split_option(option)?;
    let mut store = device.open_store()?;

    if !store.read_config() && !silent {
        eprintln!(
            "{} Stored configuration is unusable, starting from defaults",
            style("Warning:").yellow()
        );
    }

    store
        .apply_option(section, key, value)
        .with_context(|| format!("Cannot set {}", option))?;

    // Options outside the menu bits are not covered by the dirty check
    let report = store.write_all()?;
    if let Some(e) = &report.mirror_error {
        eprintln!(
            "{} Mirror block not written: {}",
            style("Warning:").yellow(),
            e
        );
    }

    if !silent {
        println!(
            "{} {} = {}",
            style("Set").green().bold(),
            option,
            store.option_value(section, key)?
        );
    }
    Ok(())
}
