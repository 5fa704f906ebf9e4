//! Format command - rewrites a document in canonical form

use super::Device;
use anyhow::{Context, Result};
use bootcfg_core::{parse_document_bytes, render_document};
use console::style;
use std::path::Path;

/// Execute the format command
pub fn execute(device: &Device, file: &Path, in_place: bool, silent: bool) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let record = parse_document_bytes(&bytes)
        .with_context(|| format!("{} cannot be formatted", file.display()))?;
    let text = render_document(&record, &device.settings.build_info())?;

    if !in_place {
        print!("{}", text);
        return Ok(());
    }

    if text.as_bytes() == bytes.as_slice() {
        if !silent {
            println!("{} is already canonical", file.display());
        }
        return Ok(());
    }

    // Write to temp file first, then rename
    let temp_path = file.with_extension("tmp");
    std::fs::write(&temp_path, &text)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    std::fs::rename(&temp_path, file)
        .with_context(|| format!("Failed to replace {}", file.display()))?;

    if !silent {
        println!(
            "{} Formatted {}",
            style("Success:").green(),
            file.display()
        );
    }
    Ok(())
}
