//! Check command - validates a configuration document

use anyhow::{bail, Context, Result};
use bootcfg_core::{
    parse_document_bytes, Error, CONFIG_VERSION_MAJOR, CONFIG_VERSION_MINOR, MAX_DOCUMENT_SIZE,
};
use console::style;
use std::path::Path;

/// Execute the check command
pub fn execute(file: &Path, silent: bool) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let record = match parse_document_bytes(&bytes) {
        Ok(record) => record,
        Err(Error::Parse(e)) => {
            bail!("{}: {}", file.display(), e);
        }
        Err(Error::DocumentTooLarge { size, .. }) => {
            bail!(
                "{}: document is {} bytes, the loader reads at most {}",
                file.display(),
                size,
                MAX_DOCUMENT_SIZE - 1
            );
        }
        Err(e) => return Err(e).with_context(|| format!("{} is not valid", file.display())),
    };

    if !record.has_current_format() {
        bail!(
            "{}: format version {}.{} does not match {}.{}; the loader would reset to defaults",
            file.display(),
            record.format_version_major,
            record.format_version_minor,
            CONFIG_VERSION_MAJOR,
            CONFIG_VERSION_MINOR
        );
    }

    if !silent {
        println!(
            "{} {} is valid ({} bytes)",
            style("✓").green().bold(),
            file.display(),
            bytes.len()
        );
    }
    Ok(())
}
