//! Defaults command - prints the factory default document

use super::Device;
use anyhow::Result;
use bootcfg_core::{render_document, BuildMode, ConfigRecord};

/// Execute the defaults command
pub fn execute(device: &Device, gdb: bool) -> Result<()> {
    let mut build = device.settings.build_info();
    if gdb {
        build = build.build_mode(BuildMode::Gdb);
    }
    let record = ConfigRecord::defaults(&build);
    print!("{}", render_document(&record, &build)?);
    Ok(())
}
