//! Mirror command - inspects or resets the mirror block in the register image

use super::Device;
use anyhow::{Context, Result};
use bootcfg_core::{FirmwareVersion, MirrorCheck, MirrorStore};
use console::style;

/// Execute the mirror command
pub fn execute(device: &Device, reset: bool, json: bool, silent: bool) -> Result<()> {
    let path = device.mirror_image()?;
    let build = device.settings.build_info();
    let mut mirror = MirrorStore::new(device.image_bus()?, build.version);

    if reset {
        let block = mirror
            .write(0)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !silent {
            println!(
                "{} Wrote mirror block {:02x?} to {}",
                style("Success:").green(),
                block.to_bytes(),
                path.display()
            );
        }
        return Ok(());
    }

    let check = mirror.inspect();
    let raw = mirror.read_raw().ok();

    let (state, reason) = match &check {
        MirrorCheck::Current(_) => ("current", None),
        MirrorCheck::Older(_) => ("older", None),
        MirrorCheck::Invalid(reason) => ("invalid", Some(reason)),
    };

    // JSON output mode - always output even in silent mode (it's machine-readable)
    if json {
        let output = serde_json::json!({
            "path": path,
            "state": state,
            "reason": reason,
            "running_version": mirror.running_version(),
            "block": raw.map(|block| serde_json::json!({
                "bytes": block.to_bytes(),
                "version": block.version,
                "firmware": FirmwareVersion::from_encoded_mcu(block.version),
                "boot_config": block.boot_config,
                "checksum": block.checksum,
                "expected_checksum": block.expected_checksum(),
            })),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize mirror")?
        );
        return Ok(());
    }

    if silent {
        return Ok(());
    }

    println!("{}", style("Mirror block").bold());
    println!();
    println!("  {} {}", style("Register image:").dim(), path.display());
    if let Some(block) = raw {
        println!("  {} {:02x?}", style("Bytes:").dim(), block.to_bytes());
        println!(
            "  {} 0x{:04x} ({})",
            style("Version:").dim(),
            block.version,
            FirmwareVersion::from_encoded_mcu(block.version)
        );
        println!("  {} 0x{:02x}", style("Boot config:").dim(), block.boot_config);
        println!(
            "  {} 0x{:02x} (expected 0x{:02x})",
            style("Checksum:").dim(),
            block.checksum,
            block.expected_checksum()
        );
    }
    println!(
        "  {} 0x{:04x} ({})",
        style("Running:").dim(),
        mirror.running_version(),
        build.version
    );

    let verdict = match (&check, reason) {
        (MirrorCheck::Current(_), _) => style("current".to_string()).green(),
        (MirrorCheck::Older(_), _) => {
            style("older, the loader will restamp it with a cleared boot config".to_string()).yellow()
        }
        (_, reason) => style(format!(
            "invalid ({:?}), the loader will reset it",
            reason
        ))
        .red(),
    };
    println!("  {} {}", style("State:").dim(), verdict);

    Ok(())
}
