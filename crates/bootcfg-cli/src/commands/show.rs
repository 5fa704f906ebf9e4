//! Show command - loads the configuration like the loader and prints it

use super::Device;
use anyhow::{Context, Result};
use bootcfg_core::{render_document, MirrorStatus};
use console::style;

/// Execute the show command
pub fn execute(device: &Device, json: bool, silent: bool) -> Result<()> {
    let mut store = device.open_store_read_only()?;
    let loaded = store.read_config();

    // JSON output mode - always output even in silent mode (it's machine-readable)
    if json {
        let output = serde_json::json!({
            "loaded": loaded,
            "status": store.status(),
            "load": store.last_load(),
            "record": store.record(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize record")?
        );
        return Ok(());
    }

    if silent {
        return Ok(());
    }

    println!("{}", style("Boot configuration").bold());
    println!();
    println!(
        "  {} {}",
        style("Document:").dim(),
        device.config_path()?.display()
    );
    println!(
        "  {} {}",
        style("Register image:").dim(),
        device.mirror_image()?.display()
    );

    if let Some(report) = store.last_load() {
        if report.used_defaults {
            println!(
                "  {} {} {}",
                style("Source:").dim(),
                style("defaults").yellow(),
                style(format!(
                    "({})",
                    report.reason.as_deref().unwrap_or("stores unusable")
                ))
                .dim()
            );
        } else {
            println!("  {} {}", style("Source:").dim(), style("stored").green());
        }
        println!(
            "  {} {}",
            style("Mirror:").dim(),
            describe_mirror(&report.mirror)
        );
    }
    println!(
        "  {} 0x{:02x}",
        style("Boot config:").dim(),
        store.record().boot_config
    );
    println!();

    let text = render_document(store.record(), store.build())?;
    for line in text.lines() {
        if line.starts_with('[') {
            println!("{}", style(line).cyan());
        } else if line.starts_with(';') {
            println!("{}", style(line).dim());
        } else {
            println!("{}", line);
        }
    }

    Ok(())
}

/// One-line description of a mirror load outcome
pub fn describe_mirror(status: &MirrorStatus) -> String {
    match status {
        MirrorStatus::Valid => style("valid").green().to_string(),
        MirrorStatus::Upgraded { from } => style(format!(
            "written by older firmware 0x{:04x}, restamped",
            from
        ))
        .yellow()
        .to_string(),
        MirrorStatus::Reset { reason } => style(format!("reset ({:?})", reason))
            .red()
            .to_string(),
    }
}
