//! bootcfg - Inspect and edit the persistent configuration of a console firmware loader
//!
//! The tool works on an emulated device: a data directory standing in for
//! the SD card folder, holding the text document, and a register image
//! standing in for the battery-backed MCU registers.
//!
//! # Usage
//!
//! ```bash
//! # Show the configuration the loader would boot with
//! bootcfg --data-dir ./sd show
//!
//! # Validate a hand-edited document
//! bootcfg check ./sd/config.ini
//!
//! # Change one option
//! bootcfg --data-dir ./sd set boot.autoboot_emunand 1
//!
//! # Open the boot menu
//! bootcfg --data-dir ./sd menu
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use clap_mangen::Man;
use console::style;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::config::ConfigAction;
use commands::Device;

/// bootcfg - Inspect and edit the persistent configuration of a console firmware loader
#[derive(Parser)]
#[command(name = "bootcfg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Suppress ALL output (implies --quiet and --yes)
    #[arg(long, global = true)]
    silent: bool,

    /// Directory holding config.ini and the register image
    #[arg(short, long, global = true, env = "BOOTCFG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Tool settings file (overrides the default location)
    #[arg(long, global = true, env = "BOOTCFG_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the configuration the way the loader does and print it
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration document
    Check {
        /// Document to validate
        file: PathBuf,
    },

    /// Rewrite a document in canonical form
    Format {
        /// Document to format
        file: PathBuf,

        /// Replace the file instead of printing
        #[arg(short, long)]
        in_place: bool,
    },

    /// Print the default configuration document
    Defaults {
        /// Defaults of the build with the debugger stub
        #[arg(long)]
        gdb: bool,
    },

    /// Write default configuration and a fresh mirror block
    Init {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Print one option
    Get {
        /// Option as SECTION.KEY, e.g. boot.brightness_level
        option: String,
    },

    /// Change one option and save
    Set {
        /// Option as SECTION.KEY, e.g. boot.brightness_level
        option: String,

        /// New value, in the document's syntax
        value: String,
    },

    /// Inspect or reset the mirror block in the register image
    Mirror {
        /// Write a fresh block with an empty boot config
        #[arg(long)]
        reset: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Open the interactive boot configuration menu
    Menu,

    /// Describe the emulated device: settings, data dir, stores, build
    Config {
        /// Save a settings file remembering the current data dir
        #[arg(long, conflicts_with = "path")]
        init: bool,

        /// Print the settings file path
        #[arg(long, conflicts_with = "json")]
        path: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate man pages
    Mangen {
        /// Output directory for man pages
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet || cli.silent);
    let verbose = cli.verbose;

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        if verbose {
            for cause in e.chain().skip(1) {
                eprintln!("  {} {}", style("Caused by:").yellow(), cause);
            }
        }
        std::process::exit(1);
    }
}

/// Log to stderr; `BOOTCFG_LOG` takes an `EnvFilter` directive and wins over
/// the flags
fn init_logging(verbose: bool, quiet: bool) {
    let level = match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "off",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_env("BOOTCFG_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let silent = cli.silent;
    let device = Device::load(cli.settings.clone(), cli.data_dir);

    match cli.command {
        Commands::Show { json } => commands::show::execute(&device, json, silent),
        Commands::Check { file } => commands::check::execute(&file, silent),
        Commands::Format { file, in_place } => {
            commands::format::execute(&device, &file, in_place, silent)
        }
        Commands::Defaults { gdb } => commands::defaults::execute(&device, gdb),
        Commands::Init { yes } => commands::init::execute(&device, yes || silent, silent),
        Commands::Get { option } => commands::set::get(&device, &option),
        Commands::Set { option, value } => {
            commands::set::execute(&device, &option, &value, silent)
        }
        Commands::Mirror { reset, json } => {
            commands::mirror::execute(&device, reset, json, silent)
        }
        Commands::Menu => commands::menu::execute(&device, silent),
        Commands::Config { init, path, json } => {
            let action = if init {
                ConfigAction::Init
            } else if path {
                ConfigAction::Path
            } else {
                ConfigAction::Show
            };
            let settings_file = commands::config::settings_path(cli.settings);
            commands::config::execute(&device, settings_file, action, json, silent)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "bootcfg", &mut std::io::stdout());
            Ok(())
        }
        Commands::Mangen { out_dir } => {
            for page in write_man_pages(Path::new(&out_dir))? {
                if !silent {
                    println!("Generated: {}", page.display());
                }
            }
            Ok(())
        }
    }
}

/// Render `bootcfg.1` plus one page per working subcommand into `out_dir`
fn write_man_pages(out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let cmd = Cli::command();
    let mut pages = vec![(String::from("bootcfg"), cmd.clone())];
    pages.extend(
        cmd.get_subcommands()
            .filter(|sub| !matches!(sub.get_name(), "completions" | "mangen" | "help"))
            .map(|sub| (format!("bootcfg-{}", sub.get_name()), sub.clone())),
    );

    let mut written = Vec::with_capacity(pages.len());
    for (name, page) in pages {
        let mut buffer = Vec::new();
        Man::new(page).render(&mut buffer)?;
        let path = out_dir.join(format!("{}.1", name));
        std::fs::write(&path, buffer)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
