//! # Bootcfg Core
//!
//! Persistent configuration store of a console firmware loader.
//!
//! ## Modules
//!
//! - `record`: the bit-packed in-memory configuration record
//! - `values`: value grammars (booleans, integers, fixed point, key combos)
//! - `ini`: line tokenizer for the text document
//! - `codec`: strict parser and canonical renderer of the text document
//! - `mirror`: checksummed copy of the boot scratch byte in MCU registers
//! - `store`: reconciliation of defaults, text document and mirror
//! - `menu`: the interactive option menu model
//! - `firmware`: running build identity and version encoding
//! - `error`: Error types and result aliases
//! - `settings`: Persistent tool settings from configuration file
//!
//! ## Example
//!
//! ```ignore
//! use bootcfg_core::{BuildInfo, ConfigStore, SaveKind};
//! use bootcfg_platform::{DirFileStore, ImageRegisterBus};
//!
//! let files = DirFileStore::new("/media/sd/luma");
//! let bus = ImageRegisterBus::open("/media/sd/luma/mcu_registers.bin")?;
//! let mut store = ConfigStore::new(files, bus, BuildInfo::new());
//!
//! if !store.read_config() {
//!     println!("Using defaults");
//! }
//! store.apply_option("boot", "autoboot_emunand", "1")?;
//! store.write_config(SaveKind::MenuOptions)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod firmware;
pub mod ini;
pub mod menu;
pub mod mirror;
pub mod record;
pub mod settings;
pub mod store;
pub mod values;

pub use codec::{
    parse_document, parse_document_bytes, render_document, Field, CONFIG_FILE_NAME,
    MAX_DOCUMENT_SIZE,
};
pub use error::{Error, ParseError, ParseErrorKind, Result, ValueError};
pub use firmware::{
    BuildInfo, BuildMode, FirmwareVersion, CONFIG_VERSION_MAJOR, CONFIG_VERSION_MINOR,
};
pub use menu::{
    run_menu, Button, ConfigMenu, MenuAction, MenuContext, MenuEntry, MenuExit, MenuHooks,
    MenuInput, MenuOutcome, NoHooks, PinChange,
};
pub use mirror::{
    McuMirror, MirrorCheck, MirrorStatus, MirrorStore, NoUpgrade, ResetReason, UpgradeProcess,
    MIRROR_INDEX, MIRROR_SIZE,
};
pub use record::{
    AudioOutput, AutobootMode, BootFlag, Choice, ConfigRecord, MultiOption, NewCpuMode,
    ScreenFilterProfile, SplashPosition,
};
pub use settings::{DeviceSettings, FirmwareSettings, PathSettings, Settings, SettingsError};
pub use store::{ConfigStore, ConfigurationStatus, LoadReport, SaveKind, SaveReport};
pub use values::{FixedPoint, KeyCombo};
