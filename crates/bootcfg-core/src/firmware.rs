//! Running firmware identity
//!
//! The loader stamps its own version into the hardware mirror and into the
//! header of the text document. [`BuildInfo`] carries that identity plus the
//! build flavour, which changes one default.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Major version of the text document format
pub const CONFIG_VERSION_MAJOR: u16 = 3;

/// Minor version of the text document format
pub const CONFIG_VERSION_MINOR: u16 = 13;

/// Default product name shown in the document header
pub const DEFAULT_PRODUCT_NAME: &str = "Polari3DS-ITA";

/// Firmware version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// Major version
    pub major: u8,
    /// Minor version (5 bits survive in the mirror)
    pub minor: u8,
    /// Build number (3 bits survive in the mirror)
    pub build: u8,
}

impl FirmwareVersion {
    /// Create a version triple
    pub const fn new(major: u8, minor: u8, build: u8) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// Packed 16-bit form stored in the hardware mirror
    pub const fn encoded_mcu(self) -> u16 {
        ((self.major as u16) << 8) | (((self.minor & 0x1F) as u16) << 5) | (self.build & 7) as u16
    }

    /// Unpack the 16-bit mirror form
    pub const fn from_encoded_mcu(encoded: u16) -> Self {
        Self {
            major: (encoded >> 8) as u8,
            minor: ((encoded >> 5) & 0x1F) as u8,
            build: (encoded & 7) as u8,
        }
    }
}

impl Default for FirmwareVersion {
    fn default() -> Self {
        Self::new(13, 1, 0)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.build != 0 {
            write!(f, "v{}.{}.{}", self.major, self.minor, self.build)
        } else {
            write!(f, "v{}.{}", self.major, self.minor)
        }
    }
}

/// Build flavour of the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Regular build
    #[default]
    Standard,
    /// Build with the debugger stub, which uses a different menu combo
    Gdb,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Standard => write!(f, "standard"),
            BuildMode::Gdb => write!(f, "gdb"),
        }
    }
}

/// Identity of the running loader build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    /// Product name for the document header
    pub product: String,

    /// Running firmware version
    pub version: FirmwareVersion,

    /// Commit the build was made from
    pub commit_hash: u32,

    /// Release builds omit the revision suffix
    pub release: bool,

    /// Build flavour
    pub build_mode: BuildMode,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT_NAME.to_string(),
            version: FirmwareVersion::default(),
            commit_hash: 0,
            release: true,
            build_mode: BuildMode::Standard,
        }
    }
}

impl BuildInfo {
    /// Create build info with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set product name
    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Set firmware version
    pub fn version(mut self, version: FirmwareVersion) -> Self {
        self.version = version;
        self
    }

    /// Set commit hash
    pub fn commit_hash(mut self, hash: u32) -> Self {
        self.commit_hash = hash;
        self
    }

    /// Set release flag
    pub fn release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    /// Set build mode
    pub fn build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = mode;
        self
    }

    /// `"<product> v<major>.<minor>[.<build>]"`
    pub fn version_string(&self) -> String {
        format!("{} {}", self.product, self.version)
    }

    /// Empty on release builds, `-<commit>` otherwise
    pub fn revision_suffix(&self) -> String {
        if self.release {
            String::new()
        } else {
            format!("-{:08x}", self.commit_hash)
        }
    }
}
