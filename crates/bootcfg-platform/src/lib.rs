//! # Bootcfg Platform
//!
//! Collaborators the configuration store talks to: a bounded file store for
//! the text document and an indexed register bus for the battery-backed
//! mirror block.
//!
//! Both are blocking, single-owner interfaces. A register transfer is a
//! select (`write_reg` on the index register) followed by a bulk access on
//! the data register; nothing else may touch the bus between the two.
//!
//! ## Implementations
//!
//! - [`DirFileStore`]: files under a root directory, written atomically
//! - [`MemoryFileStore`]: in-memory files, for tests and dry runs
//! - [`MemoryRegisterBus`]: emulated free register space of the MCU
//! - [`ImageRegisterBus`]: the emulated register space persisted to an image file

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::path::PathBuf;
use thiserror::Error;

mod bus;
mod file;

pub use bus::{ImageRegisterBus, MemoryRegisterBus};
pub use file::{DirFileStore, MemoryFileStore};

/// Register holding the index into the free register space
pub const REG_FREE_INDEX: u8 = 0x60;

/// Register used for bulk access at the selected index
pub const REG_FREE_DATA: u8 = 0x61;

/// Size of the MCU free register space in bytes
pub const FREE_REGISTER_SPACE: usize = 200;

/// Platform errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not exist in the store
    #[error("File not found: {0}")]
    NotFound(String),

    /// File is larger than the caller's read buffer
    #[error("File {name} exceeds the {max} byte read limit")]
    TooLarge {
        /// Name of the file
        name: String,
        /// Maximum number of bytes the caller accepts
        max: usize,
    },

    /// Register access failed
    #[error("Register 0x{reg:02x} access failed: {message}")]
    Bus {
        /// Register address
        reg: u8,
        /// What went wrong
        message: String,
    },

    /// Image file for an emulated device is malformed
    #[error("Invalid register image {path}: {message}")]
    InvalidImage {
        /// Path of the image file
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Bounded whole-file storage.
///
/// Writes replace the file in one step; readers never observe a partially
/// written file.
pub trait FileStore {
    /// Read a whole file, failing with [`PlatformError::TooLarge`] when it
    /// does not fit in `max_len` bytes
    fn read(&mut self, name: &str, max_len: usize) -> Result<Vec<u8>>;

    /// Replace a file with `data`
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;
}

/// Indexed register bus of the MCU.
pub trait RegisterBus {
    /// Write a single register
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()>;

    /// Read `buf.len()` bytes from a register
    fn read_reg_buf(&mut self, reg: u8, buf: &mut [u8]) -> Result<()>;

    /// Write `data` to a register
    fn write_reg_buf(&mut self, reg: u8, data: &[u8]) -> Result<()>;
}

impl<T: FileStore + ?Sized> FileStore for Box<T> {
    fn read(&mut self, name: &str, max_len: usize) -> Result<Vec<u8>> {
        (**self).read(name, max_len)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        (**self).write(name, data)
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for Box<T> {
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()> {
        (**self).write_reg(reg, value)
    }

    fn read_reg_buf(&mut self, reg: u8, buf: &mut [u8]) -> Result<()> {
        (**self).read_reg_buf(reg, buf)
    }

    fn write_reg_buf(&mut self, reg: u8, data: &[u8]) -> Result<()> {
        (**self).write_reg_buf(reg, data)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlatformError::NotFound("config.ini".to_string());
        assert!(err.to_string().contains("config.ini"));

        let err = PlatformError::TooLarge {
            name: "config.ini".to_string(),
            max: 8191,
        };
        assert!(err.to_string().contains("8191"));

        let err = PlatformError::Bus {
            reg: 0x61,
            message: "nack".to_string(),
        };
        assert!(err.to_string().contains("0x61"));
        assert!(err.to_string().contains("nack"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let platform_err: PlatformError = io_err.into();
        assert!(matches!(platform_err, PlatformError::Io(_)));
    }

    #[test]
    fn test_boxed_collaborators_forward() {
        let mut files: Box<dyn FileStore> = Box::new(MemoryFileStore::new());
        files.write("a.ini", b"x = 1").unwrap();
        assert_eq!(files.read("a.ini", 16).unwrap(), b"x = 1");

        let mut bus: Box<dyn RegisterBus> = Box::new(MemoryRegisterBus::new());
        bus.write_reg(REG_FREE_INDEX, 10).unwrap();
        bus.write_reg_buf(REG_FREE_DATA, &[1, 2, 3]).unwrap();
        bus.write_reg(REG_FREE_INDEX, 10).unwrap();
        let mut buf = [0u8; 3];
        bus.read_reg_buf(REG_FREE_DATA, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }
}
