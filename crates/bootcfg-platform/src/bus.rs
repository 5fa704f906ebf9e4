//! Emulated MCU register bus

use crate::{
    PlatformError, RegisterBus, Result, FREE_REGISTER_SPACE, REG_FREE_DATA, REG_FREE_INDEX,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Free register space of the MCU held in memory.
///
/// `REG_FREE_INDEX` selects a byte offset, bulk accesses on `REG_FREE_DATA`
/// start there and advance the offset.
#[derive(Debug, Clone)]
pub struct MemoryRegisterBus {
    space: [u8; FREE_REGISTER_SPACE],
    index: usize,
    fail_reads: bool,
    fail_writes: bool,
    data_writes: usize,
}

impl Default for MemoryRegisterBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegisterBus {
    /// Create a bus with zeroed register space
    pub fn new() -> Self {
        Self::from_space([0; FREE_REGISTER_SPACE])
    }

    /// Create a bus from an existing register space snapshot
    pub fn from_space(space: [u8; FREE_REGISTER_SPACE]) -> Self {
        Self {
            space,
            index: 0,
            fail_reads: false,
            fail_writes: false,
            data_writes: 0,
        }
    }

    /// Whole register space
    pub fn space(&self) -> &[u8; FREE_REGISTER_SPACE] {
        &self.space
    }

    /// Mutable register space, for planting test data
    pub fn space_mut(&mut self) -> &mut [u8; FREE_REGISTER_SPACE] {
        &mut self.space
    }

    /// Make every subsequent bulk read fail
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make every subsequent bulk write fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful bulk writes
    pub fn data_writes(&self) -> usize {
        self.data_writes
    }

    fn window(&self, reg: u8, len: usize) -> Result<std::ops::Range<usize>> {
        if reg != REG_FREE_DATA {
            return Err(PlatformError::Bus {
                reg,
                message: "not a bulk data register".to_string(),
            });
        }
        let end = self.index + len;
        if end > FREE_REGISTER_SPACE {
            return Err(PlatformError::Bus {
                reg,
                message: format!(
                    "{} bytes at index {} overrun the {} byte register space",
                    len, self.index, FREE_REGISTER_SPACE
                ),
            });
        }
        Ok(self.index..end)
    }
}

impl RegisterBus for MemoryRegisterBus {
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()> {
        if reg != REG_FREE_INDEX {
            return Err(PlatformError::Bus {
                reg,
                message: "register is read-only or unmapped".to_string(),
            });
        }
        if usize::from(value) >= FREE_REGISTER_SPACE {
            return Err(PlatformError::Bus {
                reg,
                message: format!("index {} outside register space", value),
            });
        }
        self.index = usize::from(value);
        Ok(())
    }

    fn read_reg_buf(&mut self, reg: u8, buf: &mut [u8]) -> Result<()> {
        if self.fail_reads {
            return Err(PlatformError::Bus {
                reg,
                message: "read NACK".to_string(),
            });
        }
        let range = self.window(reg, buf.len())?;
        buf.copy_from_slice(&self.space[range.clone()]);
        self.index = range.end % FREE_REGISTER_SPACE;
        Ok(())
    }

    fn write_reg_buf(&mut self, reg: u8, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(PlatformError::Bus {
                reg,
                message: "write NACK".to_string(),
            });
        }
        let range = self.window(reg, data.len())?;
        self.space[range.clone()].copy_from_slice(data);
        self.index = range.end % FREE_REGISTER_SPACE;
        self.data_writes += 1;
        Ok(())
    }
}

/// Register space persisted to an image file after every bulk write.
#[derive(Debug)]
pub struct ImageRegisterBus {
    path: PathBuf,
    inner: MemoryRegisterBus,
}

impl ImageRegisterBus {
    /// Open an image file, starting from zeroed registers if it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let bytes = fs::read(&path)?;
            let space: [u8; FREE_REGISTER_SPACE] =
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| PlatformError::InvalidImage {
                        path: path.clone(),
                        message: format!(
                            "expected {} bytes, found {}",
                            FREE_REGISTER_SPACE,
                            bytes.len()
                        ),
                    })?;
            tracing::debug!("Loaded register image {:?}", path);
            MemoryRegisterBus::from_space(space)
        } else {
            tracing::debug!("No register image at {:?}, starting blank", path);
            MemoryRegisterBus::new()
        };
        Ok(Self { path, inner })
    }

    /// Path of the backing image
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current register space
    pub fn space(&self) -> &[u8; FREE_REGISTER_SPACE] {
        self.inner.space()
    }

    fn persist(&self, space: &[u8; FREE_REGISTER_SPACE]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, space)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl RegisterBus for ImageRegisterBus {
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()> {
        self.inner.write_reg(reg, value)
    }

    fn read_reg_buf(&mut self, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.inner.read_reg_buf(reg, buf)
    }

    fn write_reg_buf(&mut self, reg: u8, data: &[u8]) -> Result<()> {
        // Registers only change once the image on disk holds the new bytes
        let mut staged = self.inner.clone();
        staged.write_reg_buf(reg, data)?;
        self.persist(staged.space())?;
        self.inner = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_select_then_read() {
        let mut bus = MemoryRegisterBus::new();
        bus.space_mut()[196..200].copy_from_slice(&[1, 2, 3, 4]);

        bus.write_reg(REG_FREE_INDEX, 196).unwrap();
        let mut buf = [0u8; 4];
        bus.read_reg_buf(REG_FREE_DATA, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn test_overrun_rejected() {
        let mut bus = MemoryRegisterBus::new();
        bus.write_reg(REG_FREE_INDEX, 198).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(
            bus.read_reg_buf(REG_FREE_DATA, &mut buf),
            Err(PlatformError::Bus { reg: REG_FREE_DATA, .. })
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut bus = MemoryRegisterBus::new();
        assert!(bus.write_reg(REG_FREE_INDEX, 200).is_err());
        assert!(bus.write_reg(0x30, 1).is_err());
    }

    #[test]
    fn test_write_counts_and_failures() {
        let mut bus = MemoryRegisterBus::new();
        bus.write_reg(REG_FREE_INDEX, 0).unwrap();
        bus.write_reg_buf(REG_FREE_DATA, &[9]).unwrap();
        assert_eq!(bus.data_writes(), 1);

        bus.set_fail_writes(true);
        bus.write_reg(REG_FREE_INDEX, 0).unwrap();
        assert!(bus.write_reg_buf(REG_FREE_DATA, &[7]).is_err());
        assert_eq!(bus.space()[0], 9);

        bus.set_fail_reads(true);
        let mut buf = [0u8; 1];
        assert!(bus.read_reg_buf(REG_FREE_DATA, &mut buf).is_err());
    }

    #[test]
    fn test_image_bus_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcu.bin");

        let mut bus = ImageRegisterBus::open(&path).unwrap();
        bus.write_reg(REG_FREE_INDEX, 196).unwrap();
        bus.write_reg_buf(REG_FREE_DATA, &[0xAA, 0xBB]).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), FREE_REGISTER_SPACE);

        let reopened = ImageRegisterBus::open(&path).unwrap();
        assert_eq!(&reopened.space()[196..198], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_image_bus_failed_persist_keeps_registers() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"file").unwrap();
        let path = blocker.join("mcu.bin");

        let mut bus = ImageRegisterBus::open(&path).unwrap();
        bus.write_reg(REG_FREE_INDEX, 196).unwrap();
        assert!(bus.write_reg_buf(REG_FREE_DATA, &[1, 2, 3, 4]).is_err());
        assert_eq!(bus.space(), &[0u8; FREE_REGISTER_SPACE]);

        // The select pointer is untouched too, so a read sees the old window
        let mut buf = [0xFFu8; 4];
        bus.read_reg_buf(REG_FREE_DATA, &mut buf).unwrap();
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn test_image_bus_rejects_bad_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcu.bin");
        fs::write(&path, [0u8; 12]).unwrap();

        let err = ImageRegisterBus::open(&path).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidImage { .. }));
    }
}
