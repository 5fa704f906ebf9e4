//! Battery-backed mirror in the MCU free register space
//!
//! Four bytes at the top of the 200-byte free register space survive a
//! reboot: the running firmware version, the `boot_config` scratch byte and
//! a checksum over both.
//!
//! ```text
//! offset 196: u16 LE  encoded firmware version
//! offset 198: u8      boot_config
//! offset 199: u8      !(sum of bytes 196..199)
//! ```

use crate::error::Result;
use crate::firmware::FirmwareVersion;
use crate::record::ConfigRecord;
use bootcfg_platform::{RegisterBus, FREE_REGISTER_SPACE, REG_FREE_DATA, REG_FREE_INDEX};
use serde::Serialize;

/// Size of the mirror block in bytes
pub const MIRROR_SIZE: usize = 4;

/// Register index where the mirror block starts
pub const MIRROR_INDEX: u8 = (FREE_REGISTER_SPACE - MIRROR_SIZE) as u8;

/// Decoded mirror block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct McuMirror {
    /// Encoded version of the firmware that wrote the block
    pub version: u16,
    /// Scratch byte
    pub boot_config: u8,
    /// Stored checksum
    pub checksum: u8,
}

impl McuMirror {
    /// Build a block with a correct checksum
    pub fn new(version: u16, boot_config: u8) -> Self {
        let mut mirror = Self {
            version,
            boot_config,
            checksum: 0,
        };
        mirror.checksum = checksum(&mirror.to_bytes()[..MIRROR_SIZE - 1]);
        mirror
    }

    /// Decode the register bytes
    pub fn from_bytes(bytes: [u8; MIRROR_SIZE]) -> Self {
        Self {
            version: u16::from_le_bytes([bytes[0], bytes[1]]),
            boot_config: bytes[2],
            checksum: bytes[3],
        }
    }

    /// Encode to register bytes
    pub fn to_bytes(&self) -> [u8; MIRROR_SIZE] {
        let version = self.version.to_le_bytes();
        [version[0], version[1], self.boot_config, self.checksum]
    }

    /// Checksum the stored fields should have
    pub fn expected_checksum(&self) -> u8 {
        checksum(&self.to_bytes()[..MIRROR_SIZE - 1])
    }

    /// Whether the stored checksum matches
    pub fn is_intact(&self) -> bool {
        self.checksum == self.expected_checksum()
    }
}

/// Bitwise complement of the wrapping byte sum
pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Why the mirror block was discarded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResetReason {
    /// Stored checksum does not match the data
    Checksum {
        /// Checksum found in the registers
        stored: u8,
        /// Checksum of the data
        computed: u8,
    },
    /// Written by a newer firmware than the one running
    NewerVersion {
        /// Encoded version found in the registers
        stored: u16,
        /// Encoded running version
        running: u16,
    },
    /// The registers could not be read
    ReadFailed {
        /// Bus error text
        message: String,
    },
}

/// Outcome of loading the mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MirrorStatus {
    /// Block is intact and written by this version
    Valid,
    /// Block was written by an older version and has been restamped
    Upgraded {
        /// Encoded version found in the registers
        from: u16,
    },
    /// Block was discarded and rewritten from zero
    Reset {
        /// Why it was discarded
        reason: ResetReason,
    },
}

impl MirrorStatus {
    /// Whether the stored block was usable
    pub fn is_usable(&self) -> bool {
        !matches!(self, MirrorStatus::Reset { .. })
    }
}

/// Result of reading the block, before anything is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorCheck {
    /// Intact, same version
    Current(McuMirror),
    /// Intact, written by an older version
    Older(McuMirror),
    /// Unusable
    Invalid(ResetReason),
}

impl MirrorCheck {
    /// Whether the stored block will be kept
    pub fn is_usable(&self) -> bool {
        !matches!(self, MirrorCheck::Invalid(_))
    }
}

/// Migration hook run when the stored firmware version differs from the running one
pub trait UpgradeProcess {
    /// Migrate `record` from encoded version `from` to `to`
    fn upgrade(&mut self, from: u16, to: u16, record: &mut ConfigRecord) -> Result<()>;
}

/// Upgrade process with no migration steps
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpgrade;

impl UpgradeProcess for NoUpgrade {
    fn upgrade(&mut self, from: u16, to: u16, _record: &mut ConfigRecord) -> Result<()> {
        tracing::debug!("No upgrade steps from 0x{:04x} to 0x{:04x}", from, to);
        Ok(())
    }
}

/// Reads and writes the mirror block over a register bus
#[derive(Debug)]
pub struct MirrorStore<B: RegisterBus> {
    bus: B,
    running: u16,
}

impl<B: RegisterBus> MirrorStore<B> {
    /// Create a store for the given running firmware version
    pub fn new(bus: B, version: FirmwareVersion) -> Self {
        Self {
            bus,
            running: version.encoded_mcu(),
        }
    }

    /// Encoded running version
    pub fn running_version(&self) -> u16 {
        self.running
    }

    /// The underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The underlying bus, mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consume the store, returning the bus
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Select the mirror window, then read it
    pub fn read_raw(&mut self) -> bootcfg_platform::Result<McuMirror> {
        let mut bytes = [0u8; MIRROR_SIZE];
        self.bus.write_reg(REG_FREE_INDEX, MIRROR_INDEX)?;
        self.bus.read_reg_buf(REG_FREE_DATA, &mut bytes)?;
        Ok(McuMirror::from_bytes(bytes))
    }

    /// Stamp the running version and `boot_config`, then write the block in one transfer
    pub fn write(&mut self, boot_config: u8) -> bootcfg_platform::Result<McuMirror> {
        let mirror = McuMirror::new(self.running, boot_config);
        self.bus.write_reg(REG_FREE_INDEX, MIRROR_INDEX)?;
        self.bus.write_reg_buf(REG_FREE_DATA, &mirror.to_bytes())?;
        tracing::debug!(
            "Wrote mirror version 0x{:04x} boot_config 0x{:02x}",
            mirror.version,
            boot_config
        );
        Ok(mirror)
    }

    /// Read and classify the block without modifying anything
    pub fn inspect(&mut self) -> MirrorCheck {
        let mirror = match self.read_raw() {
            Ok(mirror) => mirror,
            Err(e) => {
                tracing::warn!("Failed to read the mirror block: {}", e);
                return MirrorCheck::Invalid(ResetReason::ReadFailed {
                    message: e.to_string(),
                });
            }
        };

        if !mirror.is_intact() {
            return MirrorCheck::Invalid(ResetReason::Checksum {
                stored: mirror.checksum,
                computed: mirror.expected_checksum(),
            });
        }
        if mirror.version > self.running {
            return MirrorCheck::Invalid(ResetReason::NewerVersion {
                stored: mirror.version,
                running: self.running,
            });
        }
        if mirror.version < self.running {
            MirrorCheck::Older(mirror)
        } else {
            MirrorCheck::Current(mirror)
        }
    }

    /// Apply the read policy for a classified block.
    ///
    /// Sets `record.boot_config`. Upgrade and rewrite failures are logged and
    /// do not change the outcome.
    pub fn reconcile(
        &mut self,
        check: MirrorCheck,
        record: &mut ConfigRecord,
        upgrade: &mut dyn UpgradeProcess,
    ) -> MirrorStatus {
        match check {
            MirrorCheck::Current(mirror) => {
                record.boot_config = mirror.boot_config;
                MirrorStatus::Valid
            }
            MirrorCheck::Older(mirror) => {
                tracing::info!(
                    "Mirror written by older firmware 0x{:04x}, upgrading to 0x{:04x}",
                    mirror.version,
                    self.running
                );
                // The restamped block starts from a cleared boot config
                record.boot_config = 0;
                self.upgrade_and_rewrite(mirror.version, record, upgrade);
                MirrorStatus::Upgraded {
                    from: mirror.version,
                }
            }
            MirrorCheck::Invalid(reason) => {
                tracing::warn!("Mirror block discarded: {:?}", reason);
                record.boot_config = 0;
                self.upgrade_and_rewrite(0, record, upgrade);
                MirrorStatus::Reset { reason }
            }
        }
    }

    /// Inspect and reconcile in one step
    pub fn load(
        &mut self,
        record: &mut ConfigRecord,
        upgrade: &mut dyn UpgradeProcess,
    ) -> MirrorStatus {
        let check = self.inspect();
        self.reconcile(check, record, upgrade)
    }

    fn upgrade_and_rewrite(
        &mut self,
        from: u16,
        record: &mut ConfigRecord,
        upgrade: &mut dyn UpgradeProcess,
    ) {
        if let Err(e) = upgrade.upgrade(from, self.running, record) {
            tracing::warn!("Upgrade process failed, continuing: {}", e);
        }
        if let Err(e) = self.write(record.boot_config) {
            tracing::warn!("Failed to rewrite the mirror block: {}", e);
        }
    }
}
