//! Fuzz test for mirror block decoding
//!
//! Plants arbitrary bytes in the register space and runs the read policy.

#![no_main]

use bootcfg_core::mirror::{McuMirror, MirrorStatus, MirrorStore, NoUpgrade, MIRROR_INDEX, MIRROR_SIZE};
use bootcfg_core::{ConfigRecord, FirmwareVersion};
use bootcfg_platform::MemoryRegisterBus;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: [u8; MIRROR_SIZE]| {
    let decoded = McuMirror::from_bytes(data);
    assert_eq!(decoded.to_bytes(), data);

    let mut bus = MemoryRegisterBus::new();
    let start = usize::from(MIRROR_INDEX);
    bus.space_mut()[start..start + MIRROR_SIZE].copy_from_slice(&data);

    let mut store = MirrorStore::new(bus, FirmwareVersion::default());
    let mut record = ConfigRecord::zeroed();
    let status = store.load(&mut record, &mut NoUpgrade);

    if !decoded.is_intact() {
        assert!(matches!(status, MirrorStatus::Reset { .. }));
    }

    // Whatever was planted, the block is intact after the read policy ran
    let mut after = [0u8; MIRROR_SIZE];
    after.copy_from_slice(&store.bus().space()[start..start + MIRROR_SIZE]);
    let after = McuMirror::from_bytes(after);
    assert!(after.is_intact());
    assert_eq!(after.boot_config, record.boot_config);
});
