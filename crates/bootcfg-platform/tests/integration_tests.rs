//! Integration tests for bootcfg-platform
//!
//! These tests exercise the collaborators through their traits, the way the
//! configuration store uses them.

use bootcfg_platform::*;
use tempfile::TempDir;

/// Select an index, then read `len` bytes from the data register
fn read_window(bus: &mut dyn RegisterBus, index: u8, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    bus.write_reg(REG_FREE_INDEX, index)?;
    bus.read_reg_buf(REG_FREE_DATA, &mut buf)?;
    Ok(buf)
}

/// Select an index, then write `data` to the data register
fn write_window(bus: &mut dyn RegisterBus, index: u8, data: &[u8]) -> Result<()> {
    bus.write_reg(REG_FREE_INDEX, index)?;
    bus.write_reg_buf(REG_FREE_DATA, data)
}

// ============================================================================
// File stores
// ============================================================================

#[test]
fn test_file_stores_behave_alike() {
    let temp_dir = TempDir::new().unwrap();
    let stores: Vec<Box<dyn FileStore>> = vec![
        Box::new(DirFileStore::new(temp_dir.path())),
        Box::new(MemoryFileStore::new()),
    ];

    for mut store in stores {
        assert!(matches!(
            store.read("config.ini", 16),
            Err(PlatformError::NotFound(_))
        ));

        store.write("config.ini", b"[boot]\n").unwrap();
        assert_eq!(store.read("config.ini", 16).unwrap(), b"[boot]\n");

        // Exactly at the limit is fine, one past is not
        assert_eq!(store.read("config.ini", 7).unwrap().len(), 7);
        assert!(matches!(
            store.read("config.ini", 6),
            Err(PlatformError::TooLarge { max: 6, .. })
        ));

        store.write("config.ini", b"").unwrap();
        assert!(store.read("config.ini", 0).unwrap().is_empty());
    }
}

#[test]
fn test_dir_store_replaces_without_leftovers() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = DirFileStore::new(temp_dir.path());

    store.write("config.ini", &[b'x'; 4096]).unwrap();
    store.write("config.ini", b"short").unwrap();

    assert_eq!(
        std::fs::read(temp_dir.path().join("config.ini")).unwrap(),
        b"short"
    );
    let names: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names.len(), 1);
}

#[test]
fn test_dir_store_nested_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("sd").join("luma");
    let mut store = DirFileStore::new(&root);
    assert_eq!(store.root(), root.as_path());

    store.write("config.ini", b"a").unwrap();
    assert!(store.path_of("config.ini").exists());
}

// ============================================================================
// Register buses
// ============================================================================

#[test]
fn test_select_then_transfer() {
    let mut bus = MemoryRegisterBus::new();
    write_window(&mut bus, 196, &[0x20, 0x0D, 0x00, 0xD2]).unwrap();
    assert_eq!(
        read_window(&mut bus, 196, 4).unwrap(),
        vec![0x20, 0x0D, 0x00, 0xD2]
    );
    assert_eq!(bus.data_writes(), 1);
}

#[test]
fn test_transfer_advances_index() {
    let mut bus = MemoryRegisterBus::new();
    write_window(&mut bus, 10, &[1, 2]).unwrap();
    bus.write_reg_buf(REG_FREE_DATA, &[3, 4]).unwrap();
    assert_eq!(read_window(&mut bus, 10, 4).unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_last_window_of_register_space() {
    let mut bus = MemoryRegisterBus::new();
    let last = (FREE_REGISTER_SPACE - 4) as u8;
    write_window(&mut bus, last, &[9, 9, 9, 9]).unwrap();
    assert!(write_window(&mut bus, last + 1, &[9, 9, 9, 9]).is_err());
    assert!(read_window(&mut bus, last, 5).is_err());
}

#[test]
fn test_wrong_registers_rejected() {
    let mut bus = MemoryRegisterBus::new();
    assert!(matches!(
        bus.write_reg(REG_FREE_DATA, 0),
        Err(PlatformError::Bus { reg: REG_FREE_DATA, .. })
    ));
    let mut buf = [0u8; 1];
    assert!(matches!(
        bus.read_reg_buf(REG_FREE_INDEX, &mut buf),
        Err(PlatformError::Bus { reg: REG_FREE_INDEX, .. })
    ));
}

#[test]
fn test_injected_failures() {
    let mut bus = MemoryRegisterBus::new();
    bus.set_fail_reads(true);
    assert!(read_window(&mut bus, 0, 1).is_err());
    bus.set_fail_reads(false);

    bus.set_fail_writes(true);
    assert!(write_window(&mut bus, 0, &[1]).is_err());
    assert_eq!(bus.space()[0], 0);
    assert_eq!(bus.data_writes(), 0);
}

#[test]
fn test_image_bus_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("regs").join("mcu_registers.bin");

    {
        let mut bus = ImageRegisterBus::open(&image).unwrap();
        assert!(!image.exists());
        write_window(&mut bus, 196, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
    }

    assert_eq!(
        std::fs::metadata(&image).unwrap().len(),
        FREE_REGISTER_SPACE as u64
    );

    let mut bus = ImageRegisterBus::open(&image).unwrap();
    assert_eq!(bus.path(), image.as_path());
    assert_eq!(
        read_window(&mut bus, 196, 4).unwrap(),
        vec![0xAA, 0xBB, 0xCC, 0xDD]
    );
}

#[test]
fn test_image_bus_rejects_truncated_image() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("mcu_registers.bin");
    std::fs::write(&image, [0u8; 16]).unwrap();

    let err = ImageRegisterBus::open(&image).unwrap_err();
    assert!(matches!(err, PlatformError::InvalidImage { .. }));
    assert!(err.to_string().contains("16"));
}
