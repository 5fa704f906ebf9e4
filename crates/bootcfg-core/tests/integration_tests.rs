//! Integration tests for bootcfg-core
//!
//! These tests drive the public API end to end: documents through the
//! codec, stores through the reconciliation controller, and both backed by
//! real files in temporary directories.

use bootcfg_core::{
    parse_document, parse_document_bytes, render_document, run_menu, BootFlag, BuildInfo,
    BuildMode, Button, ConfigRecord, ConfigStore, ConfigurationStatus, Error, FirmwareVersion,
    FixedPoint, KeyCombo, McuMirror, MenuContext, MenuExit, MenuInput, MirrorStatus, MultiOption,
    NoHooks, ParseErrorKind, ResetReason, SaveKind, ScreenFilterProfile, UpgradeProcess,
    CONFIG_FILE_NAME, CONFIG_VERSION_MAJOR, MAX_DOCUMENT_SIZE, MIRROR_INDEX, MIRROR_SIZE,
};
use bootcfg_platform::{
    DirFileStore, FileStore, ImageRegisterBus, MemoryFileStore, MemoryRegisterBus,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::TempDir;

fn build() -> BuildInfo {
    BuildInfo::new()
}

fn mirror_bytes(bus: &MemoryRegisterBus) -> [u8; MIRROR_SIZE] {
    let start = usize::from(MIRROR_INDEX);
    let mut bytes = [0u8; MIRROR_SIZE];
    bytes.copy_from_slice(&bus.space()[start..start + MIRROR_SIZE]);
    bytes
}

fn bus_with_mirror(mirror: McuMirror) -> MemoryRegisterBus {
    let mut bus = MemoryRegisterBus::new();
    let start = usize::from(MIRROR_INDEX);
    bus.space_mut()[start..start + MIRROR_SIZE].copy_from_slice(&mirror.to_bytes());
    bus
}

fn running_version() -> u16 {
    build().version.encoded_mcu()
}

/// Record with every field drawn from its valid domain
fn random_record(rng: &mut StdRng) -> ConfigRecord {
    let mut record = ConfigRecord::defaults(&build());

    for flag in BootFlag::ALL {
        record.set_flag(flag, rng.random::<bool>());
    }
    for option in MultiOption::ALL {
        let value = rng.random_range(0..option.choice_count());
        record.set_multi(option, value).unwrap();
    }

    record.set_splash_duration(rng.random::<u32>());
    record.hbldr_3dsx_title_id = rng.random::<u64>();
    record.autoboot_twl_title_id = rng.random::<u64>();

    let mut combo = rng.random::<u32>() & bootcfg_core::values::ASSIGNED_KEYS_MASK;
    if combo == 0 {
        combo = 1;
    }
    record.set_menu_combo(KeyCombo(combo)).unwrap();

    record.set_plugin_loader_enabled(rng.random::<bool>());
    record
        .set_ntp_tz_offset(rng.random_range(-779..=899))
        .unwrap();
    record
        .set_autoboot_app_mem_type(rng.random_range(0..=4))
        .unwrap();
    record
        .set_volume_slider_override(rng.random_range(-1..=100))
        .unwrap();

    for top in [true, false] {
        let profile = ScreenFilterProfile {
            cct: rng.random_range(1000..=25100),
            gamma: FixedPoint(rng.random_range(0..=800_000_000)),
            contrast: FixedPoint(rng.random_range(0..=25_500_000_000)),
            brightness: FixedPoint(rng.random_range(-100_000_000..=100_000_000)),
            invert: rng.random::<bool>(),
            color_curve_correction: rng.random_range(0..=2),
        };
        record.set_screen_filter(top, profile).unwrap();
    }

    record
}

// ============================================================================
// Codec round trip
// ============================================================================

#[test]
fn test_default_record_roundtrip() {
    let record = ConfigRecord::defaults(&build());
    let text = render_document(&record, &build()).unwrap();
    let parsed = parse_document(&text).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn test_gdb_default_record_roundtrip() {
    let gdb = BuildInfo::new().build_mode(BuildMode::Gdb);
    let record = ConfigRecord::defaults(&gdb);
    let text = render_document(&record, &gdb).unwrap();
    assert!(text.contains("rosalina_menu_combo = L+Up\n"));
    assert_eq!(parse_document(&text).unwrap(), record);
}

#[test]
fn test_random_records_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0x0b00_7cf9);
    for _ in 0..200 {
        let record = random_record(&mut rng);
        let text = render_document(&record, &build()).unwrap();
        assert!(text.len() < MAX_DOCUMENT_SIZE);
        let parsed = parse_document(&text)
            .unwrap_or_else(|e| panic!("rendered document failed to parse: {e}\n{text}"));
        assert_eq!(parsed, record);
    }
}

#[test]
fn test_render_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let record = random_record(&mut rng);
        let first = render_document(&record, &build()).unwrap();
        let second = render_document(&parse_document(&first).unwrap(), &build()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_hand_written_document_canonicalises() {
    let text = "\u{feff}[meta]\n\
                config_version_major = 3\n\
                config_version_minor: 13\n\
                \n\
                [boot]  ; trailing comment\n\
                autoboot_emunand = 1\n\
                brightness_level=2\n\
                splash_position = After Payloads\n\
                \n\
                [screen_filters]\n\
                screen_filters_top_gamma = 1.50000000\n\
                screen_filters_bot_brightness = -0.25\n";
    let record = parse_document(text).unwrap();
    assert!(record.flag(BootFlag::AutobootEmunand));
    assert_eq!(record.brightness_level(), 2);
    assert_eq!(
        record.splash_position(),
        bootcfg_core::SplashPosition::AfterPayloads
    );
    assert_eq!(record.top_screen_filter.gamma, FixedPoint(150_000_000));
    assert_eq!(record.bottom_screen_filter.brightness, FixedPoint(-25_000_000));

    let rendered = render_document(&record, &build()).unwrap();
    assert!(rendered.contains("splash_position = after payloads\n"));
    assert!(rendered.contains("screen_filters_top_gamma = 1.5\n"));
    assert!(rendered.contains("screen_filters_bot_brightness = -0.25\n"));
}

#[test]
fn test_document_errors_carry_location() {
    let text = "[meta]\nconfig_version_major = 3\n[boot]\nbrightness_level = 5\n";
    let err = parse_document(text).unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.section, "boot");
    assert_eq!(err.key, "brightness_level");
    assert!(matches!(err.kind, ParseErrorKind::InvalidValue(_)));

    let err = parse_document("[boot]\nno_such_option = 1\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind, ParseErrorKind::UnknownKey);

    let err = parse_document("[nowhere]\n").unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.kind, ParseErrorKind::UnknownSection);

    let err = parse_document("[boot\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
}

#[test]
fn test_oversized_document_rejected() {
    let mut text = String::from("[boot]\n");
    while text.len() < MAX_DOCUMENT_SIZE {
        text.push_str("; padding padding padding padding\n");
    }
    let err = parse_document_bytes(text.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::DocumentTooLarge { .. }));
}

// ============================================================================
// Reconciliation
// ============================================================================

#[test]
fn test_end_to_end_boot_options() {
    let text = format!(
        "[meta]\nconfig_version_major = {}\nconfig_version_minor = {}\n\n\
         [boot]\nautoboot_emunand = 1\nbrightness_level = 2\n",
        CONFIG_VERSION_MAJOR,
        bootcfg_core::CONFIG_VERSION_MINOR
    );
    let files = MemoryFileStore::with_file(CONFIG_FILE_NAME, text);
    let bus = bus_with_mirror(McuMirror::new(running_version(), 0x5A));

    let mut store = ConfigStore::new(files, bus, build());
    assert!(store.read_config());
    assert_eq!(store.status(), ConfigurationStatus::Modify);

    let record = store.record();
    assert!(record.flag(BootFlag::AutobootEmunand));
    assert_eq!(record.brightness_level(), 2);
    assert_eq!(record.multi(MultiOption::Brightness), 2);
    assert_eq!(record.boot_config, 0x5A);
    // Keys missing from the document stay zero
    assert_eq!(record.splash_duration_ms, 0);
    assert!(!record.flag(BootFlag::ShowSystemSettingsString));
}

#[test]
fn test_version_skew_yields_defaults() {
    let mut record = ConfigRecord::defaults(&build());
    record.set_flag(BootFlag::EnableGamePatching, true);
    let text = render_document(&record, &build())
        .unwrap()
        .replace(
            &format!("config_version_major = {}", CONFIG_VERSION_MAJOR),
            "config_version_major = 2",
        );

    let files = MemoryFileStore::with_file(CONFIG_FILE_NAME, text);
    let bus = bus_with_mirror(McuMirror::new(running_version(), 7));
    let mut store = ConfigStore::new(files, bus, build());

    assert!(!store.read_config());
    assert_eq!(store.status(), ConfigurationStatus::Create);
    let mut expected = ConfigRecord::defaults(&build());
    expected.boot_config = 7;
    assert_eq!(store.record(), &expected);
    let report = store.last_load().unwrap();
    assert!(report.used_defaults);
    assert!(report.reason.as_deref().unwrap().contains("format"));
}

#[test]
fn test_first_save_after_create_forces_both_stores() {
    let mut store = ConfigStore::new(MemoryFileStore::new(), MemoryRegisterBus::new(), build());
    assert!(!store.read_config());

    let report = store.write_config(SaveKind::MenuOptions).unwrap();
    assert!(report.text_written);
    let report = store.write_config(SaveKind::BootConfig).unwrap();
    assert!(report.mirror_written);
    assert_eq!(store.status(), ConfigurationStatus::Modify);

    // Nothing changed since, so nothing is written again
    let report = store.write_config(SaveKind::MenuOptions).unwrap();
    assert!(!report.wrote_anything());
    let report = store.write_config(SaveKind::BootConfig).unwrap();
    assert!(!report.wrote_anything());

    let (files, bus) = store.into_parts();
    let text = std::str::from_utf8(files.get(CONFIG_FILE_NAME).unwrap()).unwrap();
    assert_eq!(parse_document(text).unwrap(), ConfigRecord::defaults(&build()));
    let mirror = McuMirror::from_bytes(mirror_bytes(&bus));
    assert!(mirror.is_intact());
    assert_eq!(mirror.version, running_version());
}

#[test]
fn test_dirty_checks_are_independent() {
    let record = ConfigRecord::defaults(&build());
    let text = render_document(&record, &build()).unwrap();
    let files = MemoryFileStore::with_file(CONFIG_FILE_NAME, text);
    let bus = bus_with_mirror(McuMirror::new(running_version(), 1));
    let mut store = ConfigStore::new(files, bus, build());
    assert!(store.read_config());

    store.record_mut().boot_config = 2;
    let report = store.write_config(SaveKind::MenuOptions).unwrap();
    assert!(!report.text_written);
    let report = store.write_config(SaveKind::BootConfig).unwrap();
    assert!(report.mirror_written);

    store
        .record_mut()
        .set_flag(BootFlag::CutWifiSleepMode, true);
    let report = store.write_config(SaveKind::MenuOptions).unwrap();
    assert!(report.text_written);
    assert_eq!(store.files().writes(), 1);
}

#[test]
fn test_corrupt_mirror_resets_and_rewrites() {
    let record = ConfigRecord::defaults(&build());
    let text = render_document(&record, &build()).unwrap();
    let files = MemoryFileStore::with_file(CONFIG_FILE_NAME, text);

    let mut bytes = McuMirror::new(running_version(), 9).to_bytes();
    bytes[2] ^= 0x10;
    let bus = bus_with_mirror(McuMirror::from_bytes(bytes));

    let mut store = ConfigStore::new(files, bus, build());
    assert!(!store.read_config());
    assert_eq!(store.record().boot_config, 0);
    assert!(matches!(
        store.last_load().unwrap().mirror,
        MirrorStatus::Reset {
            reason: ResetReason::Checksum { .. }
        }
    ));

    let (_, bus) = store.into_parts();
    let repaired = McuMirror::from_bytes(mirror_bytes(&bus));
    assert!(repaired.is_intact());
    assert_eq!(repaired.boot_config, 0);
    assert_eq!(repaired.version, running_version());
}

#[test]
fn test_newer_mirror_is_discarded() {
    let record = ConfigRecord::defaults(&build());
    let text = render_document(&record, &build()).unwrap();
    let files = MemoryFileStore::with_file(CONFIG_FILE_NAME, text);
    let newer = FirmwareVersion::new(99, 0, 0).encoded_mcu();
    let bus = bus_with_mirror(McuMirror::new(newer, 3));

    let mut store = ConfigStore::new(files, bus, build());
    assert!(!store.read_config());
    assert!(matches!(
        store.last_load().unwrap().mirror,
        MirrorStatus::Reset {
            reason: ResetReason::NewerVersion { .. }
        }
    ));
}

struct SharedUpgrade(Rc<RefCell<Vec<(u16, u16)>>>);

impl UpgradeProcess for SharedUpgrade {
    fn upgrade(&mut self, from: u16, to: u16, _record: &mut ConfigRecord) -> bootcfg_core::Result<()> {
        self.0.borrow_mut().push((from, to));
        Ok(())
    }
}

#[test]
fn test_older_mirror_runs_upgrade_and_clears_boot_config() {
    let record = ConfigRecord::defaults(&build());
    let text = render_document(&record, &build()).unwrap();
    let files = MemoryFileStore::with_file(CONFIG_FILE_NAME, text);
    let older = FirmwareVersion::new(12, 0, 0).encoded_mcu();
    let bus = bus_with_mirror(McuMirror::new(older, 0x33));

    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut store = ConfigStore::new(files, bus, build())
        .with_upgrade(Box::new(SharedUpgrade(Rc::clone(&calls))));

    assert!(store.read_config());
    assert_eq!(store.record().boot_config, 0);
    assert_eq!(
        store.last_load().unwrap().mirror,
        MirrorStatus::Upgraded { from: older }
    );
    assert_eq!(*calls.borrow(), vec![(older, running_version())]);

    let (_, bus) = store.into_parts();
    let stamped = McuMirror::from_bytes(mirror_bytes(&bus));
    assert_eq!(stamped.version, running_version());
    assert_eq!(stamped.boot_config, 0);
    assert!(stamped.is_intact());
}

#[test]
fn test_mirror_write_failure_is_not_fatal() {
    let mut bus = MemoryRegisterBus::new();
    bus.set_fail_writes(true);
    let mut store = ConfigStore::new(MemoryFileStore::new(), bus, build());
    assert!(!store.read_config());

    let report = store.write_config(SaveKind::BootConfig).unwrap();
    assert!(!report.mirror_written);
    assert!(report.mirror_error.is_some());

    let report = store.write_config(SaveKind::MenuOptions).unwrap();
    assert!(report.text_written);
}

#[test]
fn test_text_write_failure_is_fatal() {
    let mut files = MemoryFileStore::new();
    files.set_fail_writes(true);
    let mut store = ConfigStore::new(files, MemoryRegisterBus::new(), build());
    assert!(!store.read_config());

    let err = store.write_config(SaveKind::MenuOptions).unwrap_err();
    assert!(matches!(err, Error::TextStoreWrite { .. }));
}

// ============================================================================
// Menu over a store
// ============================================================================

struct Buttons(std::vec::IntoIter<Button>);

impl MenuInput for Buttons {
    fn next_button(&mut self) -> std::io::Result<Option<Button>> {
        Ok(self.0.next())
    }
}

#[test]
fn test_menu_session_persists_changes() {
    let record = ConfigRecord::defaults(&build());
    let text = render_document(&record, &build()).unwrap();
    let files = MemoryFileStore::with_file(CONFIG_FILE_NAME, text);
    let bus = bus_with_mirror(McuMirror::new(running_version(), 0));
    let mut store = ConfigStore::new(files, bus, build());
    assert!(store.read_config());

    let ctx = MenuContext::default();
    // First visible entry is "Enable loading external FIRMs and modules"
    let mut input = Buttons(vec![Button::A, Button::Start].into_iter());
    let outcome = run_menu(&mut store, &ctx, &mut input, &mut NoHooks).unwrap();

    assert_eq!(outcome.exit, MenuExit::Save);
    assert!(outcome.save.unwrap().text_written);
    assert!(outcome.pin_change.is_none());

    let (files, _) = store.into_parts();
    let saved = parse_document(std::str::from_utf8(files.get(CONFIG_FILE_NAME).unwrap()).unwrap())
        .unwrap();
    assert!(saved.flag(BootFlag::EnableExternalFirmAndModules));
}

// ============================================================================
// Real files
// ============================================================================

#[test]
fn test_store_over_directory_and_register_image() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("mcu_registers.bin");

    {
        let files = DirFileStore::new(temp_dir.path());
        let bus = ImageRegisterBus::open(&image).unwrap();
        let mut store = ConfigStore::new(files, bus, build());
        assert!(!store.read_config());
        store.apply_option("boot", "autoboot_emunand", "1").unwrap();
        store.record_mut().boot_config = 0x42;
        store.write_config(SaveKind::BootConfig).unwrap();
        store.write_config(SaveKind::MenuOptions).unwrap();
    }

    assert!(temp_dir.path().join(CONFIG_FILE_NAME).exists());
    assert!(image.exists());

    let files = DirFileStore::new(temp_dir.path());
    let bus = ImageRegisterBus::open(&image).unwrap();
    let mut store = ConfigStore::new(files, bus, build());
    assert!(store.read_config());
    assert!(store.record().flag(BootFlag::AutobootEmunand));
    assert_eq!(store.record().boot_config, 0x42);
    assert_eq!(
        store.option_value("boot", "autoboot_emunand").unwrap(),
        "1"
    );
}

#[test]
fn test_custom_file_name() {
    let temp_dir = TempDir::new().unwrap();
    let files = DirFileStore::new(temp_dir.path());
    let mut store = ConfigStore::new(files, MemoryRegisterBus::new(), build())
        .with_file_name("alt.ini");
    store.read_config();
    store.write_config(SaveKind::MenuOptions).unwrap();

    let mut files = DirFileStore::new(temp_dir.path());
    let bytes = files.read("alt.ini", MAX_DOCUMENT_SIZE - 1).unwrap();
    assert!(parse_document_bytes(&bytes).is_ok());
}
