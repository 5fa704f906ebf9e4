//! Text document codec
//!
//! The document layout is one ordered [`TEMPLATE`] of sections, comments and
//! option fields. Rendering walks it top to bottom, and parsing resolves
//! `[section] key` pairs against the same list, so the set of keys accepted
//! is exactly the set of keys written.
//!
//! Parsing is all-or-nothing: the first bad line aborts with a
//! [`ParseError`] and no partially filled record escapes.

use crate::error::{Error, ParseError, ParseErrorKind, Result, ValueError};
use crate::firmware::{BuildInfo, CONFIG_VERSION_MAJOR, CONFIG_VERSION_MINOR};
use crate::ini::{self, Line};
use crate::record::{
    AudioOutput, AutobootMode, BootFlag, Choice, ConfigRecord, MultiOption, NewCpuMode,
    ScreenFilterProfile, SplashPosition, APP_MEM_TYPE_MAX, BRIGHTNESS_MAX, BRIGHTNESS_MIN,
    CCT_MAX, CCT_MIN, COLOR_CURVE_MAX, CONTRAST_MAX, GAMMA_MAX, PIN_DIGIT_CHOICES, TZ_OFFSET_MAX,
    TZ_OFFSET_MIN, VOLUME_OVERRIDE_DISABLED, VOLUME_OVERRIDE_MAX,
};
use crate::values::{
    format_fixed_point, parse_bool, parse_choice, parse_dec_int, parse_fixed_point, parse_hex,
    parse_key_combo, FixedPoint, KeyCombo,
};

/// Size of the text buffer; documents must be strictly smaller
pub const MAX_DOCUMENT_SIZE: usize = 0x2000;

/// Name of the document in the file store
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Which screen a filter option belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Top screen
    Top,
    /// Bottom screen
    Bottom,
}

/// One setting of a screen filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// Color temperature
    Cct,
    /// Color curve correction mode
    ColorCurve,
    /// Gamma
    Gamma,
    /// Contrast
    Contrast,
    /// Brightness
    Brightness,
    /// Color inversion
    Invert,
}

/// An option of the text document and the record field behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `[meta] config_version_major`
    MetaMajor,
    /// `[meta] config_version_minor`
    MetaMinor,
    /// A bit of the `config` word
    Flag(BootFlag),
    /// Default EmuNAND, 1..=4
    EmunandNumber,
    /// Brightness level, 1..=4
    BrightnessLevel,
    /// Splash position choice
    SplashPosition,
    /// Splash duration in milliseconds
    SplashDuration,
    /// PIN length
    PinDigits,
    /// New 3DS CPU mode choice
    NewCpu,
    /// Autoboot mode choice
    AutobootMode,
    /// Forced audio output choice
    AudioOutput,
    /// Homebrew launcher title ID
    HbldrTitleId,
    /// Menu button combo
    MenuCombo,
    /// Plugin loader enable bit
    PluginLoader,
    /// NTP timezone offset
    TzOffset,
    /// One setting of one screen filter
    Filter(Screen, FilterField),
    /// DSi autoboot title ID
    AutobootTwlTitleId,
    /// 3DS autoboot memory type
    AutobootAppMemType,
    /// Volume slider override
    VolumeOverride,
}

impl Field {
    /// Key of the option in its section
    pub const fn key(self) -> &'static str {
        use FilterField::*;
        use Screen::*;

        match self {
            Field::MetaMajor => "config_version_major",
            Field::MetaMinor => "config_version_minor",
            Field::Flag(flag) => flag.key(),
            Field::EmunandNumber => "default_emunand_number",
            Field::BrightnessLevel => "brightness_level",
            Field::SplashPosition => "splash_position",
            Field::SplashDuration => "splash_duration_ms",
            Field::PinDigits => "pin_lock_num_digits",
            Field::NewCpu => "app_launch_new_3ds_cpu",
            Field::AutobootMode => "autoboot_mode",
            Field::AudioOutput => "force_audio_output",
            Field::HbldrTitleId => "hbldr_3dsx_titleid",
            Field::MenuCombo => "rosalina_menu_combo",
            Field::PluginLoader => "plugin_loader_enabled",
            Field::TzOffset => "ntp_tz_offset_min",
            Field::Filter(Top, Cct) => "screen_filters_top_cct",
            Field::Filter(Bottom, Cct) => "screen_filters_bot_cct",
            Field::Filter(Top, ColorCurve) => "screen_filters_top_color_curve_adj",
            Field::Filter(Bottom, ColorCurve) => "screen_filters_bot_color_curve_adj",
            Field::Filter(Top, Gamma) => "screen_filters_top_gamma",
            Field::Filter(Bottom, Gamma) => "screen_filters_bot_gamma",
            Field::Filter(Top, Contrast) => "screen_filters_top_contrast",
            Field::Filter(Bottom, Contrast) => "screen_filters_bot_contrast",
            Field::Filter(Top, Brightness) => "screen_filters_top_brightness",
            Field::Filter(Bottom, Brightness) => "screen_filters_bot_brightness",
            Field::Filter(Top, Invert) => "screen_filters_top_invert",
            Field::Filter(Bottom, Invert) => "screen_filters_bot_invert",
            Field::AutobootTwlTitleId => "autoboot_dsi_titleid",
            Field::AutobootAppMemType => "autoboot_3ds_app_mem_type",
            Field::VolumeOverride => "volume_slider_override",
        }
    }

    /// Parse `value` and store it in the record
    pub fn apply(self, record: &mut ConfigRecord, value: &str) -> std::result::Result<(), ValueError> {
        match self {
            Field::MetaMajor => {
                record.format_version_major = parse_dec_int(value, 0, 0xFFFF)? as u16;
            }
            Field::MetaMinor => {
                record.format_version_minor = parse_dec_int(value, 0, 0xFFFF)? as u16;
            }
            Field::Flag(flag) => record.set_flag(flag, parse_bool(value)?),
            Field::EmunandNumber => {
                let number = parse_dec_int(value, 1, 4)? as u8;
                record.store_slot(MultiOption::DefaultEmunand, number - 1);
            }
            Field::BrightnessLevel => {
                let level = parse_dec_int(value, 1, 4)? as u8;
                record.store_slot(MultiOption::Brightness, 4 - level);
            }
            Field::SplashPosition => apply_choice::<SplashPosition>(record, MultiOption::SplashPosition, value)?,
            Field::SplashDuration => {
                record.splash_duration_ms = parse_dec_int(value, 0, i64::from(u32::MAX))? as u32;
            }
            Field::PinDigits => {
                let digits = parse_dec_int(value, 0, 8)?;
                let index = PIN_DIGIT_CHOICES
                    .iter()
                    .position(|&d| i64::from(d) == digits)
                    .ok_or_else(|| ValueError::UnknownChoice(value.to_string()))?;
                record.store_slot(MultiOption::PinDigits, index as u8);
            }
            Field::NewCpu => apply_choice::<NewCpuMode>(record, MultiOption::NewCpu, value)?,
            Field::AutobootMode => apply_choice::<AutobootMode>(record, MultiOption::AutobootMode, value)?,
            Field::AudioOutput => apply_choice::<AudioOutput>(record, MultiOption::AudioOutput, value)?,
            Field::HbldrTitleId => record.hbldr_3dsx_title_id = parse_hex(value, 0, u64::MAX)?,
            Field::MenuCombo => record.menu_combo = KeyCombo(parse_key_combo(value)?),
            Field::PluginLoader => record.set_plugin_loader_enabled(parse_bool(value)?),
            Field::TzOffset => {
                record.ntp_tz_offset_min =
                    parse_dec_int(value, i64::from(TZ_OFFSET_MIN), i64::from(TZ_OFFSET_MAX))? as i16;
            }
            Field::Filter(screen, field) => {
                let profile = match screen {
                    Screen::Top => &mut record.top_screen_filter,
                    Screen::Bottom => &mut record.bottom_screen_filter,
                };
                apply_filter(profile, field, value)?;
            }
            Field::AutobootTwlTitleId => record.autoboot_twl_title_id = parse_hex(value, 0, u64::MAX)?,
            Field::AutobootAppMemType => {
                record.autoboot_ctr_app_mem_type =
                    parse_dec_int(value, 0, i64::from(APP_MEM_TYPE_MAX))? as u8;
            }
            Field::VolumeOverride => {
                record.volume_slider_override = parse_dec_int(
                    value,
                    i64::from(VOLUME_OVERRIDE_DISABLED),
                    i64::from(VOLUME_OVERRIDE_MAX),
                )? as i8;
            }
        }
        Ok(())
    }

    /// Text form of the field's current value
    pub fn render(self, record: &ConfigRecord) -> String {
        match self {
            Field::MetaMajor => CONFIG_VERSION_MAJOR.to_string(),
            Field::MetaMinor => CONFIG_VERSION_MINOR.to_string(),
            Field::Flag(flag) => u8::from(record.flag(flag)).to_string(),
            Field::EmunandNumber => record.emunand_number().to_string(),
            Field::BrightnessLevel => record.brightness_level().to_string(),
            Field::SplashPosition => record.splash_position().name().to_string(),
            Field::SplashDuration => record.splash_duration_ms.to_string(),
            Field::PinDigits => record.pin_digits().to_string(),
            Field::NewCpu => record.new_cpu_mode().name().to_string(),
            Field::AutobootMode => record.autoboot_mode().name().to_string(),
            Field::AudioOutput => record.audio_output().name().to_string(),
            Field::HbldrTitleId => format!("{:016x}", record.hbldr_3dsx_title_id),
            Field::MenuCombo => record.menu_combo.to_string(),
            Field::PluginLoader => u8::from(record.plugin_loader_enabled()).to_string(),
            Field::TzOffset => record.ntp_tz_offset_min.to_string(),
            Field::Filter(screen, field) => {
                let profile = match screen {
                    Screen::Top => &record.top_screen_filter,
                    Screen::Bottom => &record.bottom_screen_filter,
                };
                render_filter(profile, field)
            }
            Field::AutobootTwlTitleId => format!("{:016x}", record.autoboot_twl_title_id),
            Field::AutobootAppMemType => record.autoboot_ctr_app_mem_type.to_string(),
            Field::VolumeOverride => record.volume_slider_override.to_string(),
        }
    }
}

fn apply_choice<C: Choice>(
    record: &mut ConfigRecord,
    option: MultiOption,
    value: &str,
) -> std::result::Result<(), ValueError> {
    let index = parse_choice(value, C::NAMES)?;
    record.store_slot(option, index as u8);
    Ok(())
}

fn apply_filter(
    profile: &mut ScreenFilterProfile,
    field: FilterField,
    value: &str,
) -> std::result::Result<(), ValueError> {
    match field {
        FilterField::Cct => {
            profile.cct = parse_dec_int(value, i64::from(CCT_MIN), i64::from(CCT_MAX))? as u32;
        }
        FilterField::ColorCurve => {
            profile.color_curve_correction =
                parse_dec_int(value, 0, i64::from(COLOR_CURVE_MAX))? as u8;
        }
        FilterField::Gamma => profile.gamma = FixedPoint(parse_fixed_point(value, 0, GAMMA_MAX)?),
        FilterField::Contrast => {
            profile.contrast = FixedPoint(parse_fixed_point(value, 0, CONTRAST_MAX)?);
        }
        FilterField::Brightness => {
            profile.brightness =
                FixedPoint(parse_fixed_point(value, BRIGHTNESS_MIN, BRIGHTNESS_MAX)?);
        }
        FilterField::Invert => profile.invert = parse_bool(value)?,
    }
    Ok(())
}

fn render_filter(profile: &ScreenFilterProfile, field: FilterField) -> String {
    match field {
        FilterField::Cct => profile.cct.to_string(),
        FilterField::ColorCurve => profile.color_curve_correction.to_string(),
        FilterField::Gamma => format_fixed_point(profile.gamma.raw()),
        FilterField::Contrast => format_fixed_point(profile.contrast.raw()),
        FilterField::Brightness => format_fixed_point(profile.brightness.raw()),
        FilterField::Invert => u8::from(profile.invert).to_string(),
    }
}

// =============================================================================
// Template
// =============================================================================

/// A piece of the document layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Literal comment line, written with a leading `; `
    Comment(&'static str),
    /// Empty line
    Blank,
    /// `[name]` header; options below it belong to this section
    Section(&'static str),
    /// `key = value` line
    Option(Field),
}

use self::Field::Filter as F;
use self::FilterField as FF;

/// Layout of the document after the header comment
pub const TEMPLATE: &[Segment] = &[
    Segment::Comment("Do not modify the meta section."),
    Segment::Section("meta"),
    Segment::Option(Field::MetaMajor),
    Segment::Option(Field::MetaMinor),
    Segment::Blank,
    Segment::Section("boot"),
    Segment::Option(Field::Flag(BootFlag::AutobootEmunand)),
    Segment::Option(Field::Flag(BootFlag::EnableExternalFirmAndModules)),
    Segment::Option(Field::Flag(BootFlag::EnableGamePatching)),
    Segment::Option(Field::Flag(BootFlag::AppSyscoreThreadsOnCore2)),
    Segment::Option(Field::Flag(BootFlag::ShowSystemSettingsString)),
    Segment::Option(Field::Flag(BootFlag::ShowGbaBootScreen)),
    Segment::Option(Field::Flag(BootFlag::EnablePerfScheduler)),
    Segment::Option(Field::Flag(BootFlag::AllowUpdownLeftrightDsi)),
    Segment::Option(Field::Flag(BootFlag::CutWifiSleepMode)),
    Segment::Option(Field::Flag(BootFlag::UseDevUnitinfo)),
    Segment::Option(Field::Flag(BootFlag::DisableArm11ExceptionHandlers)),
    Segment::Option(Field::Flag(BootFlag::EnableSafeFirmRosalina)),
    Segment::Option(Field::Flag(BootFlag::DisableErrdispEnableInstantReboot)),
    Segment::Blank,
    Segment::Comment("1 to 4"),
    Segment::Option(Field::EmunandNumber),
    Segment::Option(Field::BrightnessLevel),
    Segment::Blank,
    Segment::Comment("off, before payloads, after payloads"),
    Segment::Option(Field::SplashPosition),
    Segment::Option(Field::SplashDuration),
    Segment::Blank,
    Segment::Comment("0, 4, 6 or 8"),
    Segment::Option(Field::PinDigits),
    Segment::Blank,
    Segment::Comment("off, clock, l2, clock+l2"),
    Segment::Option(Field::NewCpu),
    Segment::Comment("off, 3ds, dsi"),
    Segment::Option(Field::AutobootMode),
    Segment::Comment("off, headphones, speakers"),
    Segment::Option(Field::AudioOutput),
    Segment::Blank,
    Segment::Section("rosalina"),
    Segment::Option(Field::HbldrTitleId),
    Segment::Option(Field::MenuCombo),
    Segment::Option(Field::PluginLoader),
    Segment::Comment("Minutes, -779 to 899"),
    Segment::Option(Field::TzOffset),
    Segment::Blank,
    Segment::Section("screen_filters"),
    Segment::Option(F(Screen::Top, FF::Cct)),
    Segment::Option(F(Screen::Bottom, FF::Cct)),
    Segment::Option(F(Screen::Top, FF::ColorCurve)),
    Segment::Option(F(Screen::Bottom, FF::ColorCurve)),
    Segment::Option(F(Screen::Top, FF::Gamma)),
    Segment::Option(F(Screen::Bottom, FF::Gamma)),
    Segment::Option(F(Screen::Top, FF::Contrast)),
    Segment::Option(F(Screen::Bottom, FF::Contrast)),
    Segment::Option(F(Screen::Top, FF::Brightness)),
    Segment::Option(F(Screen::Bottom, FF::Brightness)),
    Segment::Option(F(Screen::Top, FF::Invert)),
    Segment::Option(F(Screen::Bottom, FF::Invert)),
    Segment::Blank,
    Segment::Section("autoboot"),
    Segment::Option(Field::AutobootTwlTitleId),
    Segment::Comment("0 to 4"),
    Segment::Option(Field::AutobootAppMemType),
    Segment::Blank,
    Segment::Section("misc"),
    Segment::Comment("-1 disables the override, else 0 to 100"),
    Segment::Option(Field::VolumeOverride),
    Segment::Option(Field::Flag(BootFlag::ShowAdvancedSettings)),
    Segment::Option(Field::Flag(BootFlag::PatchHardwareCrypto)),
];

/// Every `(section, field)` pair of the template, in document order
pub fn fields() -> impl Iterator<Item = (&'static str, Field)> {
    TEMPLATE
        .iter()
        .scan("", |section, segment| {
            Some(match *segment {
                Segment::Section(name) => {
                    *section = name;
                    None
                }
                Segment::Option(field) => Some((*section, field)),
                Segment::Comment(_) | Segment::Blank => None,
            })
        })
        .flatten()
}

fn section_exists(section: &str) -> bool {
    TEMPLATE
        .iter()
        .any(|segment| matches!(segment, Segment::Section(name) if *name == section))
}

/// Resolve a `[section] key` pair to its field
pub fn lookup(section: &str, key: &str) -> std::result::Result<Field, ParseErrorKind> {
    if !section_exists(section) {
        return Err(ParseErrorKind::UnknownSection);
    }
    fields()
        .find(|(s, field)| *s == section && field.key() == key)
        .map(|(_, field)| field)
        .ok_or(ParseErrorKind::UnknownKey)
}

// =============================================================================
// Documents
// =============================================================================

/// Parse a document into a fresh record.
///
/// Fields start at zero, so keys missing from the document stay zero.
pub fn parse_document(text: &str) -> std::result::Result<ConfigRecord, ParseError> {
    let mut record = ConfigRecord::zeroed();
    let mut section = String::new();

    for (line_no, raw) in ini::numbered_lines(text) {
        let error = |section: &str, key: &str, kind| ParseError {
            line: line_no,
            section: section.to_string(),
            key: key.to_string(),
            kind,
        };

        match ini::parse_line(raw) {
            None => return Err(error(&section, "", ParseErrorKind::Syntax)),
            Some(Line::Blank) => {}
            Some(Line::Section(name)) => {
                if !section_exists(name) {
                    return Err(error(name, "", ParseErrorKind::UnknownSection));
                }
                section = name.to_string();
            }
            Some(Line::Pair { key, value }) => {
                let field = lookup(&section, key).map_err(|kind| error(&section, key, kind))?;
                field
                    .apply(&mut record, value)
                    .map_err(|e| error(&section, key, ParseErrorKind::InvalidValue(e)))?;
            }
        }
    }

    Ok(record)
}

/// Parse a document read from the file store, enforcing the size limit
pub fn parse_document_bytes(bytes: &[u8]) -> Result<ConfigRecord> {
    if bytes.len() >= MAX_DOCUMENT_SIZE {
        return Err(Error::DocumentTooLarge {
            size: bytes.len(),
            max: MAX_DOCUMENT_SIZE - 1,
        });
    }
    let text = std::str::from_utf8(bytes).map_err(|e| Error::Encoding(e.valid_up_to()))?;
    Ok(parse_document(text)?)
}

/// Render a record as a complete document.
///
/// The `[meta]` section always carries the format version of this build.
pub fn render_document(record: &ConfigRecord, build: &BuildInfo) -> Result<String> {
    let mut out = String::with_capacity(MAX_DOCUMENT_SIZE / 2);

    out.push_str(&format!(
        "; {}{} configuration file\n",
        build.version_string(),
        build.revision_suffix()
    ));
    out.push_str("; Edit with care, invalid values reset every option to its default.\n\n");

    for segment in TEMPLATE {
        match segment {
            Segment::Comment(text) => out.push_str(&format!("; {}\n", text)),
            Segment::Blank => out.push('\n'),
            Segment::Section(name) => out.push_str(&format!("[{}]\n", name)),
            Segment::Option(field) => {
                out.push_str(&format!("{} = {}\n", field.key(), field.render(record)));
            }
        }
    }

    if out.len() >= MAX_DOCUMENT_SIZE {
        return Err(Error::DocumentTooLarge {
            size: out.len(),
            max: MAX_DOCUMENT_SIZE - 1,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::FirmwareVersion;

    fn build() -> BuildInfo {
        BuildInfo::new().version(FirmwareVersion::new(13, 1, 0))
    }

    fn defaults() -> ConfigRecord {
        ConfigRecord::defaults(&build())
    }

    #[test]
    fn test_defaults_roundtrip() {
        let record = defaults();
        let text = render_document(&record, &build()).unwrap();
        assert_eq!(parse_document(&text).unwrap(), record);
    }

    #[test]
    fn test_render_is_idempotent() {
        let text = render_document(&defaults(), &build()).unwrap();
        let again = render_document(&parse_document(&text).unwrap(), &build()).unwrap();
        assert_eq!(text, again);
    }

    #[test]
    fn test_render_header_and_order() {
        let build = build().commit_hash(0x1234abcd).release(false);
        let text = render_document(&defaults(), &build).unwrap();
        assert!(text.starts_with("; Polari3DS-ITA v13.1-1234abcd configuration file\n"));

        let sections: Vec<_> = text
            .lines()
            .filter(|l| l.starts_with('['))
            .collect();
        assert_eq!(
            sections,
            ["[meta]", "[boot]", "[rosalina]", "[screen_filters]", "[autoboot]", "[misc]"]
        );

        let boot = text.find("autoboot_emunand = 0").unwrap();
        let force_audio = text.find("force_audio_output = off").unwrap();
        let hbldr = text.find("hbldr_3dsx_titleid = 000400000d921e00").unwrap();
        assert!(boot < force_audio && force_audio < hbldr);
        assert!(text.contains("rosalina_menu_combo = L+Down+Select\n"));
        assert!(text.contains("screen_filters_top_gamma = 1\n"));
        assert!(text.contains("autoboot_dsi_titleid = 0003000448424c41\n"));
        assert!(text.contains("volume_slider_override = -1\n"));
    }

    #[test]
    fn test_field_table_is_complete() {
        let keys: Vec<_> = fields().collect();
        assert_eq!(keys.len(), 2 + 13 + 8 + 4 + 12 + 2 + 3);
        for (section, field) in &keys {
            assert_eq!(lookup(section, field.key()), Ok(*field));
        }
        let flags = keys
            .iter()
            .filter(|(_, f)| matches!(f, Field::Flag(_)))
            .count();
        assert_eq!(flags, BootFlag::ALL.len());
    }

    #[test]
    fn test_lookup_errors() {
        assert_eq!(lookup("nope", "x"), Err(ParseErrorKind::UnknownSection));
        assert_eq!(lookup("boot", "nope"), Err(ParseErrorKind::UnknownKey));
        // Keys belong to one section only
        assert_eq!(
            lookup("boot", "volume_slider_override"),
            Err(ParseErrorKind::UnknownKey)
        );
    }

    #[test]
    fn test_parse_starts_from_zero() {
        let record = parse_document("[boot]\nautoboot_emunand = 1\nbrightness_level = 2\n").unwrap();
        assert_eq!(record.config, 1);
        assert_eq!(record.multi_config, 2 << 2);
        assert_eq!(record.splash_duration_ms, 0);
        assert_eq!(record.format_version_major, 0);
    }

    #[test]
    fn test_repeated_key_overrides() {
        let record = parse_document(
            "[boot]\nbrightness_level = 1\nbrightness_level = 4\nautoboot_emunand = 1\nautoboot_emunand = 0\n",
        )
        .unwrap();
        assert_eq!(record.brightness_level(), 4);
        assert_eq!(record.config, 0);
    }

    #[test]
    fn test_special_encodings() {
        let record = parse_document(
            "[boot]\n\
             default_emunand_number = 4\n\
             pin_lock_num_digits = 8\n\
             splash_position = After Payloads\n\
             app_launch_new_3ds_cpu = clock+l2\n\
             autoboot_mode = dsi\n\
             force_audio_output = headphones\n\
             [rosalina]\n\
             plugin_loader_enabled = 1\n\
             rosalina_menu_combo = l+up\n\
             [screen_filters]\n\
             screen_filters_bot_brightness = -0.5\n\
             screen_filters_top_invert = 1\n",
        )
        .unwrap();
        assert_eq!(record.multi(MultiOption::DefaultEmunand), 3);
        assert_eq!(record.multi(MultiOption::PinDigits), 3);
        assert_eq!(record.splash_position(), SplashPosition::AfterPayloads);
        assert_eq!(record.new_cpu_mode(), NewCpuMode::ClockL2);
        assert_eq!(record.autoboot_mode(), AutobootMode::Twl);
        assert_eq!(record.audio_output(), AudioOutput::Headphones);
        assert_eq!(record.plugin_loader_flags, 1);
        assert_eq!(record.menu_combo.to_string(), "L+Up");
        assert_eq!(record.bottom_screen_filter.brightness, FixedPoint(-50_000_000));
        assert!(record.top_screen_filter.invert);
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse_document("[meta]\nconfig_version_major = 3\n\n[boot]\nbrightness_level = 5\n")
            .unwrap_err();
        assert_eq!(err.line, 5);
        assert_eq!(err.section, "boot");
        assert_eq!(err.key, "brightness_level");
        assert!(matches!(
            err.kind,
            ParseErrorKind::InvalidValue(ValueError::OutOfRange { value: 5, .. })
        ));
    }

    #[test]
    fn test_trailing_garbage_after_fraction_fails() {
        let err = parse_document("[screen_filters]\nscreen_filters_top_gamma = 1.123456789x\n")
            .unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.key, "screen_filters_top_gamma");
        assert_eq!(
            err.kind,
            ParseErrorKind::InvalidValue(ValueError::InvalidDigit('x'))
        );

        let record = parse_document("[screen_filters]\nscreen_filters_top_gamma = 1.123456789\n")
            .unwrap();
        assert_eq!(record.top_screen_filter.gamma, FixedPoint(112_345_678));
    }

    #[test]
    fn test_parse_rejects() {
        let syntax = parse_document("[boot]\nthis is not ini\n").unwrap_err();
        assert_eq!((syntax.line, syntax.kind), (2, ParseErrorKind::Syntax));

        let section = parse_document("[nope]\n").unwrap_err();
        assert_eq!(section.kind, ParseErrorKind::UnknownSection);

        let orphan = parse_document("autoboot_emunand = 1\n").unwrap_err();
        assert_eq!(orphan.kind, ParseErrorKind::UnknownSection);

        let key = parse_document("[boot]\nfoo = 1\n").unwrap_err();
        assert_eq!(key.kind, ParseErrorKind::UnknownKey);

        let pin = parse_document("[boot]\npin_lock_num_digits = 5\n").unwrap_err();
        assert!(matches!(
            pin.kind,
            ParseErrorKind::InvalidValue(ValueError::UnknownChoice(_))
        ));

        let combo = parse_document("[rosalina]\nrosalina_menu_combo = L+\n").unwrap_err();
        assert_eq!(
            combo.kind,
            ParseErrorKind::InvalidValue(ValueError::EmptyComboToken)
        );
    }

    #[test]
    fn test_bytes_limits() {
        let big = vec![b'\n'; MAX_DOCUMENT_SIZE];
        assert!(matches!(
            parse_document_bytes(&big),
            Err(Error::DocumentTooLarge { .. })
        ));
        assert!(parse_document_bytes(&big[..MAX_DOCUMENT_SIZE - 1]).is_ok());

        assert!(matches!(
            parse_document_bytes(b"[boot]\n\xff\n"),
            Err(Error::Encoding(7))
        ));
    }

    #[test]
    fn test_meta_renders_running_version() {
        let mut record = defaults();
        record.format_version_major = 1;
        let text = render_document(&record, &build()).unwrap();
        let parsed = parse_document(&text).unwrap();
        assert!(parsed.has_current_format());
    }
}
