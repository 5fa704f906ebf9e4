//! The bit-packed configuration record
//!
//! Boolean options live in the `config` word, one bit each, and small
//! enumerated options live in 2-bit slots of `multi_config`. Code outside
//! this module goes through [`BootFlag`] and [`MultiOption`] instead of
//! shifting and masking by hand.

use crate::error::{Error, Result};
use crate::firmware::{BuildInfo, BuildMode, CONFIG_VERSION_MAJOR, CONFIG_VERSION_MINOR};
use crate::values::{FixedPoint, KeyCombo, FIXED_POINT_SCALE};
use serde::Serialize;
use std::fmt;

/// Default splash screen duration in milliseconds
pub const DEFAULT_SPLASH_DURATION_MS: u32 = 2000;

/// Title ID of the homebrew launcher target
pub const DEFAULT_HBLDR_TITLE_ID: u64 = 0x0004_0000_0D92_1E00;

/// Title ID autobooted in DSi mode
pub const DEFAULT_AUTOBOOT_TWL_TITLE_ID: u64 = 0x0003_0004_4842_4C41;

/// Default screen color temperature in kelvin
pub const DEFAULT_CCT: u32 = 6500;

/// NTP timezone offset bounds in minutes
pub const TZ_OFFSET_MIN: i16 = -779;
/// NTP timezone offset bounds in minutes
pub const TZ_OFFSET_MAX: i16 = 899;

/// Color temperature bounds in kelvin
pub const CCT_MIN: u32 = 1000;
/// Color temperature bounds in kelvin
pub const CCT_MAX: u32 = 25100;

/// Largest gamma value, in fixed-point units
pub const GAMMA_MAX: i64 = 8 * FIXED_POINT_SCALE;
/// Largest contrast value, in fixed-point units
pub const CONTRAST_MAX: i64 = 255 * FIXED_POINT_SCALE;
/// Brightness bounds, in fixed-point units
pub const BRIGHTNESS_MIN: i64 = -FIXED_POINT_SCALE;
/// Brightness bounds, in fixed-point units
pub const BRIGHTNESS_MAX: i64 = FIXED_POINT_SCALE;

/// Largest color curve correction mode
pub const COLOR_CURVE_MAX: u8 = 2;

/// Largest autoboot application memory type
pub const APP_MEM_TYPE_MAX: u8 = 4;

/// Volume override value meaning "disabled"
pub const VOLUME_OVERRIDE_DISABLED: i8 = -1;
/// Largest volume override
pub const VOLUME_OVERRIDE_MAX: i8 = 100;

/// PIN lengths selectable by the PIN slot index
pub const PIN_DIGIT_CHOICES: [u8; 4] = [0, 4, 6, 8];

// =============================================================================
// Boolean flags
// =============================================================================

/// Boolean options of the `config` word, by bit index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BootFlag {
    /// Boot the EmuNAND by default
    AutobootEmunand = 0,
    /// Load external FIRMs and system modules
    EnableExternalFirmAndModules = 1,
    /// Enable game patching
    EnableGamePatching = 2,
    /// Redirect app syscore threads to core 2
    AppSyscoreThreadsOnCore2 = 3,
    /// Show NAND or user string in System Settings
    ShowSystemSettingsString = 4,
    /// Show the GBA boot screen in patched AGB_FIRM
    ShowGbaBootScreen = 5,
    /// Enable the performance scheduler
    EnablePerfScheduler = 6,
    /// Allow up+down and left+right in DSi software
    AllowUpdownLeftrightDsi = 7,
    /// Cut wifi in sleep mode
    CutWifiSleepMode = 8,
    /// Use developer UNITINFO
    UseDevUnitinfo = 9,
    /// Disable ARM11 exception handlers
    DisableArm11ExceptionHandlers = 10,
    /// Enable Rosalina on SAFE_FIRM
    EnableSafeFirmRosalina = 11,
    /// Disable the error display and reboot instantly
    DisableErrdispEnableInstantReboot = 12,
    /// Show the advanced options in the menu
    ShowAdvancedSettings = 13,
    /// Patch hardware crypto
    PatchHardwareCrypto = 14,
}

impl BootFlag {
    /// Every flag in bit order
    pub const ALL: [BootFlag; 15] = [
        BootFlag::AutobootEmunand,
        BootFlag::EnableExternalFirmAndModules,
        BootFlag::EnableGamePatching,
        BootFlag::AppSyscoreThreadsOnCore2,
        BootFlag::ShowSystemSettingsString,
        BootFlag::ShowGbaBootScreen,
        BootFlag::EnablePerfScheduler,
        BootFlag::AllowUpdownLeftrightDsi,
        BootFlag::CutWifiSleepMode,
        BootFlag::UseDevUnitinfo,
        BootFlag::DisableArm11ExceptionHandlers,
        BootFlag::EnableSafeFirmRosalina,
        BootFlag::DisableErrdispEnableInstantReboot,
        BootFlag::ShowAdvancedSettings,
        BootFlag::PatchHardwareCrypto,
    ];

    /// Bit index in the `config` word
    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// Mask of this flag in the `config` word
    pub const fn mask(self) -> u32 {
        1 << self.bit()
    }

    /// Flag for a bit index
    pub fn from_bit(bit: u32) -> Option<Self> {
        Self::ALL.get(bit as usize).copied()
    }

    /// Key of the flag in the text document
    pub const fn key(self) -> &'static str {
        match self {
            BootFlag::AutobootEmunand => "autoboot_emunand",
            BootFlag::EnableExternalFirmAndModules => "enable_external_firm_and_modules",
            BootFlag::EnableGamePatching => "enable_game_patching",
            BootFlag::AppSyscoreThreadsOnCore2 => "app_syscore_threads_on_core_2",
            BootFlag::ShowSystemSettingsString => "show_system_settings_string",
            BootFlag::ShowGbaBootScreen => "show_gba_boot_screen",
            BootFlag::EnablePerfScheduler => "enable_perf_scheduler",
            BootFlag::AllowUpdownLeftrightDsi => "allow_updown_leftright_dsi",
            BootFlag::CutWifiSleepMode => "cut_wifi_sleep_mode",
            BootFlag::UseDevUnitinfo => "use_dev_unitinfo",
            BootFlag::DisableArm11ExceptionHandlers => "disable_arm11_exception_handlers",
            BootFlag::EnableSafeFirmRosalina => "enable_safe_firm_rosalina",
            BootFlag::DisableErrdispEnableInstantReboot => {
                "disable_errdisp_enable_instant_reboot"
            }
            BootFlag::ShowAdvancedSettings => "show_advanced_settings",
            BootFlag::PatchHardwareCrypto => "patch_hardware_crypto",
        }
    }
}

// =============================================================================
// Multi-choice slots
// =============================================================================

/// Two-bit slots of the `multi_config` word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MultiOption {
    /// Default EmuNAND, stored as number - 1
    DefaultEmunand = 0,
    /// Screen brightness, stored as 4 - level
    Brightness = 1,
    /// Splash screen position
    SplashPosition = 2,
    /// PIN length, stored as an index into [`PIN_DIGIT_CHOICES`]
    PinDigits = 3,
    /// New 3DS CPU mode for applications
    NewCpu = 4,
    /// Hbmenu autoboot mode
    AutobootMode = 5,
    /// Forced audio output
    AudioOutput = 6,
}

impl MultiOption {
    /// Every slot in order
    pub const ALL: [MultiOption; 7] = [
        MultiOption::DefaultEmunand,
        MultiOption::Brightness,
        MultiOption::SplashPosition,
        MultiOption::PinDigits,
        MultiOption::NewCpu,
        MultiOption::AutobootMode,
        MultiOption::AudioOutput,
    ];

    /// Slot index
    pub const fn slot(self) -> u32 {
        self as u32
    }

    /// Bit offset of the slot
    pub const fn shift(self) -> u32 {
        self.slot() * 2
    }

    /// Number of values the slot accepts
    pub const fn choice_count(self) -> u8 {
        match self {
            MultiOption::DefaultEmunand
            | MultiOption::Brightness
            | MultiOption::PinDigits
            | MultiOption::NewCpu => 4,
            MultiOption::SplashPosition
            | MultiOption::AutobootMode
            | MultiOption::AudioOutput => 3,
        }
    }
}

/// An option stored as the index of one of a fixed list of names
pub trait Choice: Sized + Copy + Default {
    /// Names in index order, as written in the text document
    const NAMES: &'static [&'static str];

    /// Index of the value
    fn index(self) -> u8;

    /// Value for an index
    fn from_index(index: u8) -> Option<Self>;

    /// Name of the value in the text document
    fn name(self) -> &'static str {
        Self::NAMES[usize::from(self.index())]
    }
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            #[default]
            $($(#[$vmeta])* $variant),+
        }

        impl Choice for $name {
            const NAMES: &'static [&'static str] = &[$($text),+];

            fn index(self) -> u8 {
                self as u8
            }

            fn from_index(index: u8) -> Option<Self> {
                const VARIANTS: &[$name] = &[$($name::$variant),+];
                VARIANTS.get(usize::from(index)).copied()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

choice_enum! {
    /// When the splash screen is shown
    SplashPosition {
        /// No splash screen
        Off = "off",
        /// Before payloads are loaded
        BeforePayloads = "before payloads",
        /// After payloads are loaded
        AfterPayloads = "after payloads",
    }
}

choice_enum! {
    /// New 3DS CPU setting for applications
    NewCpuMode {
        /// Stock behaviour
        Off = "off",
        /// Higher clock
        Clock = "clock",
        /// L2 cache
        L2 = "l2",
        /// Higher clock and L2 cache
        ClockL2 = "clock+l2",
    }
}

choice_enum! {
    /// Which system the homebrew menu autoboots into
    AutobootMode {
        /// No autoboot
        Off = "off",
        /// 3DS application
        Ctr = "3ds",
        /// DSi title
        Twl = "dsi",
    }
}

choice_enum! {
    /// Forced audio output
    AudioOutput {
        /// No override
        Off = "off",
        /// Always headphones
        Headphones = "headphones",
        /// Always speakers
        Speakers = "speakers",
    }
}

fn invalid(option: &'static str, message: impl Into<String>) -> Error {
    Error::InvalidOption {
        option,
        message: message.into(),
    }
}

// =============================================================================
// Screen filter
// =============================================================================

/// Color filter settings for one screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScreenFilterProfile {
    /// Color temperature in kelvin
    pub cct: u32,
    /// Gamma, 0..=8
    pub gamma: FixedPoint,
    /// Contrast, 0..=255
    pub contrast: FixedPoint,
    /// Brightness offset, -1..=1
    pub brightness: FixedPoint,
    /// Invert colors
    pub invert: bool,
    /// Color curve correction mode, 0..=2
    pub color_curve_correction: u8,
}

impl Default for ScreenFilterProfile {
    fn default() -> Self {
        Self {
            cct: DEFAULT_CCT,
            gamma: FixedPoint::ONE,
            contrast: FixedPoint::ONE,
            brightness: FixedPoint::ZERO,
            invert: false,
            color_curve_correction: 0,
        }
    }
}

impl ScreenFilterProfile {
    /// Profile with every field zero
    pub const fn zeroed() -> Self {
        Self {
            cct: 0,
            gamma: FixedPoint::ZERO,
            contrast: FixedPoint::ZERO,
            brightness: FixedPoint::ZERO,
            invert: false,
            color_curve_correction: 0,
        }
    }

    /// Check every field against its bounds
    pub fn validate(&self) -> Result<()> {
        if !(CCT_MIN..=CCT_MAX).contains(&self.cct) {
            return Err(invalid(
                "cct",
                format!("{} is outside {}..={}", self.cct, CCT_MIN, CCT_MAX),
            ));
        }
        if !(0..=GAMMA_MAX).contains(&self.gamma.raw()) {
            return Err(invalid("gamma", format!("{} is outside 0..=8", self.gamma)));
        }
        if !(0..=CONTRAST_MAX).contains(&self.contrast.raw()) {
            return Err(invalid(
                "contrast",
                format!("{} is outside 0..=255", self.contrast),
            ));
        }
        if !(BRIGHTNESS_MIN..=BRIGHTNESS_MAX).contains(&self.brightness.raw()) {
            return Err(invalid(
                "brightness",
                format!("{} is outside -1..=1", self.brightness),
            ));
        }
        if self.color_curve_correction > COLOR_CURVE_MAX {
            return Err(invalid(
                "color_curve_adj",
                format!(
                    "{} is outside 0..={}",
                    self.color_curve_correction, COLOR_CURVE_MAX
                ),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Record
// =============================================================================

/// Menu combo of a build flavour: `L+Down+Select`, or `L+Up` with the debugger stub
pub const fn default_menu_combo(mode: BuildMode) -> KeyCombo {
    match mode {
        BuildMode::Standard => KeyCombo((1 << 9) | (1 << 7) | (1 << 2)),
        BuildMode::Gdb => KeyCombo((1 << 9) | (1 << 6)),
    }
}

/// The full persisted configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRecord {
    /// Document format major version
    pub format_version_major: u16,
    /// Document format minor version
    pub format_version_minor: u16,
    /// Boolean options, see [`BootFlag`]
    pub config: u32,
    /// Two-bit options, see [`MultiOption`]
    pub multi_config: u32,
    /// Splash screen duration
    pub splash_duration_ms: u32,
    /// Title ID the homebrew launcher runs as
    pub hbldr_3dsx_title_id: u64,
    /// Buttons that open the in-game menu
    pub menu_combo: KeyCombo,
    /// Plugin loader flags, bit 0 = enabled
    pub plugin_loader_flags: u8,
    /// Timezone offset applied to NTP time
    pub ntp_tz_offset_min: i16,
    /// Top screen filter
    pub top_screen_filter: ScreenFilterProfile,
    /// Bottom screen filter
    pub bottom_screen_filter: ScreenFilterProfile,
    /// DSi title to autoboot
    pub autoboot_twl_title_id: u64,
    /// Memory type for 3DS autoboot
    pub autoboot_ctr_app_mem_type: u8,
    /// Volume slider override, -1 when disabled
    pub volume_slider_override: i8,
    /// Scratch byte mirrored into the hardware registers
    pub boot_config: u8,
}

impl ConfigRecord {
    /// Record with every field zero
    pub const fn zeroed() -> Self {
        Self {
            format_version_major: 0,
            format_version_minor: 0,
            config: 0,
            multi_config: 0,
            splash_duration_ms: 0,
            hbldr_3dsx_title_id: 0,
            menu_combo: KeyCombo(0),
            plugin_loader_flags: 0,
            ntp_tz_offset_min: 0,
            top_screen_filter: ScreenFilterProfile::zeroed(),
            bottom_screen_filter: ScreenFilterProfile::zeroed(),
            autoboot_twl_title_id: 0,
            autoboot_ctr_app_mem_type: 0,
            volume_slider_override: 0,
            boot_config: 0,
        }
    }

    /// Factory defaults for a build
    pub fn defaults(build: &BuildInfo) -> Self {
        Self {
            format_version_major: CONFIG_VERSION_MAJOR,
            format_version_minor: CONFIG_VERSION_MINOR,
            config: BootFlag::ShowSystemSettingsString.mask(),
            multi_config: 0,
            splash_duration_ms: DEFAULT_SPLASH_DURATION_MS,
            hbldr_3dsx_title_id: DEFAULT_HBLDR_TITLE_ID,
            menu_combo: default_menu_combo(build.build_mode),
            plugin_loader_flags: 0,
            ntp_tz_offset_min: 0,
            top_screen_filter: ScreenFilterProfile::default(),
            bottom_screen_filter: ScreenFilterProfile::default(),
            autoboot_twl_title_id: DEFAULT_AUTOBOOT_TWL_TITLE_ID,
            autoboot_ctr_app_mem_type: 0,
            volume_slider_override: VOLUME_OVERRIDE_DISABLED,
            boot_config: 0,
        }
    }

    /// Whether the format version is the one this build writes
    pub fn has_current_format(&self) -> bool {
        self.format_version_major == CONFIG_VERSION_MAJOR
            && self.format_version_minor == CONFIG_VERSION_MINOR
    }

    /// State of a boolean option
    pub fn flag(&self, flag: BootFlag) -> bool {
        self.config & flag.mask() != 0
    }

    /// Set or clear a boolean option
    pub fn set_flag(&mut self, flag: BootFlag, value: bool) {
        if value {
            self.config |= flag.mask();
        } else {
            self.config &= !flag.mask();
        }
    }

    /// Raw value of a two-bit slot
    pub fn multi(&self, option: MultiOption) -> u8 {
        ((self.multi_config >> option.shift()) & 3) as u8
    }

    /// Store a raw slot value, which must be below the slot's choice count
    pub fn set_multi(&mut self, option: MultiOption, value: u8) -> Result<()> {
        if value >= option.choice_count() {
            return Err(invalid(
                "multi_config",
                format!(
                    "{:?} takes 0..{}, got {}",
                    option,
                    option.choice_count(),
                    value
                ),
            ));
        }
        self.store_slot(option, value);
        Ok(())
    }

    fn choice<C: Choice>(&self, option: MultiOption) -> C {
        C::from_index(self.multi(option)).unwrap_or_default()
    }

    /// Default EmuNAND number, 1..=4
    pub fn emunand_number(&self) -> u8 {
        self.multi(MultiOption::DefaultEmunand) + 1
    }

    /// Set the default EmuNAND number
    pub fn set_emunand_number(&mut self, number: u8) -> Result<()> {
        if !(1..=4).contains(&number) {
            return Err(invalid("default_emunand_number", "must be 1..=4"));
        }
        self.set_multi(MultiOption::DefaultEmunand, number - 1)
    }

    /// Screen brightness level, 1..=4
    pub fn brightness_level(&self) -> u8 {
        4 - self.multi(MultiOption::Brightness)
    }

    /// Set the screen brightness level
    pub fn set_brightness_level(&mut self, level: u8) -> Result<()> {
        if !(1..=4).contains(&level) {
            return Err(invalid("brightness_level", "must be 1..=4"));
        }
        self.set_multi(MultiOption::Brightness, 4 - level)
    }

    /// PIN length, one of 0, 4, 6 or 8
    pub fn pin_digits(&self) -> u8 {
        PIN_DIGIT_CHOICES[usize::from(self.multi(MultiOption::PinDigits))]
    }

    /// Set the PIN length
    pub fn set_pin_digits(&mut self, digits: u8) -> Result<()> {
        let index = PIN_DIGIT_CHOICES
            .iter()
            .position(|&d| d == digits)
            .ok_or_else(|| invalid("pin_lock_num_digits", "must be 0, 4, 6 or 8"))?;
        self.set_multi(MultiOption::PinDigits, index as u8)
    }

    /// Splash screen position
    pub fn splash_position(&self) -> SplashPosition {
        self.choice(MultiOption::SplashPosition)
    }

    /// Set the splash screen position
    pub fn set_splash_position(&mut self, position: SplashPosition) {
        self.set_choice(MultiOption::SplashPosition, position);
    }

    /// New 3DS CPU mode
    pub fn new_cpu_mode(&self) -> NewCpuMode {
        self.choice(MultiOption::NewCpu)
    }

    /// Set the New 3DS CPU mode
    pub fn set_new_cpu_mode(&mut self, mode: NewCpuMode) {
        self.set_choice(MultiOption::NewCpu, mode);
    }

    /// Autoboot mode
    pub fn autoboot_mode(&self) -> AutobootMode {
        self.choice(MultiOption::AutobootMode)
    }

    /// Set the autoboot mode
    pub fn set_autoboot_mode(&mut self, mode: AutobootMode) {
        self.set_choice(MultiOption::AutobootMode, mode);
    }

    /// Forced audio output
    pub fn audio_output(&self) -> AudioOutput {
        self.choice(MultiOption::AudioOutput)
    }

    /// Set the forced audio output
    pub fn set_audio_output(&mut self, output: AudioOutput) {
        self.set_choice(MultiOption::AudioOutput, output);
    }

    fn set_choice<C: Choice>(&mut self, option: MultiOption, value: C) {
        self.store_slot(option, value.index());
    }

    /// Write a slot without checking the choice count; only the low two bits are kept
    pub(crate) fn store_slot(&mut self, option: MultiOption, value: u8) {
        let shift = option.shift();
        self.multi_config = (self.multi_config & !(3 << shift)) | (u32::from(value & 3) << shift);
    }

    /// Whether the plugin loader is enabled
    pub fn plugin_loader_enabled(&self) -> bool {
        self.plugin_loader_flags & 1 != 0
    }

    /// Enable or disable the plugin loader, leaving the other flag bits alone
    pub fn set_plugin_loader_enabled(&mut self, enabled: bool) {
        self.plugin_loader_flags = (self.plugin_loader_flags & !1) | u8::from(enabled);
    }

    /// Set the volume slider override, -1 to disable
    pub fn set_volume_slider_override(&mut self, volume: i8) -> Result<()> {
        if !(VOLUME_OVERRIDE_DISABLED..=VOLUME_OVERRIDE_MAX).contains(&volume) {
            return Err(invalid(
                "volume_slider_override",
                format!("{} is outside -1..=100", volume),
            ));
        }
        self.volume_slider_override = volume;
        Ok(())
    }

    /// Volume override, `None` when disabled
    pub fn volume_override(&self) -> Option<u8> {
        u8::try_from(self.volume_slider_override).ok()
    }

    /// Set the NTP timezone offset in minutes
    pub fn set_ntp_tz_offset(&mut self, minutes: i16) -> Result<()> {
        if !(TZ_OFFSET_MIN..=TZ_OFFSET_MAX).contains(&minutes) {
            return Err(invalid(
                "ntp_tz_offset_min",
                format!("{} is outside {}..={}", minutes, TZ_OFFSET_MIN, TZ_OFFSET_MAX),
            ));
        }
        self.ntp_tz_offset_min = minutes;
        Ok(())
    }

    /// Set the splash screen duration
    pub fn set_splash_duration(&mut self, ms: u32) {
        self.splash_duration_ms = ms;
    }

    /// Set the menu combo; it must hold at least one named button
    pub fn set_menu_combo(&mut self, combo: KeyCombo) -> Result<()> {
        if combo.is_empty() {
            return Err(invalid("rosalina_menu_combo", "combo is empty"));
        }
        if combo.has_reserved_bits() {
            return Err(invalid(
                "rosalina_menu_combo",
                format!("combo 0x{:08x} uses unassigned buttons", combo.bits()),
            ));
        }
        self.menu_combo = combo;
        Ok(())
    }

    /// Set the memory type used for 3DS autoboot
    pub fn set_autoboot_app_mem_type(&mut self, mem_type: u8) -> Result<()> {
        if mem_type > APP_MEM_TYPE_MAX {
            return Err(invalid(
                "autoboot_3ds_app_mem_type",
                format!("{} is outside 0..={}", mem_type, APP_MEM_TYPE_MAX),
            ));
        }
        self.autoboot_ctr_app_mem_type = mem_type;
        Ok(())
    }

    /// Replace a screen filter after validating it
    pub fn set_screen_filter(&mut self, top: bool, profile: ScreenFilterProfile) -> Result<()> {
        profile.validate()?;
        if top {
            self.top_screen_filter = profile;
        } else {
            self.bottom_screen_filter = profile;
        }
        Ok(())
    }
}
