//! Boot configuration menu model
//!
//! The menu edits a copy of the record's option bits: seven multiple-choice
//! entries followed by seventeen single entries (the fifteen flags, the
//! chainloader entry and "save and exit"). Drawing is left to a
//! [`MenuHooks`] implementation; this module only tracks selection and values.

use crate::error::Result;
use crate::record::{BootFlag, ConfigRecord, MultiOption};
use crate::store::{ConfigStore, SaveKind, SaveReport};
use bootcfg_platform::{FileStore, PlatformError, RegisterBus};

/// Number of multiple-choice entries
pub const MULTI_ENTRIES: usize = MultiOption::ALL.len();

/// Number of single entries, including the two exit entries
pub const SINGLE_ENTRIES: usize = BootFlag::ALL.len() + 2;

const TOTAL_ENTRIES: usize = MULTI_ENTRIES + SINGLE_ENTRIES;

/// Buttons the menu reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// D-pad up
    Up,
    /// D-pad down
    Down,
    /// D-pad left, jumps to the first entry
    Left,
    /// D-pad right, jumps to the last entry
    Right,
    /// Change the selected entry
    A,
    /// Save and exit
    Start,
}

/// What the device has, which decides the visible entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuContext {
    /// At least one EmuNAND was found
    pub has_emunand: bool,
    /// Running on New 3DS hardware
    pub is_n3ds: bool,
    /// A PIN file exists
    pub pin_exists: bool,
}

/// One line of the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    /// Multiple-choice slot
    Multi(MultiOption),
    /// Boolean flag
    Flag(BootFlag),
    /// Leave and start the chainloader
    Chainloader,
    /// Leave and save
    SaveAndExit,
}

impl MenuEntry {
    fn at(index: usize) -> Self {
        if index < MULTI_ENTRIES {
            return MenuEntry::Multi(MultiOption::ALL[index]);
        }
        let single = index - MULTI_ENTRIES;
        match BootFlag::ALL.get(single) {
            Some(flag) => MenuEntry::Flag(*flag),
            None if single == SINGLE_ENTRIES - 2 => MenuEntry::Chainloader,
            None => MenuEntry::SaveAndExit,
        }
    }

    /// Text shown for the entry
    pub fn label(self) -> &'static str {
        match self {
            MenuEntry::Multi(option) => match option {
                MultiOption::DefaultEmunand => "Default EmuNAND",
                MultiOption::Brightness => "Screen brightness",
                MultiOption::SplashPosition => "Splash",
                MultiOption::PinDigits => "PIN lock",
                MultiOption::NewCpu => "New 3DS CPU",
                MultiOption::AutobootMode => "Hbmenu autoboot",
                MultiOption::AudioOutput => "Force audio output",
            },
            MenuEntry::Flag(flag) => match flag {
                BootFlag::AutobootEmunand => "Autoboot EmuNAND",
                BootFlag::EnableExternalFirmAndModules => "Enable loading external FIRMs and modules",
                BootFlag::EnableGamePatching => "Enable game patching",
                BootFlag::AppSyscoreThreadsOnCore2 => "Redirect app. syscore threads to core2",
                BootFlag::ShowSystemSettingsString => "Show NAND or user string in System Settings",
                BootFlag::ShowGbaBootScreen => "Show GBA boot screen in patched AGB_FIRM",
                BootFlag::EnablePerfScheduler => "Enable the performance scheduler",
                BootFlag::AllowUpdownLeftrightDsi => "Allow Left+Right / Up+Down combos for DSi",
                BootFlag::CutWifiSleepMode => "Cut wifi in sleep mode",
                BootFlag::UseDevUnitinfo => "Use developer UNITINFO",
                BootFlag::DisableArm11ExceptionHandlers => "Disable Arm11 exception handlers",
                BootFlag::EnableSafeFirmRosalina => "Enable Rosalina on SAFE_FIRM",
                BootFlag::DisableErrdispEnableInstantReboot => "Disable ErrDisp, enable instant reboot",
                BootFlag::ShowAdvancedSettings => "Show advanced settings",
                BootFlag::PatchHardwareCrypto => "Patch hardware crypto",
            },
            MenuEntry::Chainloader => "Boot chainloader",
            MenuEntry::SaveAndExit => "Save and exit",
        }
    }

    /// Names of the choices of a multiple-choice entry, by slot value
    pub fn choices(self) -> &'static [&'static str] {
        match self {
            MenuEntry::Multi(option) => match option {
                MultiOption::DefaultEmunand => &["1", "2", "3", "4"],
                MultiOption::Brightness => &["4", "3", "2", "1"],
                MultiOption::SplashPosition => &["Off", "Before payloads", "After payloads"],
                MultiOption::PinDigits => &["Off", "4 digits", "6 digits", "8 digits"],
                MultiOption::NewCpu => &["Off", "Clock", "L2", "Clock+L2"],
                MultiOption::AutobootMode => &["Off", "3DS", "DSi"],
                MultiOption::AudioOutput => &["Off", "Headphones", "Speakers"],
            },
            _ => &[],
        }
    }
}

/// How the menu was left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuExit {
    /// "Save and exit" or Start
    Save,
    /// The chainloader entry; changes are saved before it starts
    Chainload,
    /// Input ended without choosing an exit entry; nothing is saved
    Discard,
}

/// Result of one button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Nothing changed
    None,
    /// The selection moved
    Moved,
    /// The selected entry's value changed
    Changed(MenuEntry),
    /// The brightness slot changed to this stored value
    BrightnessChanged(u8),
    /// The menu is done
    Exit(MenuExit),
}

/// Selection and values of the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMenu {
    multi: [u8; MULTI_ENTRIES],
    single: [bool; SINGLE_ENTRIES],
    visible: [bool; TOTAL_ENTRIES],
    selected: usize,
}

impl ConfigMenu {
    /// Start editing the option bits of `record`
    pub fn new(record: &ConfigRecord, ctx: &MenuContext) -> Self {
        let advanced = record.flag(BootFlag::ShowAdvancedSettings);

        let mut multi = [0u8; MULTI_ENTRIES];
        for (value, option) in multi.iter_mut().zip(MultiOption::ALL) {
            *value = record.multi(option);
        }

        let mut single = [false; SINGLE_ENTRIES];
        for (i, value) in single.iter_mut().enumerate() {
            *value = record.config & (1 << i) != 0;
        }

        let mut visible = [true; TOTAL_ENTRIES];
        for (i, slot) in visible.iter_mut().enumerate() {
            *slot = match MenuEntry::at(i) {
                MenuEntry::Multi(MultiOption::DefaultEmunand) => ctx.has_emunand,
                MenuEntry::Multi(MultiOption::NewCpu) => ctx.is_n3ds,
                MenuEntry::Multi(_) => true,
                MenuEntry::Flag(flag) => match flag {
                    BootFlag::AutobootEmunand => ctx.has_emunand,
                    BootFlag::AppSyscoreThreadsOnCore2 => ctx.is_n3ds,
                    BootFlag::UseDevUnitinfo
                    | BootFlag::DisableArm11ExceptionHandlers
                    | BootFlag::DisableErrdispEnableInstantReboot => advanced,
                    BootFlag::EnableSafeFirmRosalina => advanced && ctx.is_n3ds,
                    BootFlag::ShowAdvancedSettings | BootFlag::PatchHardwareCrypto => false,
                    _ => true,
                },
                MenuEntry::Chainloader | MenuEntry::SaveAndExit => true,
            };
        }

        let selected = (MULTI_ENTRIES..TOTAL_ENTRIES)
            .find(|&i| visible[i])
            .unwrap_or(TOTAL_ENTRIES - 1);

        Self {
            multi,
            single,
            visible,
            selected,
        }
    }

    /// Currently selected entry
    pub fn selected(&self) -> MenuEntry {
        MenuEntry::at(self.selected)
    }

    /// Visible entries in display order
    pub fn entries(&self) -> impl Iterator<Item = MenuEntry> + '_ {
        (0..TOTAL_ENTRIES)
            .filter(|&i| self.visible[i])
            .map(MenuEntry::at)
    }

    /// Whether an entry is shown
    pub fn is_visible(&self, entry: MenuEntry) -> bool {
        (0..TOTAL_ENTRIES).any(|i| self.visible[i] && MenuEntry::at(i) == entry)
    }

    /// Stored value of a multiple-choice slot
    pub fn multi_value(&self, option: MultiOption) -> u8 {
        self.multi[option.slot() as usize]
    }

    /// State of a flag
    pub fn flag_value(&self, flag: BootFlag) -> bool {
        self.single[flag.bit() as usize]
    }

    fn step(&mut self, button: Button) {
        let mut direction = button;
        loop {
            self.selected = match direction {
                Button::Up => self.selected.checked_sub(1).unwrap_or(TOTAL_ENTRIES - 1),
                Button::Down => (self.selected + 1) % TOTAL_ENTRIES,
                Button::Left => {
                    direction = Button::Down;
                    0
                }
                Button::Right => {
                    direction = Button::Up;
                    TOTAL_ENTRIES - 1
                }
                Button::A | Button::Start => return,
            };
            if self.visible[self.selected] {
                return;
            }
        }
    }

    fn activate(&mut self) -> MenuAction {
        let entry = self.selected();
        match entry {
            MenuEntry::Multi(option) => {
                let slot = &mut self.multi[option.slot() as usize];
                *slot = if *slot + 1 >= option.choice_count() {
                    0
                } else {
                    *slot + 1
                };
                if option == MultiOption::Brightness {
                    MenuAction::BrightnessChanged(*slot)
                } else {
                    MenuAction::Changed(entry)
                }
            }
            MenuEntry::Flag(flag) => {
                let value = &mut self.single[flag.bit() as usize];
                *value = !*value;
                MenuAction::Changed(entry)
            }
            MenuEntry::Chainloader => MenuAction::Exit(MenuExit::Chainload),
            MenuEntry::SaveAndExit => MenuAction::Exit(MenuExit::Save),
        }
    }

    /// Handle one button press
    pub fn press(&mut self, button: Button) -> MenuAction {
        match button {
            Button::A => self.activate(),
            Button::Start => {
                self.step(Button::Right);
                self.activate()
            }
            _ => {
                let before = self.selected;
                self.step(button);
                if self.selected == before {
                    MenuAction::None
                } else {
                    MenuAction::Moved
                }
            }
        }
    }

    /// Write the edited bits back.
    ///
    /// `multi_config` is rebuilt from the seven slots. Flag bits are
    /// rebuilt from the single entries; other bits of `config` stay.
    pub fn commit(&self, record: &mut ConfigRecord) {
        record.multi_config = self
            .multi
            .iter()
            .enumerate()
            .fold(0, |acc, (i, value)| acc | (u32::from(*value) << (i * 2)));
        for flag in BootFlag::ALL {
            record.set_flag(flag, self.single[flag.bit() as usize]);
        }
    }
}

/// Source of button presses
pub trait MenuInput {
    /// Next button, `None` when input ends
    fn next_button(&mut self) -> std::io::Result<Option<Button>>;
}

/// Side effects the menu triggers
pub trait MenuHooks {
    /// Called after every press with the current state
    fn redraw(&mut self, _menu: &ConfigMenu) {}

    /// Called when the brightness slot changes
    fn brightness_changed(&mut self, _slot_value: u8) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl MenuHooks for NoHooks {}

/// What the caller has to do about the PIN after the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinChange {
    /// Ask for a PIN of this length
    Create {
        /// PIN length
        digits: u8,
        /// The existing PIN has this length already, entering a new one may be skipped
        allow_skip: bool,
    },
    /// Remove the existing PIN
    Delete,
}

/// How a menu session ended
#[derive(Debug)]
pub struct MenuOutcome {
    /// How the menu was left
    pub exit: MenuExit,
    /// PIN follow-up for the caller
    pub pin_change: Option<PinChange>,
    /// What the save wrote, if the menu saved
    pub save: Option<SaveReport>,
}

/// Run the menu until an exit entry is chosen or input ends, then save.
pub fn run_menu<F: FileStore, B: RegisterBus>(
    store: &mut ConfigStore<F, B>,
    ctx: &MenuContext,
    input: &mut dyn MenuInput,
    hooks: &mut dyn MenuHooks,
) -> Result<MenuOutcome> {
    let old_pin_digits = store.record().pin_digits();
    let mut menu = ConfigMenu::new(store.record(), ctx);
    hooks.redraw(&menu);

    let exit = loop {
        let Some(button) = input.next_button().map_err(PlatformError::from)? else {
            break MenuExit::Discard;
        };
        match menu.press(button) {
            MenuAction::Exit(exit) => break exit,
            MenuAction::BrightnessChanged(value) => hooks.brightness_changed(value),
            MenuAction::None | MenuAction::Moved | MenuAction::Changed(_) => {}
        }
        hooks.redraw(&menu);
    };

    if exit == MenuExit::Discard {
        tracing::info!("Menu closed without saving");
        return Ok(MenuOutcome {
            exit,
            pin_change: None,
            save: None,
        });
    }

    menu.commit(store.record_mut());
    let save = store.write_config(SaveKind::MenuOptions)?;

    let new_pin_digits = store.record().pin_digits();
    let pin_change = if new_pin_digits != 0 {
        Some(PinChange::Create {
            digits: new_pin_digits,
            allow_skip: ctx.pin_exists && new_pin_digits == old_pin_digits,
        })
    } else if ctx.pin_exists {
        Some(PinChange::Delete)
    } else {
        None
    };

    Ok(MenuOutcome {
        exit,
        pin_change,
        save: Some(save),
    })
}
