//! Menu command - the interactive boot configuration menu in a terminal

use super::Device;
use anyhow::{bail, Result};
use bootcfg_core::{
    run_menu, Button, ConfigMenu, MenuEntry, MenuExit, MenuHooks, MenuInput, PinChange, SaveKind,
};
use console::{style, Key, Term};

/// Reads buttons from the keyboard
struct KeyboardInput {
    term: Term,
}

impl MenuInput for KeyboardInput {
    fn next_button(&mut self) -> std::io::Result<Option<Button>> {
        loop {
            let button = match self.term.read_key()? {
                Key::ArrowUp | Key::Char('k') => Button::Up,
                Key::ArrowDown | Key::Char('j') => Button::Down,
                Key::ArrowLeft | Key::Home => Button::Left,
                Key::ArrowRight | Key::End => Button::Right,
                Key::Enter | Key::Char(' ') => Button::A,
                Key::Char('s') | Key::Char('S') => Button::Start,
                Key::Escape | Key::Char('q') => return Ok(None),
                _ => continue,
            };
            return Ok(Some(button));
        }
    }
}

/// Draws the menu after every key press
struct TerminalHooks {
    term: Term,
    title: String,
    brightness: Option<u8>,
}

impl TerminalHooks {
    fn draw(&self, menu: &ConfigMenu) -> std::io::Result<()> {
        self.term.clear_screen()?;
        self.term.write_line(&style(&self.title).bold().to_string())?;
        self.term.write_line("")?;
        for line in menu_lines(menu) {
            self.term.write_line(&line)?;
        }
        self.term.write_line("")?;
        if let Some(level) = self.brightness {
            self.term
                .write_line(&style(format!("Brightness preview: slot {}", level)).dim().to_string())?;
        }
        self.term.write_line(
            &style("↑/↓ move  ←/→ first/last  Enter change  s save  Esc quit without saving")
                .dim()
                .to_string(),
        )
    }
}

impl MenuHooks for TerminalHooks {
    fn redraw(&mut self, menu: &ConfigMenu) {
        if let Err(e) = self.draw(menu) {
            tracing::debug!("Failed to draw menu: {}", e);
        }
    }

    fn brightness_changed(&mut self, slot_value: u8) {
        self.brightness = Some(slot_value);
    }
}

/// Text lines of the visible entries, with the selection marked
fn menu_lines(menu: &ConfigMenu) -> Vec<String> {
    let selected = menu.selected();
    menu.entries()
        .map(|entry| {
            let marker = if entry == selected { ">" } else { " " };
            let body = match entry {
                MenuEntry::Multi(option) => {
                    let value = usize::from(menu.multi_value(option));
                    let choice = entry.choices().get(value).copied().unwrap_or("?");
                    format!("{}: {}", entry.label(), choice)
                }
                MenuEntry::Flag(flag) => {
                    let mark = if menu.flag_value(flag) { "x" } else { " " };
                    format!("({}) {}", mark, entry.label())
                }
                MenuEntry::Chainloader | MenuEntry::SaveAndExit => entry.label().to_string(),
            };
            format!("{} {}", marker, body)
        })
        .collect()
}

/// Execute the menu command
pub fn execute(device: &Device, silent: bool) -> Result<()> {
    let term = Term::stdout();
    if !term.is_term() {
        bail!("The menu needs an interactive terminal");
    }

    let mut store = device.open_store()?;
    let loaded = store.read_config();
    let ctx = device.settings.menu_context(device.pin_exists());

    let mut input = KeyboardInput { term: term.clone() };
    let mut hooks = TerminalHooks {
        term: term.clone(),
        title: format!(
            "{}{} configuration",
            store.build().version_string(),
            store.build().revision_suffix()
        ),
        brightness: None,
    };

    term.hide_cursor()?;
    let outcome = run_menu(&mut store, &ctx, &mut input, &mut hooks);
    term.show_cursor()?;
    term.clear_screen()?;
    let outcome = outcome?;

    if outcome.exit == MenuExit::Discard {
        if !silent {
            println!("Left the menu without saving.");
        }
        return Ok(());
    }

    // Booting continues after the menu, which persists the boot config
    // when the stores had to be recreated
    let boot = store.write_config(SaveKind::BootConfig)?;
    if let Some(e) = boot.mirror_error {
        eprintln!("{} Mirror block not written: {}", style("Warning:").yellow(), e);
    }

    if silent {
        return Ok(());
    }

    if !loaded {
        println!(
            "{} Stored configuration was unusable, defaults were edited",
            style("Note:").yellow()
        );
    }
    match outcome.save {
        Some(report) if report.text_written => println!(
            "{} Saved {}",
            style("Success:").green(),
            device.config_path()?.display()
        ),
        _ => println!("No changes to save."),
    }
    if outcome.exit == MenuExit::Chainload {
        println!("Chainloader selected.");
    }
    match outcome.pin_change {
        Some(PinChange::Create { digits, allow_skip }) => println!(
            "{} Set a {}-digit PIN{}",
            style("Next:").cyan(),
            digits,
            if allow_skip {
                " (or keep the current one)"
            } else {
                ""
            }
        ),
        Some(PinChange::Delete) => println!(
            "{} Remove the existing PIN",
            style("Next:").cyan()
        ),
        None => {}
    }

    Ok(())
}
