use std::io::IsTerminal;
use std::io::Result;
use std::io::Stdout;
use std::io::stdin;
use std::io::stdout;
use std::panic;
use std::sync::Once;

use crossterm::event::DisableFocusChange;
use crossterm::event::EnableFocusChange;
use ratatui::TerminalOptions;
use ratatui::Viewport;
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::disable_raw_mode;
use ratatui::crossterm::terminal::enable_raw_mode;

use crate::prompt_view::PROMPT_HEIGHT;

pub type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

static PANIC_HOOK: Once = Once::new();

pub fn set_modes() -> Result<()> {
    enable_raw_mode()?;
    // Focus reporting is optional; without it backgrounding is only seen
    // through signals.
    let _ = execute!(stdout(), EnableFocusChange);
    Ok(())
}

/// Restore the terminal to its original state.
/// Inverse of `set_modes`.
pub fn restore() -> Result<()> {
    let _ = execute!(stdout(), DisableFocusChange);
    disable_raw_mode()?;
    let _ = execute!(stdout(), crossterm::cursor::Show);
    Ok(())
}

/// Initialize the terminal with an inline viewport sized for the prompt.
pub fn init() -> Result<Terminal> {
    if !stdin().is_terminal() {
        return Err(std::io::Error::other("stdin is not a terminal"));
    }
    if !stdout().is_terminal() {
        return Err(std::io::Error::other("stdout is not a terminal"));
    }
    set_modes()?;

    set_panic_hook();

    let backend = CrosstermBackend::new(stdout());
    let terminal = ratatui::Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(PROMPT_HEIGHT),
        },
    );
    if terminal.is_err() {
        let _ = restore();
    }
    terminal
}

fn set_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = restore(); // ignore any errors as we are already failing
            hook(panic_info);
        }));
    });
}
