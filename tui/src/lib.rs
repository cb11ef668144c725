// Forbid accidental stdout/stderr writes in the library; the prompt owns the
// terminal while it is shown. `notice` opts out locally via `allow`.
#![deny(clippy::print_stdout, clippy::print_stderr)]
#![cfg(unix)]

mod frontend;
mod prompt_view;
pub mod terminal;

pub use frontend::TerminalFrontend;
