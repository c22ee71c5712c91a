//! One-shot CLI commands.
//!
//! Each command lives in its own submodule and exposes a `handle_*_command`
//! entry point plus, where useful, a `display_help` used by `salatr help <command>`.

pub mod help;
pub mod set;
pub mod simulate;
pub mod status;
