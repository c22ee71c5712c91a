//! # Salatr Library
//!
//! Internal library for the salatr binary: daily prayer times, reminders and a
//! pre-prayer overlay, computed locally from a saved location.
//!
//! This library exists to enable testing of the internals and provide clean separation
//! between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Entry Point**: [`Salatr`] acquires resources and starts the controller
//! - **Core Logic**: `core` drives the tick loop and reacts to control events
//! - **Domain**: `prayer` holds schedules, the schedule cache, live view derivation,
//!   reminder reconciliation and the overlay state machine
//! - **Astronomy**: `geo` computes schedules and resolves zone and method defaults
//! - **Configuration**: `config` for the TOML settings store with hot-reload
//! - **Commands**: `commands` for CLI subcommands (status, set, simulate, help)
//! - **Infrastructure**: `io` (signals, D-Bus, notifications, overlay), `time`,
//!   logging and utilities

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod commands;
pub mod config;
pub mod constants;
pub mod core;
pub mod geo;
pub mod io;
pub mod prayer;
pub mod time;
pub mod utils;

mod salatr;

pub use salatr::Salatr;
