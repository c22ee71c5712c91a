//! Main application entry point.
//!
//! Parses the command line and dispatches to the daemon or a one-shot command.
//! All application logic lives in the library crate.

use salatr::args::{self, CliAction, ParsedArgs};
use salatr::commands;
use salatr::config;
use salatr::constants::EXIT_FAILURE;
use salatr::{Salatr, log_end, log_error_exit, log_pipe};

fn main() {
    let parsed = ParsedArgs::from_env();

    let result = match parsed.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::HelpCommand { command } => commands::help::run_help_command(command.as_deref()),
        CliAction::Run {
            debug_enabled,
            config_dir,
        } => config::set_config_dir(config_dir).and_then(|()| Salatr::new(debug_enabled).run()),
        CliAction::StatusCommand { json, config_dir } => config::set_config_dir(config_dir)
            .and_then(|()| commands::status::handle_status_command(json)),
        CliAction::SetCommand {
            debug_enabled,
            fields,
            config_dir,
        } => config::set_config_dir(config_dir)
            .and_then(|()| commands::set::handle_set_command(&fields, debug_enabled)),
        CliAction::SimulateCommand {
            debug_enabled,
            start_time,
            end_time,
            multiplier,
            log_to_file,
            config_dir,
        } => config::set_config_dir(config_dir).and_then(|()| {
            commands::simulate::handle_simulate_command(
                &start_time,
                &end_time,
                multiplier,
                log_to_file,
                debug_enabled,
            )
        }),
    };

    if let Err(e) = result {
        log_pipe!();
        log_error_exit!("{e:#}");
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }
}
