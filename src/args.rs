//! Command-line argument parsing.
//!
//! Global flags (`--debug`, `--config <dir>`, `--help`, `--version`) may appear
//! anywhere. The first positional argument selects a command; without one salatr
//! runs the prayer-time daemon.

/// Default speed-up for `simulate` when no multiplier is given.
pub const DEFAULT_SIMULATION_MULTIPLIER: f64 = 3600.0;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Print today's schedule and the live state once
    StatusCommand {
        json: bool,
        config_dir: Option<String>,
    },
    /// Update configuration fields
    SetCommand {
        debug_enabled: bool,
        fields: Vec<(String, String)>,
        config_dir: Option<String>,
    },
    /// Run the daemon against simulated time
    SimulateCommand {
        debug_enabled: bool,
        start_time: String,
        end_time: String,
        /// 0 runs as fast as possible
        multiplier: f64,
        log_to_file: bool,
        config_dir: Option<String>,
    },
    /// Help for one command, or the command overview
    HelpCommand { command: Option<String> },

    ShowHelp,
    ShowVersion,
    /// Show help due to invalid arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments, including the program name in first position.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut json = false;
        let mut log_to_file = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut positionals: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args_vec.len() {
            let arg = args_vec[i].as_str();
            match arg {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--json" | "-j" => json = true,
                "--log" => log_to_file = true,
                "--config" | "-c" => {
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        config_dir = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        unknown_arg_found = true;
                    }
                }
                // Negative numbers are values, not flags
                _ if arg.starts_with('-') && arg.parse::<f64>().is_err() => {
                    log_warning!("Unknown option: {arg}");
                    unknown_arg_found = true;
                }
                _ => positionals.push(arg.to_string()),
            }
            i += 1;
        }

        let action = if display_version {
            CliAction::ShowVersion
        } else if display_help {
            CliAction::ShowHelp
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else {
            Self::parse_command(
                &positionals,
                debug_enabled,
                json,
                log_to_file,
                config_dir,
            )
        };

        ParsedArgs { action }
    }

    fn parse_command(
        positionals: &[String],
        debug_enabled: bool,
        json: bool,
        log_to_file: bool,
        config_dir: Option<String>,
    ) -> CliAction {
        let Some((command, rest)) = positionals.split_first() else {
            if json || log_to_file {
                log_warning!("--json and --log need a command (status, simulate)");
                return CliAction::ShowHelpDueToError;
            }
            return CliAction::Run {
                debug_enabled,
                config_dir,
            };
        };

        let command = command.as_str();
        if json && !matches!(command, "status" | "st") {
            log_warning!("--json is only supported by the status command");
            return CliAction::ShowHelpDueToError;
        }
        if log_to_file && !matches!(command, "simulate" | "S") {
            log_warning!("--log is only supported by the simulate command");
            return CliAction::ShowHelpDueToError;
        }

        match command {
            "status" | "st" => {
                if !rest.is_empty() {
                    log_warning!("status takes no arguments. Usage: salatr status [--json]");
                    return CliAction::ShowHelpDueToError;
                }
                CliAction::StatusCommand { json, config_dir }
            }
            "set" | "s" => {
                let mut fields = Vec::new();
                for pair in rest {
                    match pair.split_once('=') {
                        Some((field, value)) if !field.trim().is_empty() => {
                            fields.push((field.trim().to_string(), value.trim().to_string()));
                        }
                        _ => {
                            log_warning!("Expected <field>=<value>, got '{pair}'");
                            return CliAction::ShowHelpDueToError;
                        }
                    }
                }

                if fields.is_empty() {
                    log_warning!(
                        "Missing field. Usage: salatr set <field>=<value> [<field>=<value>...]"
                    );
                    log_warning!("Example: salatr set latitude=21.4225 longitude=39.8262");
                    return CliAction::ShowHelpDueToError;
                }

                CliAction::SetCommand {
                    debug_enabled,
                    fields,
                    config_dir,
                }
            }
            "simulate" | "S" => {
                let (start_time, end_time) = match rest {
                    [start, end, ..] => (start.clone(), end.clone()),
                    _ => {
                        log_warning!(
                            "Missing arguments. Usage: salatr simulate <start> <end> [multiplier] [--log]"
                        );
                        return CliAction::ShowHelpDueToError;
                    }
                };

                let multiplier = match rest.get(2) {
                    None => DEFAULT_SIMULATION_MULTIPLIER,
                    Some(value) => match value.parse::<f64>() {
                        Ok(m) if m.is_finite() && m >= 0.0 => m,
                        _ => {
                            log_warning!("Invalid multiplier '{value}' (use a number >= 0)");
                            return CliAction::ShowHelpDueToError;
                        }
                    },
                };

                if rest.len() > 3 {
                    log_warning!("Too many arguments for simulate");
                    return CliAction::ShowHelpDueToError;
                }

                CliAction::SimulateCommand {
                    debug_enabled,
                    start_time,
                    end_time,
                    multiplier,
                    log_to_file,
                    config_dir,
                }
            }
            "help" | "h" => CliAction::HelpCommand {
                command: rest.first().cloned(),
            },
            unknown => {
                log_warning!("Unknown command: {unknown}");
                CliAction::ShowHelpDueToError
            }
        }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays the usage overview.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("salatr [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("status, st [--json]    Show today's prayer times and the live countdown");
    log_indented!("set, s <field>=<value> Update configuration field(s)");
    log_indented!("simulate, S <start> <end> [multiplier] [--log]");
    log_indented!("                       Run against simulated time");
    log_indented!("help, h [COMMAND]      Show detailed help for a command");
    log_end!();
}
