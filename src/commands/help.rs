//! Help command: command-specific help, or the command overview.

use anyhow::Result;

/// Run the help command (dispatcher)
///
/// # Arguments
/// * `command` - Optional command name to get help for (None = general help)
pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => display_general_help(),
        Some("help") | Some("h") => display_help_help(),
        Some("set") | Some("s") => super::set::display_help(),
        Some("simulate") | Some("S") => super::simulate::display_help(),
        Some("status") | Some("st") => super::status::display_help(),
        Some(unknown) => {
            log_warning!("Unknown command: {unknown}");
            display_general_help();
        }
    }
    Ok(())
}

fn display_general_help() {
    log_version!();
    log_block_start!("Available Commands:");
    log_indented!("help, h [COMMAND]        Show detailed help for a command");
    log_indented!("set, s <field>=<value>   Update configuration field(s)");
    log_indented!("simulate, S <start> <end> Run against simulated time");
    log_indented!("status, st               Show today's prayer times");
    log_pipe!();
    log_info!("Use 'salatr help <command>' to see detailed help for a specific command.");
    log_indented!("Use 'salatr --help' to see all options and general usage.");
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: salatr help [COMMAND]");
    log_block_start!("Arguments:");
    log_indented!("COMMAND  Optional command to get help for");
    log_indented!("         If omitted, shows general help");
    log_block_start!("Examples:");
    log_indented!("salatr help");
    log_indented!("salatr help set");
    log_end!();
}
