//! Implementation of the simulate command for exercising time-based behavior.
//!
//! Installs a simulated time source and then runs the regular daemon against it,
//! so reminders, overlay windows and day rollovers can be observed without waiting
//! for real time to pass. Everything is delivered to the terminal.

use anyhow::{Result, bail};
use chrono::Local;
use chrono_tz::Tz;
use std::sync::Arc;

use crate::Salatr;
use crate::config::Config;
use crate::logger::{Log, LoggerGuard};
use crate::time::source::{self, SimulatedTimeSource};

/// Handle the simulate command.
///
/// # Arguments
/// * `start_time` - Start time in format "YYYY-MM-DD HH:MM:SS", in the location's zone
/// * `end_time` - End time in the same format
/// * `multiplier` - Time acceleration factor (0 = fast-forward)
/// * `log_to_file` - Also write the output to `salatr-simulation-<timestamp>.log`
/// * `debug_enabled` - Whether debug mode is enabled
pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    log_to_file: bool,
    debug_enabled: bool,
) -> Result<()> {
    let _guard = prepare_simulation(start_time, end_time, multiplier, log_to_file, debug_enabled)?;

    Salatr::new(debug_enabled)
        .without_headers()
        .terminal_only()
        .run()
}

/// Install the simulated time source and print the simulation header.
///
/// Returns the file logging guard, which must outlive the simulation.
fn prepare_simulation(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    log_to_file: bool,
    debug_enabled: bool,
) -> Result<Option<LoggerGuard>> {
    // Times are wall-clock times at the configured location
    let time_zone = Config::load()
        .ok()
        .and_then(|config| config.time_zone().ok().flatten())
        .unwrap_or(Tz::UTC);

    let start = source::parse_datetime_in_tz(start_time, time_zone)
        .map_err(|e| anyhow::anyhow!("Invalid start time: {e}"))?;
    let end = source::parse_datetime_in_tz(end_time, time_zone)
        .map_err(|e| anyhow::anyhow!("Invalid end time: {e}"))?;

    if end <= start {
        bail!("End time must be after start time");
    }
    if !multiplier.is_finite() || multiplier < 0.0 {
        bail!("Multiplier must be a number >= 0");
    }

    // The time source must exist BEFORE any logging so timestamps are simulated
    source::init_time_source(Arc::new(SimulatedTimeSource::new(start, end, multiplier)));
    Log::set_display_timezone(time_zone);

    let guard = if log_to_file {
        let file_name = format!(
            "salatr-simulation-{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        let guard = Log::start_file_logging(file_name.clone())?;
        Some((guard, file_name))
    } else {
        None
    };

    log_version!();
    log_block_start!("Simulation Mode");

    let duration = end.signed_duration_since(start);
    log_decorated!(
        "Simulating from {} to {} ({time_zone})",
        start.with_timezone(&time_zone).format("%Y-%m-%d %H:%M:%S"),
        end.with_timezone(&time_zone).format("%Y-%m-%d %H:%M:%S")
    );
    log_indented!(
        "Total simulated time: {} hours {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    );

    if multiplier == 0.0 {
        log_indented!("Time acceleration: fast-forward");
    } else {
        let real_duration_secs = duration.num_seconds() as f64 / multiplier;
        log_indented!(
            "Time acceleration: {multiplier}x (will complete in ~{real_duration_secs:.1} seconds)"
        );
    }

    if let Some((_, file_name)) = &guard {
        log_indented!("Writing output to {file_name}");
    }

    if debug_enabled {
        log_pipe!();
        log_debug!("Simulated time source initialized");
    }

    Ok(guard.map(|(guard, _)| guard))
}

pub fn display_help() {
    log_version!();
    log_block_start!("simulate - Run salatr against simulated time");
    log_block_start!("Usage: salatr simulate <start> <end> [multiplier] [--log]");
    log_block_start!("Arguments:");
    log_indented!("start       Start time, \"YYYY-MM-DD HH:MM:SS\"");
    log_indented!("end         End time, same format");
    log_indented!("multiplier  Speed-up factor (default 3600, 0 = fast-forward)");
    log_block_start!("Options:");
    log_indented!("--log       Also write output to salatr-simulation-<timestamp>.log");
    log_block_start!("Notes:");
    log_indented!("Times are read in the configured location's timezone.");
    log_indented!("Reminders and the overlay are printed to the terminal.");
    log_block_start!("Examples:");
    log_indented!("salatr simulate \"2025-06-02 14:00:00\" \"2025-06-02 21:00:00\"");
    log_indented!("salatr simulate \"2025-06-02 00:00:00\" \"2025-06-04 00:00:00\" 0 --log");
    log_end!();
}
