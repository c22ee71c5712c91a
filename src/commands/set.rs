//! Set command: update configuration fields without hand-editing the file.
//!
//! All pairs are validated and written as one edit, so `latitude` and `longitude`
//! can be changed together. Comments and layout of the file are preserved. A running
//! salatr picks up the change through its file watcher.

use anyhow::{Context, Result};
use std::fs;

use crate::config::{SettingsStore, TomlSettingsStore};
use crate::utils::private_path;

/// Handle the set command - update configuration fields
pub fn handle_set_command(fields: &[(String, String)], debug_enabled: bool) -> Result<()> {
    log_version!();

    let store = TomlSettingsStore::default_location()?;
    let before = fs::read_to_string(store.path()).ok();

    let pairs: Vec<(&str, &str)> = fields
        .iter()
        .map(|(field, value)| (field.as_str(), value.as_str()))
        .collect();

    store.save(&pairs)?;

    let after = fs::read_to_string(store.path())
        .with_context(|| format!("Failed to read config from {}", private_path(store.path())))?;

    if before.as_deref() == Some(after.as_str()) {
        log_block_start!("Configuration unchanged");
        if fields.len() == 1 {
            log_indented!("{} already has that value", fields[0].0);
        } else {
            log_indented!("All fields already have the specified values");
        }
    } else {
        log_block_start!("Updated configuration");
        for (field, value) in fields {
            log_indented!("{field} = {value}");
        }
        log_indented!("in {}", private_path(store.path()));
        log_block_start!("A running salatr applies the change automatically");
    }

    if debug_enabled {
        log_pipe!();
        log_debug!("Settings store: {}", private_path(store.path()));
    }

    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("set - Update configuration field(s)");
    log_block_start!("Usage: salatr set <field>=<value> [<field>=<value>...]");
    log_block_start!("Fields:");
    log_indented!("latitude, longitude     Location in degrees (set together)");
    log_indented!("city                    Display label for the location");
    log_indented!("timezone                IANA zone, e.g. Europe/Istanbul");
    log_indented!("method                  Calculation method, e.g. umm_al_qura");
    log_indented!("madhab                  shafi or hanafi");
    log_indented!("reminders               true or false");
    log_indented!("reminder_minutes        Minutes before each prayer (0-120)");
    log_indented!("overlay                 true or false");
    log_indented!("always_show_overlay     true or false");
    log_block_start!("Examples:");
    log_indented!("salatr set latitude=21.4225 longitude=39.8262 city=Makkah");
    log_indented!("salatr set reminder_minutes=10");
    log_indented!("salatr set method=karachi madhab=hanafi");
    log_end!();
}
