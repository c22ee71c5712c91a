//! Configuration validation.
//!
//! [`validate_config`] checks a whole loaded file; [`validate_field_value`] checks a
//! single `key = value` edit from the `set` command and returns the TOML literal to
//! write.

use anyhow::{Context, Result};
use chrono_tz::Tz;

use super::Config;
use crate::constants::*;
use crate::prayer::{CalculationMethod, Madhab};

/// Every key `salatr.toml` accepts.
pub const FIELDS: [&str; 10] = [
    "latitude",
    "longitude",
    "city",
    "timezone",
    "method",
    "madhab",
    "reminders",
    "reminder_minutes",
    "overlay",
    "always_show_overlay",
];

pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {lat})");
    }

    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!("longitude must be between -180 and 180 degrees (got {lon})");
    }

    if config.latitude.is_some() != config.longitude.is_some() {
        anyhow::bail!("latitude and longitude must be set together");
    }

    if let Some(tz) = &config.timezone {
        let name = tz.trim();
        if !name.is_empty() && name.parse::<Tz>().is_err() {
            anyhow::bail!("Unknown timezone '{name}' (use an IANA name like \"Europe/London\")");
        }
    }

    if let Some(minutes) = config.reminder_minutes
        && !(MINIMUM_REMINDER_MINUTES..=MAXIMUM_REMINDER_MINUTES).contains(&minutes)
    {
        anyhow::bail!(
            "reminder_minutes ({minutes}) must be between {MINIMUM_REMINDER_MINUTES} and {MAXIMUM_REMINDER_MINUTES}"
        );
    }

    Ok(())
}

/// Validate one field edit and return the value formatted as a TOML literal.
pub fn validate_field_value(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    let unquoted = value.trim_matches(|c| c == '"' || c == '\'');

    match field {
        "latitude" => {
            let lat = parse_number(unquoted, "Latitude")?;
            if !(-90.0..=90.0).contains(&lat) {
                anyhow::bail!("Latitude must be between -90 and 90 degrees");
            }
            Ok(format!("{lat:.6}"))
        }

        "longitude" => {
            let lon = parse_number(unquoted, "Longitude")?;
            if !(-180.0..=180.0).contains(&lon) {
                anyhow::bail!("Longitude must be between -180 and 180 degrees");
            }
            Ok(format!("{lon:.6}"))
        }

        "city" => Ok(toml_string(unquoted)),

        "timezone" => {
            let tz: Tz = unquoted
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown timezone '{unquoted}'"))?;
            Ok(toml_string(tz.name()))
        }

        "method" => {
            let method: CalculationMethod =
                unquoted.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            Ok(toml_string(method.key()))
        }

        "madhab" => {
            let madhab: Madhab = unquoted.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            Ok(toml_string(madhab.key()))
        }

        "reminder_minutes" => {
            let minutes: u32 = unquoted
                .parse()
                .context("Reminder minutes must be a whole number")?;
            if !(MINIMUM_REMINDER_MINUTES..=MAXIMUM_REMINDER_MINUTES).contains(&minutes) {
                anyhow::bail!(
                    "Reminder minutes must be between {MINIMUM_REMINDER_MINUTES} and {MAXIMUM_REMINDER_MINUTES}"
                );
            }
            Ok(minutes.to_string())
        }

        "reminders" | "overlay" | "always_show_overlay" => parse_bool(unquoted).map(|b| b.to_string()),

        _ => anyhow::bail!(
            "Unknown configuration field: '{field}' (valid fields: {})",
            FIELDS.join(", ")
        ),
    }
}

fn parse_number(value: &str, what: &str) -> Result<f64> {
    let number: f64 = value
        .parse()
        .with_context(|| format!("{what} must be a number"))?;
    if !number.is_finite() {
        anyhow::bail!("{what} must be a finite number");
    }
    Ok(number)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Must be true or false"),
    }
}

fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
