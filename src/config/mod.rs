//! Settings persistence for salatr.
//!
//! Settings live in a single TOML file, by default
//! `$XDG_CONFIG_HOME/salatr/salatr.toml` (the directory can be overridden with
//! `--config <dir>`). A commented default file is written on first start.
//!
//! ```toml
//! #[Location]
//! latitude = 21.422500              # Geographic latitude (-90 to 90)
//! longitude = 39.826200             # Geographic longitude (-180 to 180)
//! city = "Makkah"                   # Display label for the location
//! timezone = "Asia/Riyadh"          # IANA zone, detected from coordinates when unset
//!
//! #[Calculation]
//! method = "umm_al_qura"            # Calculation method, recommended for the zone when unset
//! madhab = "shafi"                  # Asr convention: "shafi" or "hanafi"
//!
//! #[Reminders]
//! reminders = true                  # Send a notification before each prayer
//! reminder_minutes = 15             # Minutes before the prayer (0-120)
//!
//! #[Overlay]
//! overlay = true                    # Show the countdown overlay before each prayer
//! always_show_overlay = false       # Keep the overlay visible at all times
//! ```
//!
//! All keys are optional; accessors on [`Config`] resolve the defaults. The running
//! daemon picks up edits through the file watcher or `SIGUSR2`.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

use anyhow::{Context, Result};
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::prayer::overlay::OverlaySettings;
use crate::prayer::reminders::ReminderSettings;
use crate::prayer::{CalculationMethod, LocationConfig, Madhab};
use crate::utils::private_path;

pub use loading::{get_config_path, get_custom_config_dir, set_config_dir};
pub use watcher::start_config_watcher;

/// Contents of `salatr.toml`.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    /// IANA zone name
    pub timezone: Option<String>,
    pub method: Option<CalculationMethod>,
    pub madhab: Option<Madhab>,
    pub reminders: Option<bool>,
    pub reminder_minutes: Option<u32>,
    pub overlay: Option<bool>,
    pub always_show_overlay: Option<bool>,
}

impl Config {
    pub fn load() -> Result<Self> {
        loading::load()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loading::load_from_path(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        loading::get_config_path()
    }

    /// Configured zone, falling back to the zone at the coordinates.
    pub fn time_zone(&self) -> Result<Option<Tz>> {
        if let Some(name) = &self.timezone {
            let tz = name
                .parse::<Tz>()
                .map_err(|_| anyhow::anyhow!("Unknown timezone '{name}'"))?;
            return Ok(Some(tz));
        }

        Ok(self
            .coordinates()
            .and_then(|(lat, lon)| crate::geo::determine_timezone_from_coordinates(lat, lon)))
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Inputs for schedule computation, or None without a saved location.
    pub fn location_config(&self) -> Result<Option<LocationConfig>> {
        let Some((latitude, longitude)) = self.coordinates() else {
            return Ok(None);
        };

        let time_zone = self
            .time_zone()?
            .context("Could not determine a timezone for the configured coordinates")?;

        let method = self
            .method
            .unwrap_or_else(|| crate::geo::recommended_method(time_zone));

        Ok(Some(LocationConfig {
            latitude,
            longitude,
            time_zone,
            method,
            madhab: self.madhab.unwrap_or_default(),
        }))
    }

    pub fn reminder_minutes(&self) -> u32 {
        self.reminder_minutes.unwrap_or(DEFAULT_REMINDER_MINUTES)
    }

    pub fn lead_time(&self) -> Duration {
        Duration::minutes(i64::from(self.reminder_minutes()))
    }

    pub fn reminder_settings(&self) -> ReminderSettings {
        ReminderSettings {
            enabled: self.reminders.unwrap_or(DEFAULT_REMINDERS_ENABLED),
            lead_time: self.lead_time(),
        }
    }

    /// The overlay window shares the reminder lead time.
    pub fn overlay_settings(&self) -> OverlaySettings {
        OverlaySettings {
            enabled: self.overlay.unwrap_or(DEFAULT_OVERLAY_ENABLED),
            always_show: self
                .always_show_overlay
                .unwrap_or(DEFAULT_ALWAYS_SHOW_OVERLAY),
            lead_time: self.lead_time(),
        }
    }

    /// Log the effective settings as a block.
    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");

        match self.coordinates() {
            Some((lat, lon)) => {
                let lat_dir = if lat >= 0.0 { "N" } else { "S" };
                let lon_dir = if lon >= 0.0 { "E" } else { "W" };
                let label = self
                    .city
                    .as_deref()
                    .map(|city| format!(" ({city})"))
                    .unwrap_or_default();
                log_indented!(
                    "Location: {:.4}°{lat_dir}, {:.4}°{lon_dir}{label}",
                    lat.abs(),
                    lon.abs()
                );
            }
            None => log_indented!("Location: not set"),
        }

        if let Ok(Some(location)) = self.location_config() {
            log_indented!("Timezone: {}", location.time_zone);
            log_indented!("Method: {}", location.method.display_name());
            log_indented!("Madhab: {}", location.madhab.display_name());
        }

        let reminders = self.reminder_settings();
        if reminders.is_active() {
            log_indented!("Reminders: {} minutes before", self.reminder_minutes());
        } else {
            log_indented!("Reminders: off");
        }

        let overlay = self.overlay_settings();
        let overlay_mode = match (overlay.enabled, overlay.always_show) {
            (false, _) => "off",
            (true, true) => "always visible",
            (true, false) => "before each prayer",
        };
        log_indented!("Overlay: {overlay_mode}");
    }
}

/// Key-value persistence boundary for settings.
pub trait SettingsStore: Send {
    fn load(&self) -> Result<Config>;

    /// Validate and persist `key = value` pairs as one edit.
    fn save(&self, updates: &[(&str, &str)]) -> Result<()>;
}

/// [`SettingsStore`] backed by a TOML file.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the resolved default (or `--config`) location.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(get_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            builder::create_default_config(&self.path)?;
        }
        loading::load_from_path(&self.path)
    }

    fn save(&self, updates: &[(&str, &str)]) -> Result<()> {
        let formatted = updates
            .iter()
            .map(|(key, value)| {
                validation::validate_field_value(key, value)
                    .with_context(|| format!("Invalid value for {key}"))
                    .map(|literal| (*key, literal))
            })
            .collect::<Result<Vec<_>>>()?;

        if !self.path.exists() {
            builder::create_default_config(&self.path)?;
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {}", private_path(&self.path)))?;
        let updated = formatted
            .iter()
            .fold(content.clone(), |acc, (key, literal)| {
                builder::update_field_in_content(&acc, key, literal)
            });

        // The whole file must still load after the edit
        let config: Config =
            toml::from_str(&updated).context("The edit would produce an invalid config")?;
        validation::validate_config(&config)?;

        if updated != content {
            std::fs::write(&self.path, updated)
                .with_context(|| format!("Failed to write config to {}", private_path(&self.path)))?;
        }
        Ok(())
    }
}
