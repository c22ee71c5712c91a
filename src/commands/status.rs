//! Status command: today's schedule and the live state, computed once.
//!
//! Works without a running daemon. Supports human-readable and JSON output.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::config::Config;
use crate::geo::SolarTimeProvider;
use crate::logger::Log;
use crate::prayer::cache::{ScheduleCache, SchedulePair};
use crate::prayer::live::{self, DerivedViewState};
use crate::prayer::{LocationConfig, Prayer};
use crate::time::source;
use crate::utils::progress_bar;

const PROGRESS_BAR_WIDTH: usize = 24;

#[derive(Debug, Serialize)]
struct LocationReport {
    latitude: f64,
    longitude: f64,
    city: Option<String>,
    timezone: String,
    method: String,
    madhab: String,
}

#[derive(Debug, Serialize)]
struct EntryReport {
    prayer: Prayer,
    /// Local `HH:MM`
    time: String,
    at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    location: Option<LocationReport>,
    date: Option<NaiveDate>,
    entries: Vec<EntryReport>,
    state: DerivedViewState,
    countdown: String,
    menu_bar: String,
    symbol: Option<&'static str>,
    error: Option<String>,
}

impl StatusReport {
    fn build(config: &Config, now: DateTime<Utc>) -> Result<Self> {
        let Some(location) = config.location_config()? else {
            return Ok(Self::unavailable(None, "no location configured".to_string()));
        };

        let location_report = LocationReport {
            latitude: location.latitude,
            longitude: location.longitude,
            city: config.city.clone(),
            timezone: location.time_zone.name().to_string(),
            method: location.method.key().to_string(),
            madhab: location.madhab.key().to_string(),
        };

        let mut cache = ScheduleCache::new(Box::new(SolarTimeProvider));
        cache.configure(Some(location));
        let pair = match cache.current_schedules(now) {
            Ok(pair) => pair,
            Err(e) => return Ok(Self::unavailable(Some(location_report), e.to_string())),
        };

        Ok(Self::from_schedules(location_report, &location, pair, now))
    }

    fn from_schedules(
        location_report: LocationReport,
        location: &LocationConfig,
        pair: &SchedulePair,
        now: DateTime<Utc>,
    ) -> Self {
        let state = live::derive(now, &pair.today, &pair.tomorrow);
        let entries = pair
            .today
            .entries()
            .iter()
            .map(|entry| EntryReport {
                prayer: entry.prayer,
                time: pair.today.local_time_label(entry.at),
                at: entry.at,
            })
            .collect();

        Self {
            location: Some(location_report),
            date: Some(pair.today.calendar_date()),
            entries,
            countdown: state.countdown_text(),
            menu_bar: state.menu_bar_text(location.time_zone),
            symbol: state.next.map(Prayer::symbol),
            state,
            error: None,
        }
    }

    fn unavailable(location: Option<LocationReport>, error: String) -> Self {
        let state = DerivedViewState::unavailable();
        Self {
            location,
            date: None,
            entries: Vec::new(),
            countdown: state.countdown_text(),
            menu_bar: state.menu_bar_text(Tz::UTC),
            symbol: None,
            state,
            error: Some(error),
        }
    }
}

/// Handle the status command.
///
/// # Arguments
/// * `json` - Print a JSON document instead of the log-style table
pub fn handle_status_command(json: bool) -> Result<()> {
    if json {
        // Keep stdout parseable
        Log::set_enabled(false);
    }

    let config = Config::load()?;
    let report = StatusReport::build(&config, source::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_human_readable(&report);
    }
    Ok(())
}

fn display_human_readable(report: &StatusReport) {
    log_version!();

    if let Some(location) = &report.location {
        let label = location
            .city
            .clone()
            .unwrap_or_else(|| format!("{:.4}°, {:.4}°", location.latitude, location.longitude));
        log_block_start!("Location: {label} ({})", location.timezone);
        log_indented!("Method: {}, madhab: {}", location.method, location.madhab);
    }

    if let Some(error) = &report.error {
        log_pipe!();
        log_warning!("Prayer times unavailable: {error}");
        if report.location.is_none() {
            log_indented!("Set a location with: salatr set latitude=<lat> longitude=<lon>");
        }
        log_end!();
        return;
    }

    if let Some(date) = report.date {
        log_block_start!("Prayer times for {}", date.format("%A, %Y-%m-%d"));
    }
    for entry in &report.entries {
        let marker = if Some(entry.at) == report.state.next_at {
            "▸"
        } else if Some(entry.prayer) == report.state.current {
            "●"
        } else {
            " "
        };
        log_indented!("{marker} {:<8} {}", entry.prayer.display_name(), entry.time);
    }

    if let Some(next) = report.state.next {
        log_block_start!("Next: {next} in {}", report.countdown);
        log_indented!("{}", report.menu_bar);
    }
    log_indented!(
        "Daylight {} {:>3.0}%",
        progress_bar(report.state.daylight_progress, PROGRESS_BAR_WIDTH),
        report.state.daylight_progress * 100.0
    );
    log_end!();
}

pub fn display_help() {
    log_version!();
    log_block_start!("status - Show today's prayer times and the live countdown");
    log_block_start!("Usage: salatr status [--json]");
    log_block_start!("Options:");
    log_indented!("-j, --json  Print a JSON document for scripts and status bars");
    log_block_start!("Notes:");
    log_indented!("Times are computed from the saved configuration;");
    log_indented!("no running salatr instance is needed.");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn makkah() -> Config {
        Config {
            latitude: Some(21.4225),
            longitude: Some(39.8262),
            city: Some("Makkah".to_string()),
            timezone: Some("Asia/Riyadh".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_report_without_location() {
        let report = StatusReport::build(&Config::default(), Utc::now()).unwrap();
        assert!(report.location.is_none());
        assert!(report.entries.is_empty());
        assert_eq!(report.menu_bar, "No Location");
        assert!(report.error.is_some());
    }

    #[test]
    fn test_report_lists_six_entries_in_order() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let report = StatusReport::build(&makkah(), now).unwrap();

        let prayers: Vec<Prayer> = report.entries.iter().map(|e| e.prayer).collect();
        assert_eq!(prayers, Prayer::ALL.to_vec());
        assert!(report.entries.windows(2).all(|w| w[0].at < w[1].at));
        assert_eq!(report.date, NaiveDate::from_ymd_opt(2025, 3, 10));

        // 12:00 in Makkah: after Sunrise, before Dhuhr
        assert_eq!(report.state.current, Some(Prayer::Sunrise));
        assert_eq!(report.state.next, Some(Prayer::Dhuhr));
        assert_eq!(report.symbol, Some(Prayer::Dhuhr.symbol()));
        assert!(report.menu_bar.starts_with("Dhuhr "));
    }

    #[test]
    fn test_report_serializes_lowercase_prayers() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let report = StatusReport::build(&makkah(), now).unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["entries"][0]["prayer"], "fajr");
        assert_eq!(value["location"]["timezone"], "Asia/Riyadh");
        assert_eq!(value["state"]["next"], "dhuhr");
        assert!(value["error"].is_null());
    }
}
