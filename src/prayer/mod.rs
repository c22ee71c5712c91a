//! Prayer schedule data model.
//!
//! A [`Schedule`] is one local calendar day of the six daily events in their fixed
//! order. Schedules are produced by an [`cache::AstronomicalTimeProvider`], held by the
//! [`cache::ScheduleCache`] and read by everything else; they are never mutated after
//! construction.
//!
//! Submodules build the live behaviour on top of this data:
//! - [`cache`]: today/tomorrow schedule pair with rollover and invalidation
//! - [`live`]: pure derivation of current/next event, countdown and daylight progress
//! - [`reminders`]: reconciliation of reminder requests against a notification sink
//! - [`overlay`]: the per-occurrence overlay visibility state machine

pub mod cache;
pub mod live;
pub mod overlay;
pub mod reminders;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::ISHA_INTERVAL_MINUTES;

/// The six daily events, in their fixed chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    /// Freedesktop icon name used for notifications and the overlay.
    pub fn symbol(self) -> &'static str {
        match self {
            Prayer::Fajr => "daytime-sunrise-symbolic",
            Prayer::Sunrise => "weather-few-clouds-symbolic",
            Prayer::Dhuhr => "weather-clear-symbolic",
            Prayer::Asr => "weather-overcast-symbolic",
            Prayer::Maghrib => "daytime-sunset-symbolic",
            Prayer::Isha => "weather-clear-night-symbolic",
        }
    }

    /// Sunrise is informational only and never reminded.
    pub fn is_reminder_eligible(self) -> bool {
        self != Prayer::Sunrise
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One event of a schedule at its concrete instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub prayer: Prayer,
    pub at: DateTime<Utc>,
}

/// Errors produced while obtaining a schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("no location configured")]
    NoLocation,

    #[error("schedule unavailable for {date}: {reason}")]
    Unavailable { date: NaiveDate, reason: String },
}

/// One local calendar day of prayer instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    calendar_date: NaiveDate,
    entries: [ScheduleEntry; 6],
    time_zone: Tz,
}

impl Schedule {
    /// Build a schedule from the six instants in [`Prayer::ALL`] order.
    ///
    /// Fails unless the instants are strictly increasing. The calendar date is the
    /// local day (in `time_zone`) containing Fajr.
    pub fn new(time_zone: Tz, instants: [DateTime<Utc>; 6]) -> Result<Self, ScheduleError> {
        let calendar_date = instants[0].with_timezone(&time_zone).date_naive();

        if let Some(pair) = instants.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(ScheduleError::Unavailable {
                date: calendar_date,
                reason: format!(
                    "{} is not before {}",
                    Prayer::ALL[pair],
                    Prayer::ALL[pair + 1]
                ),
            });
        }

        let entries = std::array::from_fn(|i| ScheduleEntry {
            prayer: Prayer::ALL[i],
            at: instants[i],
        });

        Ok(Self {
            calendar_date,
            entries,
            time_zone,
        })
    }

    pub fn calendar_date(&self) -> NaiveDate {
        self.calendar_date
    }

    pub fn entries(&self) -> &[ScheduleEntry; 6] {
        &self.entries
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn instant(&self, prayer: Prayer) -> DateTime<Utc> {
        self.entries[prayer.index()].at
    }

    pub fn sunrise(&self) -> DateTime<Utc> {
        self.instant(Prayer::Sunrise)
    }

    /// Sunset coincides with Maghrib.
    pub fn sunset(&self) -> DateTime<Utc> {
        self.instant(Prayer::Maghrib)
    }

    /// Whether `now` falls on this schedule's local calendar day.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now.with_timezone(&self.time_zone).date_naive() == self.calendar_date
    }

    /// Wall-clock `HH:MM` of an instant in this schedule's zone.
    pub fn local_time_label(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.time_zone).format("%H:%M").to_string()
    }
}

/// Astronomical calculation conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    MuslimWorldLeague,
    Egyptian,
    Karachi,
    UmmAlQura,
    Dubai,
    MoonsightingCommittee,
    NorthAmerica,
    Kuwait,
    Qatar,
    Singapore,
    Tehran,
    Turkey,
}

/// How the Isha instant is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IshaRule {
    /// Sun depression angle below the horizon, in degrees
    Angle(f64),
    /// Fixed number of minutes after Maghrib
    Interval(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodParameters {
    pub fajr_angle: f64,
    pub isha: IshaRule,
    /// Maghrib by depression angle instead of sunset
    pub maghrib_angle: Option<f64>,
}

impl CalculationMethod {
    pub const ALL: [CalculationMethod; 12] = [
        CalculationMethod::MuslimWorldLeague,
        CalculationMethod::Egyptian,
        CalculationMethod::Karachi,
        CalculationMethod::UmmAlQura,
        CalculationMethod::Dubai,
        CalculationMethod::MoonsightingCommittee,
        CalculationMethod::NorthAmerica,
        CalculationMethod::Kuwait,
        CalculationMethod::Qatar,
        CalculationMethod::Singapore,
        CalculationMethod::Tehran,
        CalculationMethod::Turkey,
    ];

    /// Config file spelling.
    pub fn key(self) -> &'static str {
        match self {
            CalculationMethod::MuslimWorldLeague => "muslim_world_league",
            CalculationMethod::Egyptian => "egyptian",
            CalculationMethod::Karachi => "karachi",
            CalculationMethod::UmmAlQura => "umm_al_qura",
            CalculationMethod::Dubai => "dubai",
            CalculationMethod::MoonsightingCommittee => "moonsighting_committee",
            CalculationMethod::NorthAmerica => "north_america",
            CalculationMethod::Kuwait => "kuwait",
            CalculationMethod::Qatar => "qatar",
            CalculationMethod::Singapore => "singapore",
            CalculationMethod::Tehran => "tehran",
            CalculationMethod::Turkey => "turkey",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CalculationMethod::MuslimWorldLeague => "Muslim World League",
            CalculationMethod::Egyptian => "Egyptian General Authority",
            CalculationMethod::Karachi => "University of Islamic Sciences, Karachi",
            CalculationMethod::UmmAlQura => "Umm al-Qura University, Makkah",
            CalculationMethod::Dubai => "Dubai",
            CalculationMethod::MoonsightingCommittee => "Moonsighting Committee",
            CalculationMethod::NorthAmerica => "ISNA (North America)",
            CalculationMethod::Kuwait => "Kuwait",
            CalculationMethod::Qatar => "Qatar",
            CalculationMethod::Singapore => "Singapore",
            CalculationMethod::Tehran => "Institute of Geophysics, Tehran",
            CalculationMethod::Turkey => "Diyanet, Turkey",
        }
    }

    pub fn parameters(self) -> MethodParameters {
        let (fajr_angle, isha, maghrib_angle) = match self {
            CalculationMethod::MuslimWorldLeague => (18.0, IshaRule::Angle(17.0), None),
            CalculationMethod::Egyptian => (19.5, IshaRule::Angle(17.5), None),
            CalculationMethod::Karachi => (18.0, IshaRule::Angle(18.0), None),
            CalculationMethod::UmmAlQura => {
                (18.5, IshaRule::Interval(ISHA_INTERVAL_MINUTES), None)
            }
            CalculationMethod::Dubai => (18.2, IshaRule::Angle(18.2), None),
            CalculationMethod::MoonsightingCommittee => (18.0, IshaRule::Angle(18.0), None),
            CalculationMethod::NorthAmerica => (15.0, IshaRule::Angle(15.0), None),
            CalculationMethod::Kuwait => (18.0, IshaRule::Angle(17.5), None),
            CalculationMethod::Qatar => {
                (18.0, IshaRule::Interval(ISHA_INTERVAL_MINUTES), None)
            }
            CalculationMethod::Singapore => (20.0, IshaRule::Angle(18.0), None),
            CalculationMethod::Tehran => (17.7, IshaRule::Angle(14.0), Some(4.5)),
            CalculationMethod::Turkey => (18.0, IshaRule::Angle(17.0), None),
        };

        MethodParameters {
            fajr_angle,
            isha,
            maghrib_angle,
        }
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CalculationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        CalculationMethod::ALL
            .into_iter()
            .find(|method| method.key() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = CalculationMethod::ALL.iter().map(|m| m.key()).collect();
                format!("Unknown method '{s}'. Valid methods: {}", valid.join(", "))
            })
    }
}

/// Jurisprudential school, which only affects Asr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Madhab {
    #[default]
    Shafi,
    Hanafi,
}

impl Madhab {
    /// Shadow length multiple of an object's height at Asr.
    pub fn shadow_factor(self) -> f64 {
        match self {
            Madhab::Shafi => 1.0,
            Madhab::Hanafi => 2.0,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Madhab::Shafi => "shafi",
            Madhab::Hanafi => "hanafi",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Madhab::Shafi => "Shafi / Maliki / Hanbali",
            Madhab::Hanafi => "Hanafi",
        }
    }
}

impl fmt::Display for Madhab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Madhab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shafi" => Ok(Madhab::Shafi),
            "hanafi" => Ok(Madhab::Hanafi),
            _ => Err(format!("Unknown madhab '{s}'. Valid values: shafi, hanafi")),
        }
    }
}

/// Everything a provider needs to compute a schedule. Changing any field
/// invalidates cached schedules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub time_zone: Tz,
    pub method: CalculationMethod,
    pub madhab: Madhab,
}
