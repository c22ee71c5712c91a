//! Astronomical prayer-time calculation.
//!
//! Sunrise and sunset come from the `sunrise` crate. The remaining events are
//! derived from the same solar day: Dhuhr at solar noon, Fajr and Isha where the sun
//! reaches the method's depression angle, Asr where an object's shadow grows to the
//! madhab's factor plus its noon length.
//!
//! Hours are kept as fractional UTC hours relative to the anchor date's midnight
//! until the final conversion to instants, which are rounded to whole minutes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use crate::constants::HIGH_LATITUDE_THRESHOLD;
use crate::prayer::cache::AstronomicalTimeProvider;
use crate::prayer::{IshaRule, LocationConfig, Schedule, ScheduleError};

/// Apparent altitude of the sun's upper limb at sunrise and sunset, refraction included.
const HORIZON_ALTITUDE: f64 = -0.833;

/// Default provider backed by solar-position formulas.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolarTimeProvider;

impl SolarTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl AstronomicalTimeProvider for SolarTimeProvider {
    fn compute(
        &self,
        location: &LocationConfig,
        date: NaiveDate,
    ) -> Result<Schedule, ScheduleError> {
        compute_schedule(location, date)
    }
}

/// Declination (degrees) and equation of time (hours) for a Julian day.
fn sun_position(julian_day: f64) -> (f64, f64) {
    let d = julian_day - 2451545.0;
    let g = fix_degrees(357.529 + 0.98560028 * d);
    let q = fix_degrees(280.459 + 0.98564736 * d);
    let l = fix_degrees(q + 1.915 * sin_deg(g) + 0.020 * sin_deg(2.0 * g));
    let e = 23.439 - 0.00000036 * d;

    let right_ascension = fix_hours(atan2_deg(cos_deg(e) * sin_deg(l), cos_deg(l)) / 15.0);
    let mut equation_of_time = q / 15.0 - right_ascension;
    // Keep the difference near zero across the 0/24 wrap
    if equation_of_time > 12.0 {
        equation_of_time -= 24.0;
    } else if equation_of_time < -12.0 {
        equation_of_time += 24.0;
    }

    let declination = asin_deg(sin_deg(e) * sin_deg(l));
    (declination, equation_of_time)
}

/// Hour angle (hours) at which the sun reaches `altitude`, or None if it never does.
fn hour_angle(altitude: f64, latitude: f64, declination: f64) -> Option<f64> {
    let cos_h = (sin_deg(altitude) - sin_deg(latitude) * sin_deg(declination))
        / (cos_deg(latitude) * cos_deg(declination));
    (-1.0..=1.0)
        .contains(&cos_h)
        .then(|| acos_deg(cos_h) / 15.0)
}

/// Altitude of the sun when a shadow is `factor` object-lengths plus its noon length.
fn asr_altitude(factor: f64, latitude: f64, declination: f64) -> f64 {
    let tangent = factor + tan_deg((latitude - declination).abs());
    atan2_deg(1.0, tangent)
}

fn julian_day(date: NaiveDate) -> f64 {
    let (mut year, mut month) = (date.year() as f64, date.month() as f64);
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }
    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + date.day() as f64
        + b
        - 1524.5
}

/// Compute the schedule for the local calendar day `date`.
pub fn compute_schedule(
    location: &LocationConfig,
    date: NaiveDate,
) -> Result<Schedule, ScheduleError> {
    let unavailable = |reason: String| ScheduleError::Unavailable { date, reason };

    let coordinates = Coordinates::new(location.latitude, location.longitude)
        .ok_or_else(|| unavailable("invalid coordinates".to_string()))?;

    // The UTC day whose solar noon falls on the requested local day
    let mut anchor = date;
    let noon = solar_noon(location.longitude, anchor);
    let local_noon_date = to_instant(anchor, noon)
        .with_timezone(&location.time_zone)
        .date_naive();
    if local_noon_date != date {
        anchor = date - (local_noon_date - date);
    }

    let noon = solar_noon(location.longitude, anchor);
    let (declination, _) = sun_position(julian_day(anchor) + 0.5 - location.longitude / 360.0);
    let latitude = location.latitude;

    let day_half = hour_angle(HORIZON_ALTITUDE, latitude, declination).ok_or_else(|| {
        unavailable("the sun does not rise or set at this latitude".to_string())
    })?;
    if day_half <= 0.0 {
        return Err(unavailable("the sun does not rise at this latitude".to_string()));
    }

    let solar_day = SolarDay::new(coordinates, anchor);
    let sunrise = solar_day.event_time(SolarEvent::Sunrise);
    let sunset = solar_day.event_time(SolarEvent::Sunset);
    let sunrise_hours = hours_since(anchor, sunrise);
    let sunset_hours = hours_since(anchor, sunset);

    let params = location.method.parameters();
    let night = 24.0 - (sunset_hours - sunrise_hours);
    let portion = if latitude.abs() > HIGH_LATITUDE_THRESHOLD {
        night / 7.0
    } else {
        night / 2.0
    };

    let fajr = match hour_angle(-params.fajr_angle, latitude, declination) {
        Some(h) if sunrise_hours - (noon - h) <= portion => noon - h,
        _ => sunrise_hours - portion,
    };

    let asr_angle = asr_altitude(location.madhab.shadow_factor(), latitude, declination);
    let asr = noon
        + hour_angle(asr_angle, latitude, declination)
            .ok_or_else(|| unavailable("the sun stays too low for Asr".to_string()))?;

    let maghrib = match params.maghrib_angle {
        Some(angle) => hour_angle(-angle, latitude, declination)
            .map(|h| noon + h)
            .unwrap_or(sunset_hours),
        None => sunset_hours,
    };

    let isha = match params.isha {
        IshaRule::Interval(minutes) => maghrib + minutes as f64 / 60.0,
        IshaRule::Angle(angle) => match hour_angle(-angle, latitude, declination) {
            Some(h) if (noon + h) - sunset_hours <= portion => noon + h,
            _ => sunset_hours + portion,
        },
    };

    let instants = [fajr, sunrise_hours, noon, asr, maghrib, isha]
        .map(|hours| round_to_minute(to_instant(anchor, hours)));

    Schedule::new(location.time_zone, instants)
}

/// Solar noon in UTC hours for the anchor day.
fn solar_noon(longitude: f64, anchor: NaiveDate) -> f64 {
    let (_, equation_of_time) = sun_position(julian_day(anchor) + 0.5 - longitude / 360.0);
    12.0 - equation_of_time - longitude / 15.0
}

fn to_instant(anchor: NaiveDate, hours: f64) -> DateTime<Utc> {
    let midnight = Utc.from_utc_datetime(&anchor.and_time(chrono::NaiveTime::MIN));
    midnight + Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

fn hours_since(anchor: NaiveDate, instant: DateTime<Utc>) -> f64 {
    let midnight = Utc.from_utc_datetime(&anchor.and_time(chrono::NaiveTime::MIN));
    (instant - midnight).num_milliseconds() as f64 / 3_600_000.0
}

fn round_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = instant.timestamp();
    let rounded = (seconds + 30).div_euclid(60) * 60;
    DateTime::from_timestamp(rounded, 0).unwrap_or(instant)
}

fn fix_degrees(a: f64) -> f64 {
    a.rem_euclid(360.0)
}

fn fix_hours(h: f64) -> f64 {
    h.rem_euclid(24.0)
}

fn sin_deg(d: f64) -> f64 {
    d.to_radians().sin()
}

fn cos_deg(d: f64) -> f64 {
    d.to_radians().cos()
}

fn tan_deg(d: f64) -> f64 {
    d.to_radians().tan()
}

fn asin_deg(x: f64) -> f64 {
    x.asin().to_degrees()
}

fn acos_deg(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn atan2_deg(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}
