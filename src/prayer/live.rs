//! Live view state derived from the schedule pair.
//!
//! [`derive`] is a pure function of its inputs and cheap enough to run every tick.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::{Prayer, Schedule};

/// What the user sees right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedViewState {
    pub current: Option<Prayer>,
    pub next: Option<Prayer>,
    pub next_at: Option<DateTime<Utc>>,
    pub countdown_seconds: Option<i64>,
    /// Fraction of daylight elapsed, from sunrise (0) to sunset (1)
    pub daylight_progress: f64,
}

impl DerivedViewState {
    /// State presented when no schedule is available.
    pub fn unavailable() -> Self {
        Self {
            current: None,
            next: None,
            next_at: None,
            countdown_seconds: None,
            daylight_progress: 0.0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.next.is_some()
    }

    /// `H:MM:SS`, or `M:SS` under an hour. Empty when the countdown is not positive.
    pub fn countdown_text(&self) -> String {
        match self.countdown_seconds {
            Some(seconds) if seconds > 0 => format_countdown(seconds),
            _ => String::new(),
        }
    }

    /// Short label for a status line: the next event and its local time.
    pub fn menu_bar_text(&self, time_zone: Tz) -> String {
        match (self.next, self.next_at) {
            (Some(prayer), Some(at)) => {
                format!("{prayer} {}", at.with_timezone(&time_zone).format("%H:%M"))
            }
            _ => "No Location".to_string(),
        }
    }
}

pub fn format_countdown(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Derive the view state for `now`.
///
/// After Isha the next event is tomorrow's Fajr. The countdown is truncated to
/// whole seconds and is only negative when `now` has moved past tomorrow's Fajr,
/// which callers treat as a request to recompute.
pub fn derive(now: DateTime<Utc>, today: &Schedule, tomorrow: &Schedule) -> DerivedViewState {
    let entries = today.entries();

    let current = entries
        .iter()
        .rev()
        .find(|entry| entry.at <= now)
        .map(|entry| entry.prayer);

    let (next, next_at) = match entries.iter().find(|entry| entry.at > now) {
        Some(entry) => (entry.prayer, entry.at),
        None => (Prayer::Fajr, tomorrow.instant(Prayer::Fajr)),
    };

    DerivedViewState {
        current,
        next: Some(next),
        next_at: Some(next_at),
        countdown_seconds: Some((next_at - now).num_seconds()),
        daylight_progress: daylight_progress(now, today),
    }
}

/// Linear progress between sunrise and sunset, clamped to `[0, 1]`.
pub fn daylight_progress(now: DateTime<Utc>, schedule: &Schedule) -> f64 {
    let sunrise = schedule.sunrise();
    let sunset = schedule.sunset();

    if sunset <= sunrise || now <= sunrise {
        return 0.0;
    }
    if now >= sunset {
        return 1.0;
    }

    let elapsed = (now - sunrise).num_milliseconds() as f64;
    let total = (sunset - sunrise).num_milliseconds() as f64;
    (elapsed / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, d, h, m, s).unwrap()
    }

    fn schedule(d: u32) -> Schedule {
        Schedule::new(
            Tz::UTC,
            [
                at(d, 4, 0, 0),
                at(d, 5, 30, 0),
                at(d, 12, 0, 0),
                at(d, 15, 0, 0),
                at(d, 18, 30, 0),
                at(d, 20, 0, 0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_before_fajr_has_no_current_event() {
        let state = derive(at(1, 3, 0, 0), &schedule(1), &schedule(2));
        assert_eq!(state.current, None);
        assert_eq!(state.next, Some(Prayer::Fajr));
        assert_eq!(state.countdown_seconds, Some(3600));
        assert_eq!(state.daylight_progress, 0.0);
    }

    #[test]
    fn test_between_events() {
        let state = derive(at(1, 13, 0, 0), &schedule(1), &schedule(2));
        assert_eq!(state.current, Some(Prayer::Dhuhr));
        assert_eq!(state.next, Some(Prayer::Asr));
        assert_eq!(state.next_at, Some(at(1, 15, 0, 0)));
    }

    #[test]
    fn test_event_instant_belongs_to_that_event() {
        let state = derive(at(1, 15, 0, 0), &schedule(1), &schedule(2));
        assert_eq!(state.current, Some(Prayer::Asr));
        assert_eq!(state.next, Some(Prayer::Maghrib));
    }

    #[test]
    fn test_after_isha_points_at_tomorrows_fajr() {
        let state = derive(at(1, 22, 0, 0), &schedule(1), &schedule(2));
        assert_eq!(state.current, Some(Prayer::Isha));
        assert_eq!(state.next, Some(Prayer::Fajr));
        assert_eq!(state.next_at, Some(at(2, 4, 0, 0)));
        assert_eq!(state.countdown_seconds, Some(6 * 3600));
        assert_eq!(state.daylight_progress, 1.0);
    }

    #[test]
    fn test_countdown_truncates_to_whole_seconds() {
        let now = at(1, 14, 59, 58) + Duration::milliseconds(700);
        let state = derive(now, &schedule(1), &schedule(2));
        assert_eq!(state.countdown_seconds, Some(1));
    }

    #[test]
    fn test_daylight_progress_midpoint() {
        let today = schedule(1);
        assert_eq!(daylight_progress(at(1, 5, 30, 0), &today), 0.0);
        assert_eq!(daylight_progress(at(1, 12, 0, 0), &today), 0.5);
        assert_eq!(daylight_progress(at(1, 18, 30, 0), &today), 1.0);
    }

    #[test]
    fn test_countdown_text() {
        assert_eq!(format_countdown(3 * 3600 + 5 * 60 + 9), "3:05:09");
        assert_eq!(format_countdown(59 * 60 + 1), "59:01");
        assert_eq!(format_countdown(7), "0:07");

        let mut state = DerivedViewState::unavailable();
        assert_eq!(state.countdown_text(), "");
        state.countdown_seconds = Some(0);
        assert_eq!(state.countdown_text(), "");
    }

    #[test]
    fn test_menu_bar_text() {
        let state = derive(at(1, 13, 0, 0), &schedule(1), &schedule(2));
        assert_eq!(state.menu_bar_text(Tz::UTC), "Asr 15:00");
        assert_eq!(
            state.menu_bar_text(chrono_tz::Europe::Berlin),
            "Asr 17:00"
        );
        assert_eq!(
            DerivedViewState::unavailable().menu_bar_text(Tz::UTC),
            "No Location"
        );
    }
}
