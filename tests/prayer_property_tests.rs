use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use salatr::geo::{SolarTimeProvider, recommended_method};
use salatr::prayer::cache::AstronomicalTimeProvider;
use salatr::prayer::live::{daylight_progress, derive};
use salatr::prayer::overlay::{OccurrenceKey, OverlayCommand, OverlaySettings, OverlayTrigger};
use salatr::prayer::reminders::{ReminderScheduler, ReminderSettings};
use salatr::prayer::{LocationConfig, Madhab, Prayer, Schedule};

const CITIES: [(f64, f64, &str); 8] = [
    (21.4225, 39.8262, "Asia/Riyadh"),
    (41.0082, 28.9784, "Europe/Istanbul"),
    (40.7128, -74.0060, "America/New_York"),
    (-6.2088, 106.8456, "Asia/Jakarta"),
    (30.0444, 31.2357, "Africa/Cairo"),
    (-33.8688, 151.2093, "Australia/Sydney"),
    (24.8607, 67.0011, "Asia/Karachi"),
    (33.5731, -7.5898, "Africa/Casablanca"),
];

/// Generate a known city and a date within a few years
fn city_day_strategy() -> impl Strategy<Value = (LocationConfig, NaiveDate)> {
    (0..CITIES.len(), 0u64..1095, any::<bool>()).prop_map(|(index, offset, hanafi)| {
        let (latitude, longitude, zone) = CITIES[index];
        let time_zone: Tz = zone.parse().unwrap();
        let location = LocationConfig {
            latitude,
            longitude,
            time_zone,
            method: recommended_method(time_zone),
            madhab: if hanafi { Madhab::Hanafi } else { Madhab::Shafi },
        };
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(chrono::Days::new(offset))
            .unwrap();
        (location, date)
    })
}

fn schedules(location: &LocationConfig, date: NaiveDate) -> (Schedule, Schedule) {
    let today = SolarTimeProvider.compute(location, date).unwrap();
    let tomorrow = SolarTimeProvider
        .compute(location, date.succ_opt().unwrap())
        .unwrap();
    (today, tomorrow)
}

/// A point between two instants, as a fraction of the gap
fn between(start: DateTime<Utc>, end: DateTime<Utc>, fraction: f64) -> DateTime<Utc> {
    let span = (end - start).num_seconds() as f64;
    start + Duration::seconds((span * fraction) as i64)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    /// Schedules hold six strictly increasing events on the requested day
    #[test]
    fn test_schedule_is_ordered((location, date) in city_day_strategy()) {
        let (today, tomorrow) = schedules(&location, date);

        prop_assert!(today.entries().windows(2).all(|w| w[0].at < w[1].at));
        prop_assert_eq!(today.calendar_date(), date);
        prop_assert!(today.instant(Prayer::Isha) < tomorrow.instant(Prayer::Fajr));
    }

    /// Daylight progress never decreases over the day
    #[test]
    fn test_daylight_progress_is_monotone(
        (location, date) in city_day_strategy(),
        a in 0.0f64..1.0,
        b in 0.0f64..1.0,
    ) {
        let (today, tomorrow) = schedules(&location, date);
        let start = today.instant(Prayer::Fajr);
        let end = tomorrow.instant(Prayer::Fajr);
        let (early, late) = if a <= b { (a, b) } else { (b, a) };

        let p1 = daylight_progress(between(start, end, early), &today);
        let p2 = daylight_progress(between(start, end, late), &today);
        prop_assert!((0.0..=1.0).contains(&p1));
        prop_assert!(p1 <= p2);
    }

    /// Between Fajr and Sunrise, Fajr is current and Sunrise is next
    #[test]
    fn test_fajr_to_sunrise_window(
        (location, date) in city_day_strategy(),
        fraction in 0.0f64..1.0,
    ) {
        let (today, tomorrow) = schedules(&location, date);
        let fajr = today.instant(Prayer::Fajr);
        let sunrise = today.instant(Prayer::Sunrise);
        let now = between(fajr, sunrise, fraction);
        prop_assume!(now < sunrise);

        let view = derive(now, &today, &tomorrow);
        prop_assert_eq!(view.current, Some(Prayer::Fajr));
        prop_assert_eq!(view.next, Some(Prayer::Sunrise));
        prop_assert_eq!(view.daylight_progress, 0.0);
    }

    /// After Isha the next event is tomorrow's Fajr
    #[test]
    fn test_after_isha_next_is_tomorrows_fajr(
        (location, date) in city_day_strategy(),
        fraction in 0.0f64..1.0,
    ) {
        let (today, tomorrow) = schedules(&location, date);
        let isha = today.instant(Prayer::Isha);
        let next_fajr = tomorrow.instant(Prayer::Fajr);
        let now = between(isha, next_fajr, fraction);
        prop_assume!(now < next_fajr);

        let view = derive(now, &today, &tomorrow);
        prop_assert_eq!(view.current, Some(Prayer::Isha));
        prop_assert_eq!(view.next, Some(Prayer::Fajr));
        prop_assert_eq!(view.next_at, Some(next_fajr));
        prop_assert!(view.countdown_seconds.is_some_and(|s| s >= 0));
    }

    /// Planned reminders never lie in the past and never include Sunrise
    #[test]
    fn test_reminders_are_in_the_future(
        (location, date) in city_day_strategy(),
        minutes in 0i64..=120,
        fraction in 0.0f64..1.0,
    ) {
        let (today, tomorrow) = schedules(&location, date);
        let now = between(
            today.instant(Prayer::Fajr) - Duration::hours(2),
            tomorrow.instant(Prayer::Fajr),
            fraction,
        );
        let settings = ReminderSettings {
            enabled: true,
            lead_time: Duration::minutes(minutes),
        };

        let plan = ReminderScheduler::plan(&today, settings, now);
        prop_assert!(plan.iter().all(|r| r.fire_at > now));
        prop_assert!(plan.iter().all(|r| r.prayer != Prayer::Sunrise));
        if minutes == 0 {
            prop_assert!(plan.is_empty());
        }
    }

    /// Once suppressed, an occurrence is never shown again, whatever the clock does
    #[test]
    fn test_overlay_not_reshown_after_suppression(
        offsets in prop::collection::vec(-1800i64..600, 1..40),
        always_show in any::<bool>(),
    ) {
        let at = DateTime::parse_from_rfc3339("2025-06-02T15:00:00Z").unwrap().with_timezone(&Utc);
        let key = OccurrenceKey { prayer: Prayer::Asr, at };
        let settings = OverlaySettings {
            enabled: true,
            always_show,
            lead_time: Duration::minutes(15),
        };

        let mut trigger = OverlayTrigger::new();
        let mut suppressed = false;
        for offset in offsets {
            let now = at + Duration::seconds(offset);
            let command = trigger.evaluate(now, Some(key), settings);
            if let OverlayCommand::Show(shown) = command {
                prop_assert!(!suppressed, "shown again at offset {}", offset);
                trigger.mark_shown(shown);
            }
            if now >= at {
                suppressed = true;
            }
        }
    }
}
