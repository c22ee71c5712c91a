//! Today/tomorrow schedule cache.
//!
//! The cache recomputes when nothing is cached, when `now` has left the cached
//! day (midnight, or a sleep gap across midnight), or after [`ScheduleCache::invalidate`].
//! Recomputation builds both schedules first and swaps the pair in as one value, so a
//! reader never observes a half-updated cache. A failed date is remembered and not
//! retried until the day changes or the cache is invalidated.

use chrono::{DateTime, Days, NaiveDate, Utc};

use super::{LocationConfig, Schedule, ScheduleError};

/// Source of raw schedules for a location and local calendar date.
pub trait AstronomicalTimeProvider: Send {
    fn compute(&self, location: &LocationConfig, date: NaiveDate)
    -> Result<Schedule, ScheduleError>;
}

/// Schedules for the current local day and the one after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePair {
    pub today: Schedule,
    pub tomorrow: Schedule,
}

pub struct ScheduleCache {
    provider: Box<dyn AstronomicalTimeProvider>,
    location: Option<LocationConfig>,
    cached: Option<(NaiveDate, SchedulePair)>,
    failed: Option<(NaiveDate, ScheduleError)>,
    generation: u64,
}

impl ScheduleCache {
    pub fn new(provider: Box<dyn AstronomicalTimeProvider>) -> Self {
        Self {
            provider,
            location: None,
            cached: None,
            failed: None,
            generation: 0,
        }
    }

    pub fn location(&self) -> Option<&LocationConfig> {
        self.location.as_ref()
    }

    /// Install a location configuration. Returns true (and invalidates) when it changed.
    pub fn configure(&mut self, location: Option<LocationConfig>) -> bool {
        if self.location == location {
            return false;
        }
        self.location = location;
        self.invalidate();
        true
    }

    /// Drop the cached pair and any remembered failure.
    pub fn invalidate(&mut self) {
        self.cached = None;
        self.failed = None;
    }

    /// Incremented every time a new pair is installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The cached pair without triggering recomputation.
    pub fn peek(&self) -> Option<&SchedulePair> {
        self.cached.as_ref().map(|(_, pair)| pair)
    }

    fn local_date(location: &LocationConfig, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&location.time_zone).date_naive()
    }

    /// Whether the next [`current_schedules`](Self::current_schedules) call would
    /// recompute.
    pub fn needs_recompute(&self, now: DateTime<Utc>) -> bool {
        let Some(location) = &self.location else {
            return false;
        };
        match &self.cached {
            Some((date, _)) => *date != Self::local_date(location, now),
            None => true,
        }
    }

    /// Today's and tomorrow's schedules for `now`, recomputing when required.
    pub fn current_schedules(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<&SchedulePair, ScheduleError> {
        let location = self.location.ok_or(ScheduleError::NoLocation)?;
        let date = Self::local_date(&location, now);

        let cached_for_today = matches!(&self.cached, Some((cached, _)) if *cached == date);
        if !cached_for_today {
            if let Some((failed_date, err)) = &self.failed
                && *failed_date == date
            {
                return Err(err.clone());
            }

            // Stale pair must not outlive its day even if recomputation fails
            self.cached = None;

            match self.compute_pair(&location, date) {
                Ok(pair) => {
                    self.cached = Some((date, pair));
                    self.failed = None;
                    self.generation += 1;
                    log_block_start!("Prayer times computed for {date}");
                }
                Err(err) => {
                    log_pipe!();
                    log_warning!("{err}");
                    self.failed = Some((date, err.clone()));
                    return Err(err);
                }
            }
        }

        self.cached
            .as_ref()
            .map(|(_, pair)| pair)
            .ok_or(ScheduleError::NoLocation)
    }

    fn compute_pair(
        &self,
        location: &LocationConfig,
        date: NaiveDate,
    ) -> Result<SchedulePair, ScheduleError> {
        let next_date = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ScheduleError::Unavailable {
                date,
                reason: "date out of range".to_string(),
            })?;

        let today = self.provider.compute(location, date)?;
        let tomorrow = self.provider.compute(location, next_date)?;
        Ok(SchedulePair { today, tomorrow })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::{CalculationMethod, Madhab};
    use chrono::{Duration, NaiveTime, TimeZone};
    use chrono_tz::Tz;
    use std::sync::{Arc, Mutex};

    /// Fixed-offset schedule generator that records every requested date.
    struct FakeProvider {
        calls: Arc<Mutex<Vec<NaiveDate>>>,
        fail_on: Option<NaiveDate>,
    }

    impl AstronomicalTimeProvider for FakeProvider {
        fn compute(
            &self,
            location: &LocationConfig,
            date: NaiveDate,
        ) -> Result<Schedule, ScheduleError> {
            self.calls.lock().unwrap().push(date);
            if self.fail_on == Some(date) {
                return Err(ScheduleError::Unavailable {
                    date,
                    reason: "sun never sets".to_string(),
                });
            }
            let midnight = location
                .time_zone
                .from_local_datetime(&date.and_time(NaiveTime::MIN))
                .unwrap()
                .with_timezone(&Utc);
            let hours = [5, 6, 12, 15, 18, 20];
            Schedule::new(
                location.time_zone,
                hours.map(|h| midnight + Duration::hours(h)),
            )
        }
    }

    fn location() -> LocationConfig {
        LocationConfig {
            latitude: 51.5,
            longitude: 0.0,
            time_zone: Tz::UTC,
            method: CalculationMethod::MuslimWorldLeague,
            madhab: Madhab::Shafi,
        }
    }

    fn cache_with(fail_on: Option<NaiveDate>) -> (ScheduleCache, Arc<Mutex<Vec<NaiveDate>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let provider = FakeProvider {
            calls: Arc::clone(&calls),
            fail_on,
        };
        let mut cache = ScheduleCache::new(Box::new(provider));
        cache.configure(Some(location()));
        (cache, calls)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    #[test]
    fn test_no_location_is_unavailable() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut cache = ScheduleCache::new(Box::new(FakeProvider {
            calls: Arc::clone(&calls),
            fail_on: None,
        }));
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap();
        assert_eq!(
            cache.current_schedules(now).unwrap_err(),
            ScheduleError::NoLocation
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_computes_today_and_tomorrow_once_per_day() {
        let (mut cache, calls) = cache_with(None);
        let morning = Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap();

        let pair = cache.current_schedules(morning).unwrap();
        assert_eq!(pair.today.calendar_date(), day(1));
        assert_eq!(pair.tomorrow.calendar_date(), day(2));

        cache.current_schedules(morning + Duration::hours(10)).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![day(1), day(2)]);
        assert_eq!(cache.generation(), 1);
    }

    #[test]
    fn test_rollover_after_long_gap_recomputes() {
        let (mut cache, calls) = cache_with(None);
        let evening = Utc.with_ymd_and_hms(2025, 4, 1, 21, 0, 0).unwrap();
        cache.current_schedules(evening).unwrap();

        let after_sleep = evening + Duration::hours(9);
        assert!(cache.needs_recompute(after_sleep));
        let pair = cache.current_schedules(after_sleep).unwrap();
        assert_eq!(pair.today.calendar_date(), day(2));
        assert_eq!(calls.lock().unwrap().len(), 4);
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn test_failure_is_remembered_until_invalidated() {
        let (mut cache, calls) = cache_with(Some(day(2)));
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();

        assert!(matches!(
            cache.current_schedules(now),
            Err(ScheduleError::Unavailable { .. })
        ));
        assert!(cache.peek().is_none());
        let attempts = calls.lock().unwrap().len();

        assert!(cache.current_schedules(now).is_err());
        assert_eq!(calls.lock().unwrap().len(), attempts);

        cache.invalidate();
        assert!(cache.current_schedules(now).is_err());
        assert_eq!(calls.lock().unwrap().len(), attempts * 2);
    }

    #[test]
    fn test_configure_only_invalidates_on_change() {
        let (mut cache, calls) = cache_with(None);
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        cache.current_schedules(now).unwrap();

        assert!(!cache.configure(Some(location())));
        assert!(cache.peek().is_some());

        let mut moved = location();
        moved.madhab = Madhab::Hanafi;
        assert!(cache.configure(Some(moved)));
        assert!(cache.peek().is_none());

        cache.current_schedules(now).unwrap();
        assert_eq!(calls.lock().unwrap().len(), 4);
    }
}
