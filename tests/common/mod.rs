#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

use salatr::config::Config;
use salatr::core::{Core, CoreParams};
use salatr::io::signals::SignalState;
use salatr::prayer::cache::AstronomicalTimeProvider;
use salatr::prayer::overlay::OverlayPresenter;
use salatr::prayer::reminders::{NotificationSink, ReminderRequest, SinkError};
use salatr::prayer::{LocationConfig, Prayer, Schedule, ScheduleError};

/// Same schedule every day: Fajr 04:00, Sunrise 05:30, Dhuhr 12:00, Asr 15:00,
/// Maghrib 18:30, Isha 20:00 UTC.
pub struct FixedProvider;

impl AstronomicalTimeProvider for FixedProvider {
    fn compute(
        &self,
        location: &LocationConfig,
        date: NaiveDate,
    ) -> Result<Schedule, ScheduleError> {
        let at = |h: u32, m: u32| Utc.from_utc_datetime(&date.and_hms_opt(h, m, 0).unwrap());
        Schedule::new(
            location.time_zone,
            [at(4, 0), at(5, 30), at(12, 0), at(15, 0), at(18, 30), at(20, 0)],
        )
    }
}

#[derive(Debug, Default)]
pub struct SinkLog {
    pub scheduled: Vec<ReminderRequest>,
    pub cancel_calls: usize,
}

/// Sink that records every call.
pub struct RecordingSink(pub Arc<Mutex<SinkLog>>);

impl NotificationSink for RecordingSink {
    fn schedule(&mut self, request: &ReminderRequest) -> Result<(), SinkError> {
        self.0.lock().unwrap().scheduled.push(request.clone());
        Ok(())
    }

    fn cancel_all(&mut self) {
        self.0.lock().unwrap().cancel_calls += 1;
    }
}

#[derive(Debug, Default)]
pub struct PresenterLog {
    pub shown: Vec<(Prayer, DateTime<Utc>)>,
    pub zones: Vec<Tz>,
    pub hidden: usize,
}

/// Presenter that records every call and drops the dismiss callback.
pub struct RecordingPresenter(pub Arc<Mutex<PresenterLog>>);

impl OverlayPresenter for RecordingPresenter {
    fn show(
        &mut self,
        prayer: Prayer,
        at: DateTime<Utc>,
        time_zone: Tz,
        _on_dismiss: Box<dyn FnOnce() + Send>,
    ) {
        let mut log = self.0.lock().unwrap();
        log.shown.push((prayer, at));
        log.zones.push(time_zone);
    }

    fn hide(&mut self) {
        self.0.lock().unwrap().hidden += 1;
    }
}

pub struct Harness {
    pub core: Core,
    pub sink: Arc<Mutex<SinkLog>>,
    pub presenter: Arc<Mutex<PresenterLog>>,
}

pub fn harness(config: Config) -> Harness {
    harness_with_provider(config, Box::new(FixedProvider))
}

pub fn harness_with_provider(
    config: Config,
    provider: Box<dyn AstronomicalTimeProvider>,
) -> Harness {
    let sink = Arc::new(Mutex::new(SinkLog::default()));
    let presenter = Arc::new(Mutex::new(PresenterLog::default()));

    let core = Core::new(CoreParams {
        provider,
        sink: Box::new(RecordingSink(Arc::clone(&sink))),
        presenter: Box::new(RecordingPresenter(Arc::clone(&presenter))),
        config,
        signal_state: SignalState::new(),
        store: None,
        debug_enabled: false,
    });

    Harness {
        core,
        sink,
        presenter,
    }
}

/// Location on the prime meridian with UTC as its zone.
pub fn greenwich_config(reminder_minutes: u32) -> Config {
    Config {
        latitude: Some(51.4769),
        longitude: Some(0.0),
        timezone: Some("UTC".to_string()),
        reminder_minutes: Some(reminder_minutes),
        ..Config::default()
    }
}

pub fn utc(day: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, h, m, s).unwrap()
}
