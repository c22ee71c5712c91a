//! The prayer-time controller.
//!
//! [`Core`] owns every piece of live state: the schedule cache, the reminder
//! scheduler, the overlay trigger and the clock monitor. It is driven by two inputs
//! only:
//!
//! - [`Core::tick`], called once per second with the current wall-clock time
//! - [`Core::handle`], called with each [`ControlEvent`] from the control channel
//!
//! Every tick runs the same pipeline: detect clock discontinuities, obtain today's
//! and tomorrow's schedules (recomputing on day rollover or invalidation), reconcile
//! reminders when the schedule or reminder settings changed, derive the view state
//! and re-evaluate the overlay. Nothing here is fatal; a missing or unresolvable
//! schedule degrades to the "no location" view until the next valid recomputation.

pub mod cancel;
pub mod clock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use crate::config::{Config, SettingsStore};
use crate::constants::TICK_INTERVAL_MS;
use crate::core::cancel::DelayedAction;
use crate::core::clock::ClockMonitor;
use crate::io::signals::{ControlEvent, SignalState};
use crate::prayer::cache::{AstronomicalTimeProvider, ScheduleCache, SchedulePair};
use crate::prayer::live::{self, DerivedViewState};
use crate::prayer::overlay::{OccurrenceKey, OverlayCommand, OverlayPresenter, OverlayTrigger};
use crate::prayer::reminders::{NotificationSink, ReminderScheduler, ReminderSettings};
use crate::prayer::{LocationConfig, Schedule, ScheduleError};
use crate::time::source;

/// Parameters for creating a Core instance.
pub struct CoreParams {
    pub provider: Box<dyn AstronomicalTimeProvider>,
    pub sink: Box<dyn NotificationSink>,
    pub presenter: Box<dyn OverlayPresenter>,
    pub config: Config,
    pub signal_state: SignalState,
    /// Source for `Reload` events; without one they are ignored
    pub store: Option<Box<dyn SettingsStore>>,
    pub debug_enabled: bool,
}

pub struct Core {
    cache: ScheduleCache,
    reminders: ReminderScheduler,
    overlay: OverlayTrigger,
    clock: ClockMonitor,
    sink: Box<dyn NotificationSink>,
    presenter: Box<dyn OverlayPresenter>,
    config: Config,
    signal_state: SignalState,
    store: Option<Box<dyn SettingsStore>>,
    debug_enabled: bool,
    /// Cache generation and settings of the last reminder reconciliation
    reconciled: Option<(u64, ReminderSettings)>,
    auto_hide: Option<DelayedAction>,
    view: DerivedViewState,
    schedule_failure: Option<ScheduleError>,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        let mut cache = ScheduleCache::new(params.provider);
        cache.configure(resolve_location(&params.config));

        Self {
            cache,
            reminders: ReminderScheduler::new(),
            overlay: OverlayTrigger::new(),
            clock: ClockMonitor::default(),
            sink: params.sink,
            presenter: params.presenter,
            config: params.config,
            signal_state: params.signal_state,
            store: params.store,
            debug_enabled: params.debug_enabled,
            reconciled: None,
            auto_hide: None,
            view: DerivedViewState::unavailable(),
            schedule_failure: None,
        }
    }

    /// Latest derived view state.
    pub fn view(&self) -> &DerivedViewState {
        &self.view
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn location(&self) -> Option<&LocationConfig> {
        self.cache.location()
    }

    /// Cached schedules, as of the last tick.
    pub fn schedules(&self) -> Option<&SchedulePair> {
        self.cache.peek()
    }

    pub fn overlay(&self) -> &OverlayTrigger {
        &self.overlay
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    /// Advance to `now`: one pass of the per-second pipeline.
    pub fn tick(&mut self, now: DateTime<Utc>) -> &DerivedViewState {
        // Simulated time advances by whole multiples of the tick, never by surprise
        if !source::is_simulated()
            && let Some(jump) = self.clock.observe(now)
        {
            log_pipe!();
            log_info!("Clock discontinuity: {jump}, recomputing");
            self.cache.invalidate();
        }

        self.refresh(now);
        &self.view
    }

    /// Dispatch one control event. Returns false when the controller should stop.
    pub fn handle(&mut self, event: ControlEvent, now: DateTime<Utc>) -> bool {
        match event {
            ControlEvent::Reload => self.reload_from_store(now),
            ControlEvent::ConfigChanged(config) => self.apply_config(*config, now),
            ControlEvent::Sleeping => {
                log_pipe!();
                log_info!("System entering sleep");
            }
            ControlEvent::Resumed | ControlEvent::TimeChanged => {
                log_pipe!();
                if matches!(event, ControlEvent::Resumed) {
                    log_info!("System resumed, recomputing");
                } else {
                    log_info!("System clock changed, recomputing");
                }
                self.cache.invalidate();
                self.clock.reset(now);
                self.refresh(now);
            }
            ControlEvent::OverlayDismissed(key) => {
                if self.overlay.dismiss(key) {
                    if self.debug_enabled {
                        log_pipe!();
                        log_debug!("Overlay dismissed for {}", key.prayer);
                    }
                    self.hide_overlay();
                }
            }
            // The tick pipeline decides whether the timer was still right
            ControlEvent::AutoHideElapsed(_) => self.refresh(now),
            ControlEvent::Shutdown => return false,
        }
        true
    }

    /// Recompute as needed and apply reminders and overlay for `now`.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        let pair = match self.cache.current_schedules(now) {
            Ok(pair) => pair.clone(),
            Err(err) => {
                self.present_unavailable(err, now);
                return;
            }
        };
        self.schedule_failure = None;

        self.reminders.note_elapsed(now);

        let settings = self.config.reminder_settings();
        let reconcile_key = (self.cache.generation(), settings);
        if self.reconciled != Some(reconcile_key) {
            self.reconcile_reminders(&pair.today, settings, now);
            self.reconciled = Some(reconcile_key);
        }

        let mut view = live::derive(now, &pair.today, &pair.tomorrow);
        if view.countdown_seconds.is_some_and(|seconds| seconds < 0) {
            self.cache.invalidate();
            if let Ok(fresh) = self.cache.current_schedules(now) {
                view = live::derive(now, &fresh.today, &fresh.tomorrow);
            }
            if let Some(seconds) = view.countdown_seconds.as_mut() {
                *seconds = (*seconds).max(0);
            }
        }

        let next = view
            .next
            .zip(view.next_at)
            .map(|(prayer, at)| OccurrenceKey { prayer, at });
        self.view = view;
        self.apply_overlay(now, next);
    }

    fn present_unavailable(&mut self, err: ScheduleError, now: DateTime<Utc>) {
        if self.schedule_failure.as_ref() != Some(&err) {
            if err == ScheduleError::NoLocation {
                log_pipe!();
                log_warning!("No location configured");
                log_indented!("Set one with: salatr set latitude=<lat> longitude=<lon>");
            }
            self.schedule_failure = Some(err);
        }

        self.view = DerivedViewState::unavailable();
        if !self.reminders.installed().is_empty() {
            self.reminders.clear(self.sink.as_mut());
            log_decorated!("Pending reminders cancelled");
        }
        self.reconciled = None;
        self.apply_overlay(now, None);
    }

    fn reconcile_reminders(
        &mut self,
        today: &Schedule,
        settings: ReminderSettings,
        now: DateTime<Utc>,
    ) {
        let report = self
            .reminders
            .reconcile(today, settings, now, self.sink.as_mut());

        if report.changed {
            if report.installed.is_empty() {
                log_decorated!("No reminders pending for today");
            } else {
                log_block_start!("Reminders scheduled:");
                for request in &report.installed {
                    log_indented!(
                        "{} at {}",
                        request.prayer,
                        today.local_time_label(request.fire_at)
                    );
                }
            }
        }

        for (request_id, err) in &report.failures {
            log_pipe!();
            log_warning!("Reminder {request_id} failed: {err}");
        }
    }

    fn apply_overlay(&mut self, now: DateTime<Utc>, next: Option<OccurrenceKey>) {
        match self
            .overlay
            .evaluate(now, next, self.config.overlay_settings())
        {
            OverlayCommand::Show(key) => self.show_overlay(key),
            OverlayCommand::Hide => self.hide_overlay(),
            OverlayCommand::Keep => {}
        }
    }

    fn show_overlay(&mut self, key: OccurrenceKey) {
        self.cancel_auto_hide();

        let time_zone = self
            .cache
            .location()
            .map_or(Tz::UTC, |location| location.time_zone);
        let sender = self.signal_state.sender.clone();
        self.presenter.show(
            key.prayer,
            key.at,
            time_zone,
            Box::new(move || {
                let _ = sender.send(ControlEvent::OverlayDismissed(key));
            }),
        );
        self.overlay.mark_shown(key);

        let sender = self.signal_state.sender.clone();
        self.auto_hide = Some(DelayedAction::spawn(key.at, move || {
            let _ = sender.send(ControlEvent::AutoHideElapsed(key));
        }));
    }

    fn hide_overlay(&mut self) {
        self.cancel_auto_hide();
        self.presenter.hide();
    }

    fn cancel_auto_hide(&mut self) {
        if let Some(action) = self.auto_hide.take() {
            action.cancel();
        }
    }

    /// Install new settings. A changed location invalidates the cache; reminder and
    /// overlay settings are picked up by the following refresh.
    pub fn apply_config(&mut self, config: Config, now: DateTime<Utc>) {
        let location = match config.location_config() {
            Ok(location) => location,
            Err(e) => {
                log_pipe!();
                log_warning!("Ignoring configuration: {e:#}");
                return;
            }
        };

        if config == self.config {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Configuration unchanged");
            }
            return;
        }

        self.config = config;
        self.config.log_config();

        if self.cache.configure(location) {
            log_decorated!("Location settings changed, recomputing");
        }
        self.refresh(now);
    }

    fn reload_from_store(&mut self, now: DateTime<Utc>) {
        let Some(store) = &self.store else {
            return;
        };

        match store.load() {
            Ok(config) => self.apply_config(config, now),
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to reload configuration: {e:#}");
            }
        }
    }

    /// Run the tick loop until shutdown or the end of a simulation.
    pub fn run(&mut self) -> Result<()> {
        self.tick(source::now());
        let mut announced = self.log_next_event();

        let tick_interval = Duration::from_millis(TICK_INTERVAL_MS);

        while self.signal_state.running.load(Ordering::SeqCst) && !source::simulation_ended() {
            // In simulation mode source::sleep scales the interval, so sleep in a
            // separate thread and keep draining the channel meanwhile
            let recv_result = if source::is_simulated() {
                let sleep_handle = std::thread::spawn(move || source::sleep(tick_interval));

                loop {
                    match self
                        .signal_state
                        .receiver
                        .recv_timeout(Duration::from_millis(10))
                    {
                        Ok(event) => break Ok(event),
                        Err(RecvTimeoutError::Timeout) => {
                            if sleep_handle.is_finished() {
                                break Err(RecvTimeoutError::Timeout);
                            }
                        }
                        Err(e) => break Err(e),
                    }
                }
            } else {
                self.signal_state.receiver.recv_timeout(tick_interval)
            };

            let now = source::now();
            match recv_result {
                Ok(event) => {
                    if !self.handle(event, now) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.tick(now);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log_pipe!();
                    log_error!("Control channel disconnected unexpectedly");
                    break;
                }
            }

            if self.view.next_at != announced {
                announced = self.log_next_event();
            }
        }

        self.shutdown();
        Ok(())
    }

    fn log_next_event(&self) -> Option<DateTime<Utc>> {
        if let (Some(location), Some(next), Some(at)) =
            (self.cache.location(), self.view.next, self.view.next_at)
        {
            let local = at.with_timezone(&location.time_zone);
            log_block_start!(
                "Next: {next} at {} (in {})",
                local.format("%H:%M"),
                self.view.countdown_text()
            );
        }
        self.view.next_at
    }

    /// Hide the overlay and cancel every pending reminder.
    pub fn shutdown(&mut self) {
        self.hide_overlay();
        self.reminders.clear(self.sink.as_mut());
        log_block_start!("Shutting down");
    }
}

fn resolve_location(config: &Config) -> Option<LocationConfig> {
    match config.location_config() {
        Ok(location) => location,
        Err(e) => {
            log_pipe!();
            log_warning!("Location unavailable: {e:#}");
            None
        }
    }
}
