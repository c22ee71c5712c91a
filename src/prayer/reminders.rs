//! Reminder reconciliation.
//!
//! [`ReminderScheduler::reconcile`] computes the desired reminder set for today's
//! schedule and replaces whatever was installed at the sink. Request ids are stable
//! per prayer and day, and a reconciliation whose desired set matches the still
//! pending installed set touches nothing.
//!
//! Requests whose fire time passed while installed count as delivered. Their ids are
//! remembered so a backward clock jump or a lead-time change cannot deliver the same
//! reminder twice.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

use super::{Prayer, Schedule};
use crate::constants::REMINDER_HISTORY_LIMIT;

/// One pending reminder for one prayer on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderRequest {
    pub prayer: Prayer,
    pub fire_at: DateTime<Utc>,
    pub request_id: String,
    pub title: String,
    pub body: String,
}

/// Failure reported by a notification sink for a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivery side of reminders.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send {
    fn schedule(&mut self, request: &ReminderRequest) -> Result<(), SinkError>;
    fn cancel_all(&mut self);
}

/// Outcome of one reconciliation.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Requests that make up the installed set after this call
    pub installed: Vec<ReminderRequest>,
    pub failures: Vec<(String, SinkError)>,
    /// False when the sink was left untouched
    pub changed: bool,
}

/// Reminder lead-time and enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub lead_time: Duration,
}

impl ReminderSettings {
    pub fn is_active(&self) -> bool {
        self.enabled && self.lead_time > Duration::zero()
    }
}

#[derive(Debug, Default)]
pub struct ReminderScheduler {
    /// None until the first reconciliation of this process
    installed: Option<Vec<ReminderRequest>>,
    delivered: VecDeque<String>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed(&self) -> &[ReminderRequest] {
        self.installed.as_deref().unwrap_or(&[])
    }

    /// The reminder set that should exist for `today` at `now`.
    pub fn plan(
        today: &Schedule,
        settings: ReminderSettings,
        now: DateTime<Utc>,
    ) -> Vec<ReminderRequest> {
        if !settings.is_active() {
            return Vec::new();
        }

        let minutes = settings.lead_time.num_minutes();
        today
            .entries()
            .iter()
            .filter(|entry| entry.prayer.is_reminder_eligible())
            .filter_map(|entry| {
                let fire_at = entry.at - settings.lead_time;
                (fire_at > now).then(|| ReminderRequest {
                    prayer: entry.prayer,
                    fire_at,
                    request_id: request_id(entry.prayer, today),
                    title: format!("{} in {minutes} minutes", entry.prayer),
                    body: format!("Prayer time: {}", today.local_time_label(entry.at)),
                })
            })
            .collect()
    }

    /// Replace the installed reminders with the plan for `today`.
    ///
    /// The previous set is cancelled before the new one is installed. A failing
    /// request is reported and does not stop the rest of the batch; it stays part of
    /// the installed set so it is only retried by the next reconciliation with
    /// different inputs.
    pub fn reconcile(
        &mut self,
        today: &Schedule,
        settings: ReminderSettings,
        now: DateTime<Utc>,
        sink: &mut dyn NotificationSink,
    ) -> ReconcileReport {
        self.note_elapsed(now);

        let desired: Vec<ReminderRequest> = Self::plan(today, settings, now)
            .into_iter()
            .filter(|request| !self.delivered.contains(&request.request_id))
            .collect();

        if self.installed.as_ref() == Some(&desired) {
            return ReconcileReport {
                installed: desired,
                failures: Vec::new(),
                changed: false,
            };
        }

        sink.cancel_all();

        let failures = desired
            .iter()
            .filter_map(|request| {
                sink.schedule(request)
                    .err()
                    .map(|err| (request.request_id.clone(), err))
            })
            .collect();

        self.installed = Some(desired.clone());

        ReconcileReport {
            installed: desired,
            failures,
            changed: true,
        }
    }

    /// Move installed requests whose fire time has passed into the delivered history.
    ///
    /// Must see every tick: a request that fired and was then put back into the
    /// future by a clock rollback is only recognized if it was recorded here first.
    pub fn note_elapsed(&mut self, now: DateTime<Utc>) {
        let Some(installed) = self.installed.as_mut() else {
            return;
        };

        let mut elapsed = Vec::new();
        installed.retain(|request| {
            if request.fire_at <= now {
                elapsed.push(request.request_id.clone());
                false
            } else {
                true
            }
        });

        for request_id in elapsed {
            self.note_delivered(request_id);
        }
    }

    fn note_delivered(&mut self, request_id: String) {
        if self.delivered.contains(&request_id) {
            return;
        }
        if self.delivered.len() == REMINDER_HISTORY_LIMIT {
            self.delivered.pop_front();
        }
        self.delivered.push_back(request_id);
    }

    /// Cancel everything and forget the installed set.
    pub fn clear(&mut self, sink: &mut dyn NotificationSink) {
        sink.cancel_all();
        self.installed = Some(Vec::new());
    }
}

/// Deterministic id for a prayer's reminder on a schedule's day.
pub fn request_id(prayer: Prayer, schedule: &Schedule) -> String {
    format!(
        "prayer-{}-{}",
        prayer.display_name().to_lowercase(),
        schedule.calendar_date().format("%Y-%m-%d")
    )
}
