//! Reminder delivery.
//!
//! Each scheduled request becomes a [`DelayedAction`] that fires at the request's
//! instant against the global time source. Delivery goes either to the desktop
//! notification daemon over the session bus or to the terminal log.

use anyhow::{Context, Result};
use std::collections::HashMap;
use zbus::blocking::Connection;
use zbus::zvariant::Value;

use crate::constants::{NOTIFICATION_APP_NAME, NOTIFICATION_TIMEOUT_MS};
use crate::core::cancel::DelayedAction;
use crate::prayer::reminders::{NotificationSink, ReminderRequest, SinkError};

#[zbus::proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: &HashMap<&str, &Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn get_capabilities(&self) -> zbus::Result<Vec<String>>;
}

enum Delivery {
    Desktop(Connection),
    Terminal,
}

/// Notification sink that holds every pending reminder as a cancelable timer.
///
/// On the desktop path `schedule` asks the notification server for its
/// capabilities first, so a missing server or a denied bus policy is reported to
/// the caller. A server that goes away between scheduling and the fire time is only
/// logged when the reminder fires.
pub struct DelayedNotificationSink {
    delivery: Delivery,
    pending: Vec<DelayedAction>,
}

impl DelayedNotificationSink {
    /// Deliver through the desktop notification daemon.
    pub fn desktop() -> Result<Self> {
        let connection = Connection::session().context("Failed to connect to session D-Bus")?;
        Ok(Self {
            delivery: Delivery::Desktop(connection),
            pending: Vec::new(),
        })
    }

    /// Deliver into the terminal log.
    pub fn terminal() -> Self {
        Self {
            delivery: Delivery::Terminal,
            pending: Vec::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.iter().filter(|a| !a.is_finished()).count()
    }
}

impl NotificationSink for DelayedNotificationSink {
    fn schedule(&mut self, request: &ReminderRequest) -> Result<(), SinkError> {
        self.pending.retain(|action| !action.is_finished());

        let request = request.clone();
        let action = match &self.delivery {
            Delivery::Desktop(connection) => {
                let proxy = NotificationsProxyBlocking::new(connection).map_err(sink_error)?;
                proxy.get_capabilities().map_err(sink_error)?;
                DelayedAction::spawn(request.fire_at, move || {
                    if let Err(e) = send_desktop_notification(&proxy, &request) {
                        log_pipe!();
                        log_warning!("Reminder {} not delivered: {e}", request.request_id);
                    }
                })
            }
            Delivery::Terminal => DelayedAction::spawn(request.fire_at, move || {
                log_block_start!("Reminder: {}", request.title);
                log_indented!("{}", request.body);
            }),
        };

        self.pending.push(action);
        Ok(())
    }

    fn cancel_all(&mut self) {
        for action in self.pending.drain(..) {
            action.cancel();
        }
    }
}

fn send_desktop_notification(
    proxy: &NotificationsProxyBlocking<'_>,
    request: &ReminderRequest,
) -> Result<(), SinkError> {
    let urgency = Value::U8(1);
    let hints = HashMap::from([("urgency", &urgency)]);

    proxy
        .notify(
            NOTIFICATION_APP_NAME,
            0,
            request.prayer.symbol(),
            &request.title,
            &request.body,
            &[],
            &hints,
            NOTIFICATION_TIMEOUT_MS,
        )
        .map(|_| ())
        .map_err(sink_error)
}

fn sink_error(error: zbus::Error) -> SinkError {
    match &error {
        zbus::Error::MethodError(name, _, _) if name.as_str().ends_with("AccessDenied") => {
            SinkError::PermissionDenied
        }
        _ => SinkError::Delivery(error.to_string()),
    }
}
