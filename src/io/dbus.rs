//! Sleep/resume and wall-clock change monitoring.
//!
//! Two feeder threads report system events to the controller:
//! - systemd-logind `PrepareForSleep` over the system D-Bus (sleep and resume)
//! - a `CLOCK_REALTIME` timerfd armed with `TFD_TIMER_CANCEL_ON_SET`, which wakes up
//!   whenever the wall clock is set
//!
//! Resuming from suspend also steps the realtime clock, so clock changes observed
//! while asleep or shortly after resuming are folded into the resume event.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use nix::errno::Errno;
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use zbus::blocking::Connection;

use crate::io::signals::ControlEvent;

const MAX_MONITOR_RESTARTS: u8 = 3;
const RESTART_DELAY_MS: u64 = 2000;
const RESUME_GRACE_SECS: i64 = 5;

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LogindManager {
    /// `start` is true before suspend and false after resume.
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

#[derive(Debug, Default)]
enum PowerState {
    #[default]
    Awake,
    Asleep,
    ResumedAt(DateTime<Utc>),
}

/// Power state shared by both monitors.
#[derive(Clone, Default)]
struct SleepTracker(Arc<Mutex<PowerState>>);

impl SleepTracker {
    fn set(&self, state: PowerState) {
        *self.0.lock().unwrap() = state;
    }

    /// Whether a clock step at `now` is explained by suspend/resume.
    fn explains_clock_step(&self, now: DateTime<Utc>) -> bool {
        match *self.0.lock().unwrap() {
            PowerState::Awake => false,
            PowerState::Asleep => true,
            PowerState::ResumedAt(at) => now - at <= Duration::seconds(RESUME_GRACE_SECS),
        }
    }
}

/// Start both monitors. Failures degrade to a warning; the controller still
/// catches large jumps through its own tick comparison.
pub fn start_system_event_monitor(sender: Sender<ControlEvent>, debug_enabled: bool) {
    let tracker = SleepTracker::default();

    thread::spawn({
        let sender = sender.clone();
        let tracker = tracker.clone();
        move || {
            for attempt in 0..=MAX_MONITOR_RESTARTS {
                match monitor_sleep_signals(&sender, &tracker, debug_enabled) {
                    Ok(()) => return,
                    Err(e) => {
                        log_pipe!();
                        log_warning!("Sleep monitor error: {e}");
                    }
                }
                if attempt < MAX_MONITOR_RESTARTS {
                    log_indented!(
                        "Restarting sleep monitor (attempt {}/{MAX_MONITOR_RESTARTS})",
                        attempt + 1
                    );
                    thread::sleep(std::time::Duration::from_millis(RESTART_DELAY_MS));
                }
            }
            log_indented!("Sleep/resume detection will not be available");
        }
    });

    thread::spawn(move || {
        if let Err(e) = monitor_clock_changes(&sender, &tracker, debug_enabled) {
            log_pipe!();
            log_warning!("Clock change monitor error: {e}");
            log_indented!("Clock changes will be picked up on the next tick instead");
        }
    });
}

/// Returns Ok when the controller hung up.
fn monitor_sleep_signals(
    sender: &Sender<ControlEvent>,
    tracker: &SleepTracker,
    debug_enabled: bool,
) -> Result<()> {
    let connection = Connection::system().context("Failed to connect to system D-Bus")?;
    let logind =
        LogindManagerProxyBlocking::new(&connection).context("Failed to create logind proxy")?;
    let signals = logind
        .receive_prepare_for_sleep()
        .context("Failed to subscribe to PrepareForSleep signals")?;

    if debug_enabled {
        log_debug!("Subscribed to systemd-logind PrepareForSleep signals");
    }

    for signal in signals {
        let args = match signal.args() {
            Ok(args) => args,
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to parse PrepareForSleep signal: {e}");
                continue;
            }
        };

        let event = if args.start {
            tracker.set(PowerState::Asleep);
            ControlEvent::Sleeping
        } else {
            tracker.set(PowerState::ResumedAt(Utc::now()));
            ControlEvent::Resumed
        };

        if sender.send(event).is_err() {
            return Ok(());
        }
    }

    Err(anyhow!("PrepareForSleep signal stream ended"))
}

/// A realtime timer armed far in the future only ever wakes when the clock is set.
struct ClockChangeDetector {
    timer: TimerFd,
}

impl ClockChangeDetector {
    fn new() -> nix::Result<Self> {
        let timer = TimerFd::new(ClockId::CLOCK_REALTIME, TimerFlags::empty())?;
        let detector = Self { timer };
        detector.arm()?;
        Ok(detector)
    }

    fn arm(&self) -> nix::Result<()> {
        let flags =
            TimerSetTimeFlags::TFD_TIMER_ABSTIME | TimerSetTimeFlags::TFD_TIMER_CANCEL_ON_SET;
        let far_future = TimeSpec::new(i64::MAX / 1000, 0);
        self.timer.set(Expiration::OneShot(far_future), flags)
    }

    fn wait(&self) -> Result<()> {
        match self.timer.wait() {
            Ok(()) | Err(Errno::ECANCELED) => {
                self.arm().context("Failed to re-arm clock change timer")
            }
            Err(e) => Err(anyhow!("Timer wait error: {e}")),
        }
    }
}

fn monitor_clock_changes(
    sender: &Sender<ControlEvent>,
    tracker: &SleepTracker,
    debug_enabled: bool,
) -> Result<()> {
    let detector = ClockChangeDetector::new().context("Failed to create clock change timer")?;

    if debug_enabled {
        log_debug!("Watching for wall-clock changes");
    }

    loop {
        detector.wait()?;

        if tracker.explains_clock_step(Utc::now()) {
            continue;
        }

        if sender.send(ControlEvent::TimeChanged).is_err() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_tracker_grace_period() {
        let tracker = SleepTracker::default();
        let now = Utc::now();
        assert!(!tracker.explains_clock_step(now));

        tracker.set(PowerState::Asleep);
        assert!(tracker.explains_clock_step(now));

        tracker.set(PowerState::ResumedAt(now));
        assert!(tracker.explains_clock_step(now + Duration::seconds(3)));
        assert!(!tracker.explains_clock_step(now + Duration::seconds(30)));
    }
}
