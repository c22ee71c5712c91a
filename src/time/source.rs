//! Wall-clock abstraction supporting real and simulated time.
//!
//! The controller reads time through this module so a whole day of prayer times
//! can be replayed in seconds by the `simulate` command. Everything below the
//! controller takes `now` as an argument and never reads the clock itself.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

/// Global time source instance, defaults to RealTimeSource
static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Current wall-clock instant
    fn now(&self) -> DateTime<Utc>;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: StdDuration);

    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated time source for replaying a time range.
///
/// Two modes are supported:
/// - Linear acceleration: each real second advances `multiplier` simulated seconds
/// - Fast-forward (`multiplier == 0.0`): sleeps advance the clock instantly
pub struct SimulatedTimeSource {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    time_multiplier: f64,
    /// Simulated time elapsed through completed sleeps
    elapsed: Mutex<ChronoDuration>,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source.
    ///
    /// A negative multiplier falls back to 60x (one simulated minute per second).
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, multiplier: f64) -> Self {
        let time_multiplier = if multiplier == 0.0 {
            0.0
        } else if multiplier < 0.0 {
            60.0
        } else {
            multiplier
        };

        Self {
            start_time,
            end_time,
            time_multiplier,
            elapsed: Mutex::new(ChronoDuration::zero()),
        }
    }

    fn current_time(&self) -> DateTime<Utc> {
        let elapsed = *self.elapsed.lock().unwrap();
        (self.start_time + elapsed).min(self.end_time)
    }

    pub fn is_ended(&self) -> bool {
        self.current_time() >= self.end_time
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.current_time()
    }

    fn sleep(&self, duration: StdDuration) {
        let remaining = self.end_time - self.current_time();
        let requested = ChronoDuration::milliseconds(duration.as_millis() as i64);
        let step = requested.min(remaining).max(ChronoDuration::zero());

        if self.time_multiplier == 0.0 {
            // Let other threads observe the new time and flush their logs
            std::thread::sleep(StdDuration::from_millis(1));
        } else if let Ok(step_std) = step.to_std() {
            std::thread::sleep(step_std.div_f64(self.time_multiplier));
        }

        *self.elapsed.lock().unwrap() += step;
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        SimulatedTimeSource::is_ended(self)
    }
}

/// Initialize the global time source (call once at startup)
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

fn source() -> &'static Arc<dyn TimeSource> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource))
}

/// Get the current time from the global time source
pub fn now() -> DateTime<Utc> {
    source().now()
}

/// Sleep for the specified duration using the global time source
pub fn sleep(duration: StdDuration) {
    source().sleep(duration)
}

pub fn is_simulated() -> bool {
    source().is_simulated()
}

/// Check if simulation has reached its end time (always false for real time)
pub fn simulation_ended() -> bool {
    source().is_ended()
}

/// Parse "YYYY-MM-DD HH:MM:SS" as a wall-clock time in `tz`.
pub fn parse_datetime_in_tz(s: &str, tz: Tz) -> Result<DateTime<Utc>, String> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;

    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("Ambiguous or invalid time in timezone {tz}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        parse_datetime_in_tz(s, Tz::UTC).unwrap()
    }

    #[test]
    fn test_fast_forward_advances_by_requested_duration() {
        let source = SimulatedTimeSource::new(
            utc("2025-03-01 10:00:00"),
            utc("2025-03-01 11:00:00"),
            0.0,
        );
        source.sleep(StdDuration::from_secs(90));
        assert_eq!(source.now(), utc("2025-03-01 10:01:30"));
        assert!(!source.is_ended());
    }

    #[test]
    fn test_fast_forward_caps_at_end_time() {
        let source = SimulatedTimeSource::new(
            utc("2025-03-01 10:00:00"),
            utc("2025-03-01 10:00:10"),
            0.0,
        );
        source.sleep(StdDuration::from_secs(60));
        assert_eq!(source.now(), utc("2025-03-01 10:00:10"));
        assert!(source.is_ended());
    }

    #[test]
    fn test_parse_datetime_in_tz_converts_to_utc() {
        let parsed = parse_datetime_in_tz("2025-06-01 12:00:00", chrono_tz::Europe::Berlin)
            .unwrap();
        assert_eq!(parsed, utc("2025-06-01 10:00:00"));
        assert!(parse_datetime_in_tz("12:00", Tz::UTC).is_err());
    }
}
