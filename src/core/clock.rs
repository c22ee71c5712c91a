//! Wall-clock discontinuity detection between ticks.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::constants::CLOCK_JUMP_TOLERANCE_SECS;

/// A jump in wall-clock time between two consecutive observations.
///
/// Not an error: the controller answers it by recomputing schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockDiscontinuity {
    Backward { by: Duration },
    Forward { by: Duration },
}

impl fmt::Display for ClockDiscontinuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockDiscontinuity::Backward { by } => {
                write!(f, "clock moved back by {}s", by.num_seconds())
            }
            ClockDiscontinuity::Forward { by } => {
                write!(f, "clock jumped forward by {}s", by.num_seconds())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClockMonitor {
    last: Option<DateTime<Utc>>,
    tolerance: Duration,
}

impl Default for ClockMonitor {
    fn default() -> Self {
        Self::new(Duration::seconds(CLOCK_JUMP_TOLERANCE_SECS))
    }
}

impl ClockMonitor {
    pub fn new(tolerance: Duration) -> Self {
        Self {
            last: None,
            tolerance,
        }
    }

    /// Record `now` and report a jump relative to the previous observation.
    pub fn observe(&mut self, now: DateTime<Utc>) -> Option<ClockDiscontinuity> {
        let last = self.last.replace(now)?;
        let delta = now - last;

        if delta < Duration::zero() {
            Some(ClockDiscontinuity::Backward { by: -delta })
        } else if delta > self.tolerance {
            Some(ClockDiscontinuity::Forward { by: delta })
        } else {
            None
        }
    }

    /// Forget history; the next observation is taken as continuous.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.last = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 22, 0, 0).unwrap()
    }

    #[test]
    fn test_first_observation_is_continuous() {
        let mut monitor = ClockMonitor::default();
        assert_eq!(monitor.observe(base()), None);
        assert_eq!(monitor.observe(base() + Duration::seconds(1)), None);
        assert_eq!(monitor.observe(base() + Duration::seconds(11)), None);
    }

    #[test]
    fn test_sleep_gap_is_forward_jump() {
        let mut monitor = ClockMonitor::default();
        monitor.observe(base());
        assert_eq!(
            monitor.observe(base() + Duration::hours(9)),
            Some(ClockDiscontinuity::Forward {
                by: Duration::hours(9)
            })
        );
    }

    #[test]
    fn test_any_backward_step_is_reported() {
        let mut monitor = ClockMonitor::default();
        monitor.observe(base());
        assert_eq!(
            monitor.observe(base() - Duration::seconds(2)),
            Some(ClockDiscontinuity::Backward {
                by: Duration::seconds(2)
            })
        );
    }

    #[test]
    fn test_reset_absorbs_gap() {
        let mut monitor = ClockMonitor::default();
        monitor.observe(base());
        monitor.reset(base() + Duration::hours(1));
        assert_eq!(monitor.observe(base() + Duration::hours(1)), None);
    }
}
