//! Overlay visibility state machine.
//!
//! Each upcoming occurrence, keyed by prayer and its concrete instant, moves through
//! four phases:
//!
//! ```text
//! Idle ──(inside lead window)──> ArmedWindow ──(presenter showed it)──> Shown
//!   │                                │                                   │
//!   └────────(instant reached)───────┴─────(instant reached | dismiss)───┴──> Suppressed
//! ```
//!
//! A suppressed occurrence is never shown again, even when a clock rollback puts
//! `now` back inside its window. Suppressed keys are remembered after the next
//! occurrence takes over so a rollback across that boundary is covered too.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::collections::VecDeque;

use super::Prayer;
use crate::constants::OVERLAY_HISTORY_LIMIT;

/// One calendar occurrence of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OccurrenceKey {
    pub prayer: Prayer,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Idle,
    /// Show decided, waiting for the presenter
    ArmedWindow,
    Shown,
    Suppressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySettings {
    pub enabled: bool,
    pub always_show: bool,
    pub lead_time: Duration,
}

/// What the controller should do with the presenter after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCommand {
    Show(OccurrenceKey),
    Hide,
    Keep,
}

/// Rendering side of the overlay. `time_zone` is the schedule's zone, for display.
pub trait OverlayPresenter: Send {
    fn show(
        &mut self,
        prayer: Prayer,
        at: DateTime<Utc>,
        time_zone: Tz,
        on_dismiss: Box<dyn FnOnce() + Send>,
    );
    fn hide(&mut self);
}

#[derive(Debug, Default)]
pub struct OverlayTrigger {
    current: Option<(OccurrenceKey, OverlayPhase)>,
    last_shown: Option<OccurrenceKey>,
    suppressed: VecDeque<OccurrenceKey>,
}

impl OverlayTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<OccurrenceKey> {
        self.current.map(|(key, _)| key)
    }

    pub fn phase(&self) -> OverlayPhase {
        self.current
            .map(|(_, phase)| phase)
            .unwrap_or(OverlayPhase::Idle)
    }

    /// Phase of any occurrence, including retired ones.
    pub fn phase_for(&self, key: OccurrenceKey) -> OverlayPhase {
        match self.current {
            Some((current, phase)) if current == key => phase,
            _ if self.suppressed.contains(&key) => OverlayPhase::Suppressed,
            _ => OverlayPhase::Idle,
        }
    }

    /// Most recent occurrence the overlay was triggered for.
    pub fn last_shown(&self) -> Option<OccurrenceKey> {
        self.last_shown
    }

    pub fn is_visible(&self) -> bool {
        matches!(
            self.phase(),
            OverlayPhase::ArmedWindow | OverlayPhase::Shown
        )
    }

    /// Re-evaluate for `now` with `next` as the upcoming occurrence.
    pub fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        next: Option<OccurrenceKey>,
        settings: OverlaySettings,
    ) -> OverlayCommand {
        let was_visible = self.is_visible();

        let Some(key) = next.filter(|_| settings.enabled) else {
            if let Some((old, phase)) = self.current.take() {
                self.retire(old, phase, now);
            }
            return if was_visible {
                OverlayCommand::Hide
            } else {
                OverlayCommand::Keep
            };
        };

        if self.current() != Some(key) {
            if let Some((old, phase)) = self.current.take() {
                self.retire(old, phase, now);
            }
            let phase = if self.suppressed.contains(&key) {
                OverlayPhase::Suppressed
            } else {
                OverlayPhase::Idle
            };
            self.current = Some((key, phase));
        }

        let phase = self.phase();

        if now >= key.at {
            if phase != OverlayPhase::Suppressed {
                self.suppress(key);
            }
            return if was_visible {
                OverlayCommand::Hide
            } else {
                OverlayCommand::Keep
            };
        }

        match phase {
            OverlayPhase::Idle => {
                let in_window = settings.always_show
                    || (settings.lead_time > Duration::zero() && now >= key.at - settings.lead_time);
                if in_window {
                    self.current = Some((key, OverlayPhase::ArmedWindow));
                    self.last_shown = Some(key);
                    OverlayCommand::Show(key)
                } else if was_visible {
                    OverlayCommand::Hide
                } else {
                    OverlayCommand::Keep
                }
            }
            OverlayPhase::Suppressed if was_visible => OverlayCommand::Hide,
            OverlayPhase::ArmedWindow | OverlayPhase::Shown | OverlayPhase::Suppressed => {
                OverlayCommand::Keep
            }
        }
    }

    /// Confirm the presenter displayed `key`.
    pub fn mark_shown(&mut self, key: OccurrenceKey) {
        if self.current == Some((key, OverlayPhase::ArmedWindow)) {
            self.current = Some((key, OverlayPhase::Shown));
        }
    }

    /// User dismissed the overlay for `key`. Returns true when it was visible.
    pub fn dismiss(&mut self, key: OccurrenceKey) -> bool {
        match self.current {
            Some((current, OverlayPhase::ArmedWindow | OverlayPhase::Shown)) if current == key => {
                self.suppress(key);
                true
            }
            _ => false,
        }
    }

    fn suppress(&mut self, key: OccurrenceKey) {
        self.current = Some((key, OverlayPhase::Suppressed));
        self.remember(key);
    }

    // Occurrences that were shown or already passed must stay suppressed
    fn retire(&mut self, key: OccurrenceKey, phase: OverlayPhase, now: DateTime<Utc>) {
        if phase != OverlayPhase::Idle || now >= key.at {
            self.remember(key);
        }
    }

    fn remember(&mut self, key: OccurrenceKey) {
        if self.suppressed.contains(&key) {
            return;
        }
        if self.suppressed.len() == OVERLAY_HISTORY_LIMIT {
            self.suppressed.pop_front();
        }
        self.suppressed.push_back(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, h, m, s).unwrap()
    }

    fn maghrib() -> OccurrenceKey {
        OccurrenceKey {
            prayer: Prayer::Maghrib,
            at: at(19, 0, 0),
        }
    }

    fn windowed() -> OverlaySettings {
        OverlaySettings {
            enabled: true,
            always_show: false,
            lead_time: Duration::minutes(15),
        }
    }

    #[test]
    fn test_idle_outside_window() {
        let mut trigger = OverlayTrigger::new();
        let command = trigger.evaluate(at(18, 44, 59), Some(maghrib()), windowed());
        assert_eq!(command, OverlayCommand::Keep);
        assert_eq!(trigger.phase(), OverlayPhase::Idle);
    }

    #[test]
    fn test_window_entry_shows_once() {
        let mut trigger = OverlayTrigger::new();
        let command = trigger.evaluate(at(18, 45, 0), Some(maghrib()), windowed());
        assert_eq!(command, OverlayCommand::Show(maghrib()));
        assert_eq!(trigger.phase(), OverlayPhase::ArmedWindow);

        trigger.mark_shown(maghrib());
        assert_eq!(trigger.phase(), OverlayPhase::Shown);
        assert_eq!(
            trigger.evaluate(at(18, 50, 0), Some(maghrib()), windowed()),
            OverlayCommand::Keep
        );
        assert_eq!(trigger.last_shown(), Some(maghrib()));
    }

    #[test]
    fn test_instant_reached_suppresses_and_hides() {
        let mut trigger = OverlayTrigger::new();
        trigger.evaluate(at(18, 45, 0), Some(maghrib()), windowed());
        trigger.mark_shown(maghrib());

        let command = trigger.evaluate(at(19, 0, 0), Some(maghrib()), windowed());
        assert_eq!(command, OverlayCommand::Hide);
        assert_eq!(trigger.phase(), OverlayPhase::Suppressed);
    }

    #[test]
    fn test_suppressed_never_reshown_after_rollback() {
        let mut trigger = OverlayTrigger::new();
        trigger.evaluate(at(18, 45, 0), Some(maghrib()), windowed());
        trigger.mark_shown(maghrib());
        trigger.evaluate(at(19, 0, 1), Some(maghrib()), windowed());

        let isha = OccurrenceKey {
            prayer: Prayer::Isha,
            at: at(20, 30, 0),
        };
        trigger.evaluate(at(19, 0, 2), Some(isha), windowed());

        // Clock rolled back into Maghrib's window
        let command = trigger.evaluate(at(18, 59, 0), Some(maghrib()), windowed());
        assert_eq!(command, OverlayCommand::Keep);
        assert_eq!(trigger.phase_for(maghrib()), OverlayPhase::Suppressed);
    }

    #[test]
    fn test_dismiss_suppresses_occurrence() {
        let mut trigger = OverlayTrigger::new();
        trigger.evaluate(at(18, 50, 0), Some(maghrib()), windowed());
        trigger.mark_shown(maghrib());

        assert!(trigger.dismiss(maghrib()));
        assert!(!trigger.is_visible());
        assert_eq!(
            trigger.evaluate(at(18, 51, 0), Some(maghrib()), windowed()),
            OverlayCommand::Keep
        );
        assert!(!trigger.dismiss(maghrib()));
    }

    #[test]
    fn test_shifted_instant_is_a_new_occurrence() {
        let mut trigger = OverlayTrigger::new();
        trigger.evaluate(at(18, 50, 0), Some(maghrib()), windowed());
        trigger.mark_shown(maghrib());
        trigger.dismiss(maghrib());

        let shifted = OccurrenceKey {
            prayer: Prayer::Maghrib,
            at: at(19, 2, 0),
        };
        assert_eq!(
            trigger.evaluate(at(18, 51, 0), Some(shifted), windowed()),
            OverlayCommand::Show(shifted)
        );
    }

    #[test]
    fn test_always_show_ignores_window() {
        let settings = OverlaySettings {
            always_show: true,
            ..windowed()
        };
        let mut trigger = OverlayTrigger::new();
        assert_eq!(
            trigger.evaluate(at(12, 0, 0), Some(maghrib()), settings),
            OverlayCommand::Show(maghrib())
        );
    }

    #[test]
    fn test_no_next_event_forces_idle() {
        let mut trigger = OverlayTrigger::new();
        trigger.evaluate(at(18, 50, 0), Some(maghrib()), windowed());
        trigger.mark_shown(maghrib());

        assert_eq!(
            trigger.evaluate(at(18, 51, 0), None, windowed()),
            OverlayCommand::Hide
        );
        assert_eq!(trigger.phase(), OverlayPhase::Idle);
        assert!(trigger.current().is_none());
    }

    #[test]
    fn test_disabling_overlay_hides_it() {
        let mut trigger = OverlayTrigger::new();
        trigger.evaluate(at(18, 50, 0), Some(maghrib()), windowed());
        let disabled = OverlaySettings {
            enabled: false,
            ..windowed()
        };
        assert_eq!(
            trigger.evaluate(at(18, 51, 0), Some(maghrib()), disabled),
            OverlayCommand::Hide
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let mut trigger = OverlayTrigger::new();
        for minute in 0..(OVERLAY_HISTORY_LIMIT as u32 + 4) {
            let key = OccurrenceKey {
                prayer: Prayer::Asr,
                at: at(10, minute, 0),
            };
            trigger.remember(key);
        }
        assert_eq!(trigger.suppressed.len(), OVERLAY_HISTORY_LIMIT);
    }
}
