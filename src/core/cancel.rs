//! Cancellation tokens and cancelable delayed actions.
//!
//! A [`DelayedAction`] runs a closure once the global time source reaches a
//! deadline. Cancellation is explicit through its token; dropping the handle does
//! not cancel it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::DELAYED_ACTION_POLL_MS;
use crate::time::source;

/// Shared flag checked by a pending action before it fires.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A closure scheduled for a wall-clock deadline on its own thread.
pub struct DelayedAction {
    token: CancellationToken,
    deadline: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl DelayedAction {
    pub fn spawn<F>(deadline: DateTime<Utc>, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let watcher = token.clone();

        let handle = thread::spawn(move || {
            // Re-read the clock every poll so wall-clock jumps move the deadline too
            loop {
                if watcher.is_cancelled() || source::simulation_ended() {
                    return;
                }
                let now = source::now();
                if now >= deadline {
                    break;
                }
                thread::sleep(poll_interval(deadline - now));
            }

            if !watcher.is_cancelled() {
                action();
            }
        });

        Self {
            token,
            deadline,
            handle,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the action ran or observed its cancellation.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn poll_interval(remaining: chrono::Duration) -> Duration {
    if source::is_simulated() {
        return Duration::from_millis(5);
    }
    let remaining = remaining.to_std().unwrap_or_default();
    remaining.min(Duration::from_millis(DELAYED_ACTION_POLL_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_elapsed_deadline_fires_immediately() {
        let (tx, rx) = channel();
        let action = DelayedAction::spawn(Utc::now() - chrono::Duration::seconds(1), move || {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        thread::sleep(Duration::from_millis(20));
        assert!(action.is_finished());
    }

    #[test]
    fn test_cancelled_action_never_fires() {
        let (tx, rx) = channel::<()>();
        let action = DelayedAction::spawn(Utc::now() + chrono::Duration::milliseconds(300), move || {
            let _ = tx.send(());
        });
        action.cancel();
        assert!(action.token().is_cancelled());
        assert!(rx.recv_timeout(Duration::from_millis(600)).is_err());
    }
}
