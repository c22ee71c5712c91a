//! Control events and POSIX signal handling.
//!
//! Every external stimulus reaches the controller as a [`ControlEvent`] on a single
//! channel: POSIX signals from the handler thread below, sleep/resume and clock
//! changes from [`crate::io::dbus`], config file edits from the watcher, and
//! overlay callbacks from the presenter and its auto-hide timer.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, Sender, channel},
    thread,
};

use crate::config::Config;
use crate::prayer::overlay::OccurrenceKey;

/// Everything the controller reacts to besides its own tick.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    /// Re-read settings from the store (SIGUSR2)
    Reload,
    /// Settings already loaded by the file watcher
    ConfigChanged(Box<Config>),
    /// System is about to suspend
    Sleeping,
    /// System resumed from suspend
    Resumed,
    /// Wall clock was set (manual change or NTP step)
    TimeChanged,
    /// User closed the overlay for this occurrence
    OverlayDismissed(OccurrenceKey),
    /// The overlay's auto-hide deadline passed for this occurrence
    AutoHideElapsed(OccurrenceKey),
    /// SIGTERM, SIGINT or SIGHUP
    Shutdown,
}

/// Channel and running flag shared between the controller and its feeder threads.
pub struct SignalState {
    pub running: Arc<AtomicBool>,
    pub receiver: Receiver<ControlEvent>,
    pub sender: Sender<ControlEvent>,
}

impl SignalState {
    /// Channel without OS signal registration.
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            receiver,
            sender,
        }
    }
}

impl Default for SignalState {
    fn default() -> Self {
        Self::new()
    }
}

/// Register POSIX signal handlers feeding the control channel.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let state = SignalState::new();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running = Arc::clone(&state.running);
    let sender = state.sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            let event = match sig {
                SIGUSR2 => {
                    log_pipe!();
                    log_info!("Received configuration reload signal");
                    ControlEvent::Reload
                }
                SIGINT | SIGTERM | SIGHUP => {
                    if debug_enabled {
                        log_pipe!();
                        log_debug!("Received shutdown signal {sig}");
                    }
                    running.store(false, Ordering::SeqCst);
                    ControlEvent::Shutdown
                }
                _ => continue,
            };

            let is_shutdown = matches!(event, ControlEvent::Shutdown);
            if sender.send(event).is_err() || is_shutdown {
                break;
            }
        }
    });

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_state_channel_roundtrip() {
        let state = SignalState::new();
        state.sender.send(ControlEvent::Resumed).unwrap();
        assert!(matches!(
            state.receiver.try_recv().unwrap(),
            ControlEvent::Resumed
        ));
        assert!(state.running.load(Ordering::SeqCst));
    }
}
