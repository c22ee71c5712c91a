//! Terminal overlay presenter.
//!
//! Prints the overlay as a log block. A terminal has no close button, so the user
//! dismisses a visible overlay with `SIGUSR1` once [`TerminalOverlay::listen_for_dismiss`]
//! is running. The dismiss callback is dropped on the next hide.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use signal_hook::{consts::signal::SIGUSR1, iterator::Signals};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::prayer::Prayer;
use crate::prayer::overlay::OverlayPresenter;

type DismissCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct OverlayState {
    visible: Option<(Prayer, DateTime<Utc>)>,
    on_dismiss: Option<DismissCallback>,
}

/// Presenter shared between the controller and the dismiss listener.
#[derive(Clone, Default)]
pub struct TerminalOverlay {
    state: Arc<Mutex<OverlayState>>,
}

impl TerminalOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dismiss the visible overlay on every `SIGUSR1`.
    pub fn listen_for_dismiss(&self) -> Result<()> {
        let mut signals =
            Signals::new([SIGUSR1]).context("failed to register overlay dismiss signal")?;
        let overlay = self.clone();

        thread::spawn(move || {
            for _ in signals.forever() {
                overlay.dismiss();
            }
        });

        Ok(())
    }

    pub fn visible(&self) -> Option<(Prayer, DateTime<Utc>)> {
        self.state.lock().unwrap().visible
    }

    /// Close the overlay as the user would. Does nothing when none is visible.
    pub fn dismiss(&self) {
        let dismissed = {
            let mut state = self.state.lock().unwrap();
            state
                .on_dismiss
                .take()
                .map(|callback| (state.visible.take(), callback))
        };

        if let Some((visible, callback)) = dismissed {
            if let Some((prayer, _)) = visible {
                log_decorated!("┗━ {prayer} overlay dismissed");
            }
            callback();
        }
    }
}

impl OverlayPresenter for TerminalOverlay {
    fn show(
        &mut self,
        prayer: Prayer,
        at: DateTime<Utc>,
        time_zone: Tz,
        on_dismiss: DismissCallback,
    ) {
        let local = at.with_timezone(&time_zone);
        log_block_start!("┏━ {prayer} at {} ━━", local.format("%H:%M"));

        let mut state = self.state.lock().unwrap();
        state.visible = Some((prayer, at));
        state.on_dismiss = Some(on_dismiss);
    }

    fn hide(&mut self) {
        let mut state = self.state.lock().unwrap();
        if let Some((prayer, _)) = state.visible.take() {
            log_decorated!("┗━ {prayer} overlay closed");
        }
        state.on_dismiss = None;
    }
}
