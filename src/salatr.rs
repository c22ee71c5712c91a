//! Application coordinator for the prayer-time daemon.
//!
//! Acquires everything the controller needs and hands it over to [`Core`]:
//! - Configuration loading
//! - Signal handler setup
//! - Monitors feeding the control channel (D-Bus, config watcher)
//! - Notification sink and overlay presenter
//!
//! Normal startup is `Salatr::new(debug_enabled).run()`. Simulation mode skips the
//! header (already printed by the simulate command) and delivers everything to the
//! terminal: `Salatr::new(debug_enabled).without_headers().terminal_only().run()`.

use anyhow::Result;

use crate::{
    config::{self, Config, TomlSettingsStore},
    core::{Core, CoreParams},
    geo::SolarTimeProvider,
    io::dbus,
    io::notifications::DelayedNotificationSink,
    io::overlay::TerminalOverlay,
    io::signals::setup_signal_handler,
    prayer::reminders::NotificationSink,
};

/// Builder for configuring and running salatr.
pub struct Salatr {
    debug_enabled: bool,
    show_headers: bool,
    terminal_only: bool,
}

impl Salatr {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            show_headers: true,
            terminal_only: false,
        }
    }

    /// Skip the version header.
    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Log reminders instead of sending desktop notifications, and don't watch
    /// the system bus.
    pub fn terminal_only(mut self) -> Self {
        self.terminal_only = true;
        self
    }

    /// Run until a shutdown signal, or until the simulated clock ends.
    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Debug mode enabled");
            }
        }

        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                log_error_exit!("Configuration failed");
                eprintln!("{e:?}");
                std::process::exit(crate::constants::EXIT_FAILURE);
            }
        };
        let config_path = config::get_config_path()?;

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        if !self.terminal_only {
            dbus::start_system_event_monitor(signal_state.sender.clone(), self.debug_enabled);
        }

        if let Err(e) = config::start_config_watcher(
            signal_state.sender.clone(),
            config_path,
            self.debug_enabled,
        ) {
            log_pipe!();
            log_warning!("Config file watching unavailable: {e}");
            log_indented!("Hot config reload disabled, use SIGUSR2 for manual reload");
        }

        config.log_config();

        let sink = self.create_sink();

        let overlay = TerminalOverlay::new();
        match overlay.listen_for_dismiss() {
            Ok(()) => log_indented!("Dismiss the overlay with: kill -USR1 {}", std::process::id()),
            Err(e) => {
                log_pipe!();
                log_warning!("Overlay dismissal unavailable: {e:#}");
            }
        }

        let mut core = Core::new(CoreParams {
            provider: Box::new(SolarTimeProvider),
            sink,
            presenter: Box::new(overlay),
            config,
            signal_state,
            store: Some(Box::new(TomlSettingsStore::default_location()?)),
            debug_enabled: self.debug_enabled,
        });

        core.run()?;
        log_end!();
        Ok(())
    }

    fn create_sink(&self) -> Box<dyn NotificationSink> {
        if self.terminal_only {
            return Box::new(DelayedNotificationSink::terminal());
        }

        match DelayedNotificationSink::desktop() {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                log_pipe!();
                log_warning!("Desktop notifications unavailable: {e:#}");
                log_indented!("Reminders will be written to the terminal instead");
                Box::new(DelayedNotificationSink::terminal())
            }
        }
    }
}
