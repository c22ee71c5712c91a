//! Structured terminal logging with box-drawing output.
//!
//! Every message is routed through [`Log::emit`], which prepends the simulated
//! clock when time simulation is active and either prints to stdout or hands the
//! line to the file logging thread started by [`Log::start_file_logging`].
//!
//! ## Logging Conventions
//!
//! - **`log_block_start!`**: opens a new conceptual block (`┃` spacer, then `┣ message`).
//!   Use it for state changes: a schedule recomputation, an overlay appearing, a reload.
//! - **`log_decorated!`**: continues the current block with `┣ message`.
//! - **`log_indented!`**: nested details under the current block (`┃   message`).
//! - **`log_pipe!`**: a lone `┃` spacer, used before `log_info!`/`log_warning!`/`log_error!`
//!   when those start a block of their own.
//! - **`log_version!`** / **`log_end!`**: the header printed once at startup and the
//!   terminator printed once at shutdown.
//! - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`**: semantic
//!   messages carrying a colored `[LEVEL]` tag.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Timezone used for simulated timestamps (the configured location's zone)
static DISPLAY_TIMEZONE: OnceLock<chrono_tz::Tz> = OnceLock::new();

// Set once when --log is active during simulation
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Severity tag rendered as `[LEVEL]` in front of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
    Debug,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "\x1b[32mINFO\x1b[0m",
            Level::Warning => "\x1b[33mWARNING\x1b[0m",
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Debug => "\x1b[32mDEBUG\x1b[0m",
        }
    }
}

/// Main logging interface.
pub struct Log;

impl Log {
    /// Enable or disable logging (quiet operation in tests and one-shot commands).
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Set the timezone used to render simulated timestamps.
    pub fn set_display_timezone(tz: chrono_tz::Tz) {
        let _ = DISPLAY_TIMEZONE.set(tz);
    }

    /// Route all further output to `file_path` until the guard is dropped.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix shown only while time is simulated.
    pub fn timestamp_prefix() -> String {
        if !(crate::time::source::is_initialized() && crate::time::source::is_simulated()) {
            return String::new();
        }

        let now = crate::time::source::now();
        match DISPLAY_TIMEZONE.get() {
            Some(tz) => format!("[{}] ", now.with_timezone(tz).format("%H:%M:%S")),
            None => format!("[{}] ", now.with_timezone(&chrono::Local).format("%H:%M:%S")),
        }
    }

    /// Format and write one message.
    ///
    /// `spacer` emits a leading `┃` line (block starts); `marker` is the box-drawing
    /// glyph placed before the optional level tag.
    pub fn emit(spacer: bool, marker: &str, level: Option<Level>, message: &str) {
        if !Self::is_enabled() {
            return;
        }

        let prefix = Self::timestamp_prefix();
        let mut line = String::new();
        if spacer {
            line.push_str(&format!("{prefix}┃\n"));
        }
        match level {
            Some(level) => line.push_str(&format!("{prefix}{marker}[{}] {message}\n", level.tag())),
            None if message.is_empty() => line.push_str(&format!("{prefix}{marker}\n")),
            None => line.push_str(&format!("{prefix}{marker} {message}\n")),
        }
        write_output(&line);
    }
}

/// Guard for file logging that flushes and joins the writer thread on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Write already formatted text to the active sink (needed by the macros).
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros

/// Log a message that continues the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(false, "┣", None, &format!($($arg)*))
    };
}

/// Log a nested detail line.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(false, "┃  ", None, &format!($($arg)*))
    };
}

/// Log a lone pipe spacer.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::logger::Log::emit(false, "┃", None, "")
    };
}

/// Start a new block of related messages.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(true, "┣", None, &format!($($arg)*))
    };
}

/// Log the application header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::logger::Log::emit(
            false,
            "┏",
            None,
            &format!("salatr v{} ━━╸", env!("CARGO_PKG_VERSION")),
        )
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::logger::Log::emit(false, "╹", None, "")
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(false, "┣", Some($crate::logger::Level::Info), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(false, "┣", Some($crate::logger::Level::Warning), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(false, "┣", Some($crate::logger::Level::Error), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(false, "┣", Some($crate::logger::Level::Debug), &format!($($arg)*))
    };
}

/// Log an error that terminates the current flow (`┗[ERROR]`).
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)*) => {
        $crate::logger::Log::emit(true, "┗", Some($crate::logger::Level::Error), &format!($($arg)*))
    };
}
