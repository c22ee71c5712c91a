//! Application-wide defaults, limits and exit codes.

// # Reminder Settings
pub const DEFAULT_REMINDER_MINUTES: u32 = 15;
pub const MINIMUM_REMINDER_MINUTES: u32 = 0;
pub const MAXIMUM_REMINDER_MINUTES: u32 = 120;
pub const DEFAULT_REMINDERS_ENABLED: bool = true;

/// Number of delivered reminder ids remembered to prevent a second delivery.
pub const REMINDER_HISTORY_LIMIT: usize = 16;

// # Overlay Settings
pub const DEFAULT_OVERLAY_ENABLED: bool = true;
pub const DEFAULT_ALWAYS_SHOW_OVERLAY: bool = false;

/// Number of retired overlay occurrences remembered as suppressed.
pub const OVERLAY_HISTORY_LIMIT: usize = 16;

// # Clock Handling
pub const TICK_INTERVAL_MS: u64 = 1000;

/// Largest forward gap between two ticks that still counts as continuous time.
pub const CLOCK_JUMP_TOLERANCE_SECS: i64 = 10;

/// Poll interval for cancelable delayed actions.
pub const DELAYED_ACTION_POLL_MS: u64 = 250;

// # Astronomy
/// Latitude above which the seventh-of-the-night rule bounds Fajr and Isha.
pub const HIGH_LATITUDE_THRESHOLD: f64 = 48.0;

/// Fixed Isha interval after Maghrib for interval-based methods.
pub const ISHA_INTERVAL_MINUTES: i64 = 90;

// # Notifications
pub const NOTIFICATION_APP_NAME: &str = "salatr";
pub const NOTIFICATION_TIMEOUT_MS: i32 = 10_000;

// # Exit Codes
pub const EXIT_FAILURE: i32 = 1;
