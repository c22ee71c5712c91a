//! Host integration: signals, system events, notification delivery and overlay output.

pub mod dbus;
pub mod notifications;
pub mod overlay;
pub mod signals;
