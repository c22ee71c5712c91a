//! Time handling: the wall-clock source shared by the controller and its timers.

pub mod source;
