//! Local I/O drivers: trigger button, status LED, watchdog.

pub mod button;
pub mod led_patterns;
pub mod status_led;
pub mod watchdog;
