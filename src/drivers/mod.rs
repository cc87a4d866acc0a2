//! Low-level hardware drivers (ESP-IDF sys calls), with host no-ops.

pub mod hw_init;
pub mod watchdog;
