//! GateWarden firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod actuator;
pub mod app;
pub mod config;
pub mod connectivity;
pub mod guard;
pub mod memory;
pub mod sensor;
pub mod supervisor;

pub mod error;
pub mod pins;

// Adapter/driver implementations are guarded by cfg attributes inside;
// host builds get simulation fallbacks.
pub mod adapters;
pub mod drivers;
