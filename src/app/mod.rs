//! Application core — pure supervision logic, zero I/O.
//!
//! This module contains the resilience kernel for the gate controller:
//! memory supervision, connectivity tracking, ring detection, and the
//! guarded actuation path. All interaction with hardware and the remote
//! messaging service happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
