#![allow(dead_code)] // Comms variants reserved for typed MessagingPort returns

//! Unified error types for the GateWarden firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the top-level loop's error handling uniform. All variants are `Copy`
//! so they pass through the supervision core without allocation.
//!
//! Note that restart decisions are deliberately *not* errors — see
//! [`RestartReason`](crate::supervisor::RestartReason). A restart is a
//! recovery policy outcome, not a fault to propagate.

use core::fmt;

use crate::app::ports::ConfigError;

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded/saved.
    Config(ConfigError),
    /// A communication operation against the messaging service failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Outbound send failed or timed out.
    SendFailed,
    /// Update poll failed or timed out.
    PollFailed,
    /// Transport-level probe could not connect.
    ProbeFailed,
    /// Application-level liveness round-trip failed.
    LivenessFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed => write!(f, "send failed"),
            Self::PollFailed => write!(f, "poll failed"),
            Self::ProbeFailed => write!(f, "probe failed"),
            Self::LivenessFailed => write!(f, "liveness check failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
