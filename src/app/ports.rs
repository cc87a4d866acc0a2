//! Port traits — the hexagonal boundary between the supervision core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SupervisorService (domain)
//! ```
//!
//! Driven adapters (heap introspection, relays, messaging transport,
//! config storage, system control) implement these traits. The core
//! consumes them via generics, so the domain logic never touches hardware
//! directly and the whole crate runs under host-side `cargo test` with
//! mock adapters.

use crate::config::DeviceConfig;

// ───────────────────────────────────────────────────────────────
// Heap port (driven adapter: allocator → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for allocator health.
///
/// `reclaim_step` is one bounded pass of cooperative reclamation: the
/// implementation yields control back to the scheduler so deferred frees
/// and allocator housekeeping can run, then returns. The memory monitor
/// drives it in a bounded loop — implementations must not block
/// indefinitely inside a single step.
pub trait HeapPort {
    /// Total free heap, in bytes.
    fn free_bytes(&self) -> u32;

    /// Largest single allocatable block, in bytes.
    fn largest_block_bytes(&self) -> u32;

    /// One cooperative reclamation pass (yields to the scheduler).
    fn reclaim_step(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Hardware watchdog port
// ───────────────────────────────────────────────────────────────

/// Feed-side port for the hardware task watchdog. Fed on every supervisor
/// tick, on guarded-operation entry, and inside bounded wait loops so a
/// legitimate suspension can never be mistaken for a stall.
pub trait WatchdogPort {
    fn feed(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → pulse outputs)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the two timed pulse outputs. Deliberately narrow:
/// no general GPIO abstraction, just the gate and auxiliary lines.
pub trait RelayPort {
    /// Drive the gate relay line.
    fn set_gate(&mut self, active: bool);

    /// Drive the auxiliary lock-release relay line.
    fn set_aux(&mut self, active: bool);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time and blocking delay.
///
/// `delay_ms` is a cooperative blocking wait: on device it suspends the
/// calling task (other tasks keep running) rather than spinning. Pulse
/// holds use it by design — a partial pulse is unsafe, so in-flight
/// pulses are never cancelled.
pub trait TimePort {
    /// Milliseconds since boot (monotonic).
    fn now_ms(&self) -> u64;

    /// Block the calling context for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Messaging port (driven adapter: domain ↔ remote command channel)
// ───────────────────────────────────────────────────────────────

/// One inbound update from the remote command channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Opaque sender identity assigned by the messaging service.
    pub sender_id: i64,
    /// Raw message text. The core never parses this — the dispatch layer
    /// maps it to a closed [`Command`](super::commands::Command).
    pub text: heapless::String<64>,
    /// Sender display name, for operator-facing replies.
    pub display_name: heapless::String<32>,
}

/// The remote messaging collaborator, treated as an opaque capability.
///
/// All send operations carry an internal hard timeout: a failed or slow
/// network send returns `false` within bounded time and must never hang
/// the caller. This is load-bearing for the restart path, where the
/// last-gasp notification is strictly best-effort.
pub trait MessagingPort {
    /// Send a plain text message. Returns delivery success.
    fn send_message(&mut self, target: i64, text: &str) -> bool;

    /// Send a message with an inline keyboard (rows of button labels).
    fn send_message_with_keyboard(&mut self, target: i64, text: &str, keyboard: &[&[&str]])
    -> bool;

    /// Drain a finite batch of pending updates. Re-invoke to drain more.
    fn poll_updates(&mut self) -> heapless::Vec<InboundMessage, 4>;

    /// Transport-level reachability probe (TCP connect within timeout).
    fn probe(&mut self, host: &str, port: u16, timeout_ms: u32) -> bool;

    /// Application-level round-trip confirming the service is functionally
    /// responsive, not just transport-reachable.
    fn liveness_check(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Configuration store port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the device configuration.
///
/// Implementations MUST validate before persisting and MUST commit the
/// whole record atomically from the caller's point of view — a reader
/// never observes a partially written config.
pub trait ConfigStorePort {
    /// Load configuration from persistent storage.
    /// Returns [`DeviceConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate and persist configuration in a single commit.
    fn save(&mut self, config: &DeviceConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// System port (restart)
// ───────────────────────────────────────────────────────────────

/// Hard restart of the device. Fatal by design: after `restart()` the
/// bootloader reinitialises everything from persisted configuration.
/// Mocked in tests, where it records the call instead of diverging.
pub trait SystemPort {
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, status
/// page, remote notification).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
