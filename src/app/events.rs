//! Outbound application events.
//!
//! The [`SupervisorService`](super::service::SupervisorService) emits
//! these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them — log to
//! serial, render into a status message, etc.

use serde::Serialize;

use crate::actuator::SequenceOutcome;
use crate::connectivity::LinkState;
use crate::memory::HealthTier;
use crate::sensor::RingEvent;
use crate::supervisor::RestartReason;

/// Structured events emitted by the supervision core.
#[derive(Debug, Clone, Copy)]
pub enum AppEvent {
    /// The ring line produced a debounced event.
    RingDetected(RingEvent),

    /// The memory health tier changed between ticks.
    TierChanged { from: HealthTier, to: HealthTier },

    /// A gate sequence finished (complete or partial).
    SequenceFinished(SequenceOutcome),

    /// The messaging link changed state.
    ConnectivityChanged(LinkState),

    /// A restart decision was made; the restart path runs next.
    RestartPending(RestartReason),
}

/// A point-in-time status snapshot for rendering into status replies or
/// the diagnostics page. Serializes to JSON via `serde_json` at the
/// rendering boundary.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusSnapshot {
    pub tier: &'static str,
    pub free_bytes: u32,
    pub connected: bool,
    pub endpoint_port: Option<u16>,
    pub uptime_minutes: u32,
    pub reboot_count: u32,
    pub tick_count: u64,
    pub last_ring_raw: u16,
}
