//! Gate actuation sequencing.
//!
//! Orders the two physical pulse outputs — gate relay first, auxiliary
//! lock release second — with a fixed inter-step delay, the whole
//! sequence wrapped in one critical-operation span.
//!
//! Pulse holds are blocking waits by design: a partially held pulse is
//! unsafe, so in-flight pulses are never cancelled. The only cancellation
//! point is *between* the two steps, where the guard re-check may abort
//! the auxiliary pulse. That partial outcome is an accepted design result
//! surfaced to the caller, never silently reported as full success.

use log::{info, warn};

use crate::app::ports::{HeapPort, RelayPort, TimePort, WatchdogPort};
use crate::config::DeviceConfig;
use crate::guard::OpGuard;
use crate::memory::{HealthTier, MemoryMonitor};

/// Fixed delay between the gate pulse and the auxiliary pulse.
pub const INTER_STEP_DELAY_MS: u32 = 500;

/// Outcome of a triggered sequence, observable by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Both pulses completed.
    Complete,
    /// Gate pulsed, auxiliary step aborted by the mid-sequence health
    /// re-check. Partial state is logged, not rolled back.
    Partial,
}

pub struct GateSequencer;

impl GateSequencer {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pulse sequence inside a guarded span.
    pub fn trigger(
        &mut self,
        config: &DeviceConfig,
        guard: &mut OpGuard,
        monitor: &mut MemoryMonitor,
        heap: &mut impl HeapPort,
        watchdog: &mut impl WatchdogPort,
        relays: &mut impl RelayPort,
        time: &mut impl TimePort,
    ) -> SequenceOutcome {
        let span = guard.begin("gate-sequence", monitor, heap, watchdog, time.now_ms());

        // Step 1: gate pulse (blocking hold, never cancelled mid-pulse).
        info!("Sequencer: gate pulse {}ms", config.gate_pulse_ms);
        relays.set_gate(true);
        time.delay_ms(config.gate_pulse_ms);
        relays.set_gate(false);

        time.delay_ms(INTER_STEP_DELAY_MS);

        // Cooperative re-check between steps.
        let tier = guard.recheck(monitor, heap, time.now_ms());
        let outcome = if tier >= HealthTier::Critical {
            warn!(
                "Sequencer: aborting aux step at {} — partial completion",
                tier
            );
            SequenceOutcome::Partial
        } else {
            info!("Sequencer: aux pulse {}ms", config.aux_pulse_ms);
            relays.set_aux(true);
            time.delay_ms(config.aux_pulse_ms);
            relays.set_aux(false);
            SequenceOutcome::Complete
        };

        guard.end(span, monitor, heap, time.now_ms());
        outcome
    }
}
