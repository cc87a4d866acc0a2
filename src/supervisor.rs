//! Watchdog supervision: stall, memory, and silence policy.
//!
//! [`WatchdogSupervisor::tick`] runs once per loop iteration, in fixed
//! order: feed the hardware watchdog, stall detection, memory trend,
//! connectivity silence. The fixed order is what bounds worst-case loop
//! latency and what the stall ceiling is calibrated against.
//!
//! The supervisor only *decides* — it returns a [`RestartReason`] and the
//! service executes the restart path (persist counters, best-effort
//! notification, grace delay, hard restart). Restart is fatal by design:
//! there is no in-process recovery once the decision is made.

use log::{error, warn};

use crate::app::ports::{HeapPort, MessagingPort, WatchdogPort};
use crate::connectivity::ConnectivityState;
use crate::memory::{HealthTier, MemoryMonitor};

/// A tick gap beyond this means the loop body blocked pathologically.
pub const STALL_CEILING_MS: u64 = 45_000;

/// Why the supervisor decided to restart. Rendered into the last-gasp
/// notification and the pre-restart log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// Wall-clock gap between ticks exceeded the stall ceiling.
    LoopStall { gap_ms: u64 },
    /// Free heap fell below the emergency floor.
    MemoryEmergency { free_bytes: u32 },
    /// Critical tier survived a cleanup attempt.
    MemoryCriticalRefractory { free_bytes: u32 },
}

impl core::fmt::Display for RestartReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LoopStall { gap_ms } => write!(f, "loop stall ({gap_ms}ms between ticks)"),
            Self::MemoryEmergency { free_bytes } => {
                write!(f, "memory emergency ({free_bytes} bytes free)")
            }
            Self::MemoryCriticalRefractory { free_bytes } => {
                write!(f, "memory critical after cleanup ({free_bytes} bytes free)")
            }
        }
    }
}

/// Top-level health loop state.
pub struct WatchdogSupervisor {
    last_tick_ms: Option<u64>,
    /// Liveness proof for diagnostics only — never used for decisions.
    tick_count: u64,
}

impl WatchdogSupervisor {
    pub fn new() -> Self {
        Self {
            last_tick_ms: None,
            tick_count: 0,
        }
    }

    /// One supervision pass. Returns a restart decision, or `None` when
    /// the device is healthy enough to continue.
    pub fn tick(
        &mut self,
        now_ms: u64,
        monitor: &mut MemoryMonitor,
        connectivity: &mut ConnectivityState,
        heap: &mut impl HeapPort,
        watchdog: &mut impl WatchdogPort,
        transport: &mut impl MessagingPort,
    ) -> Option<RestartReason> {
        // 1. Hardware watchdog feed + liveness counter.
        watchdog.feed();
        self.tick_count += 1;

        // 2. Stall detection.
        if let Some(prev) = self.last_tick_ms {
            let gap = now_ms.saturating_sub(prev);
            if gap > STALL_CEILING_MS {
                error!("Watchdog: loop stalled for {}ms — restarting", gap);
                self.last_tick_ms = Some(now_ms);
                return Some(RestartReason::LoopStall { gap_ms: gap });
            }
        }
        self.last_tick_ms = Some(now_ms);

        // 3. Memory trend.
        let tier = monitor.sample(heap, now_ms);
        match tier {
            HealthTier::Emergency => {
                // No cleanup retry at emergency — every millisecond of
                // remaining headroom goes to persistence + notification.
                let free = heap.free_bytes();
                error!("Watchdog: memory EMERGENCY ({} bytes) — restarting", free);
                return Some(RestartReason::MemoryEmergency { free_bytes: free });
            }
            HealthTier::Critical => {
                warn!("Watchdog: memory CRITICAL, attempting cleanup");
                let _ = monitor.force_cleanup(heap, watchdog, now_ms);
                let after = monitor.sample(heap, now_ms);
                if after >= HealthTier::Critical {
                    let free = heap.free_bytes();
                    error!(
                        "Watchdog: still {} after cleanup ({} bytes) — restarting",
                        after, free
                    );
                    return Some(RestartReason::MemoryCriticalRefractory { free_bytes: free });
                }
            }
            HealthTier::Low => {
                let _ = monitor.force_cleanup(heap, watchdog, now_ms);
            }
            HealthTier::Normal => {}
        }

        // 4. Connectivity silence. Demotion only — never a restart.
        connectivity.check_silence(transport, now_ms);

        None
    }

    /// Total supervision ticks since boot (diagnostics).
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
