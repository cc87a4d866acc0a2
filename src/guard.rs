//! Critical-operation guard.
//!
//! Brackets multi-step hardware/network sequences with memory health
//! checks so a sequence never starts — or silently continues — while the
//! heap is collapsing underneath it.
//!
//! ## Span lifecycle
//!
//! 1. `begin()` feeds the watchdog and takes a pre-flight sample. At
//!    CRITICAL or worse it runs a best-effort cleanup first; entry is
//!    never refused on memory grounds (cleanup is mitigation, not a
//!    precondition), but a degraded entry is logged.
//! 2. The operation body calls `recheck()` between its internal steps —
//!    a cooperative contract, not automatic — and may abort remaining
//!    steps. Partial state is logged, never rolled back: physical
//!    actuators have no rollback.
//! 3. `end()` takes the post-flight sample and logs it.
//!
//! At most one span may be open. Opening a second is a programming error
//! and panics — the contract violation must surface in testing, not be
//! papered over at runtime.

use log::{info, warn};

use crate::app::ports::{HeapPort, WatchdogPort};
use crate::memory::{HealthTier, MemoryMonitor};

/// Ephemeral token for an in-progress guarded operation.
#[derive(Debug)]
pub struct OpSpan {
    name: &'static str,
    entry_free_bytes: u32,
    entry_tier: HealthTier,
    degraded_entry: bool,
}

impl OpSpan {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the pre-flight check entered at CRITICAL or worse.
    pub fn degraded_entry(&self) -> bool {
        self.degraded_entry
    }
}

/// Guard state. One instance lives in the supervisor context.
pub struct OpGuard {
    open: bool,
}

impl OpGuard {
    pub fn new() -> Self {
        Self { open: false }
    }

    /// Open a span: feed the watchdog, pre-flight sample, best-effort
    /// cleanup at CRITICAL or worse.
    ///
    /// # Panics
    ///
    /// Panics if a span is already open (nested spans are a contract
    /// violation).
    pub fn begin(
        &mut self,
        name: &'static str,
        monitor: &mut MemoryMonitor,
        heap: &mut impl HeapPort,
        watchdog: &mut impl WatchdogPort,
        now_ms: u64,
    ) -> OpSpan {
        assert!(!self.open, "nested critical-operation span: {name}");
        watchdog.feed();

        let mut tier = monitor.sample(heap, now_ms);
        let degraded = tier >= HealthTier::Critical;
        if degraded {
            warn!("Guard: '{}' entering at {} — running cleanup first", name, tier);
            let reclaimed = monitor.force_cleanup(heap, watchdog, now_ms);
            tier = monitor.sample(heap, now_ms);
            warn!(
                "Guard: '{}' degraded entry (reclaimed {} bytes, now {})",
                name, reclaimed, tier
            );
        }

        let entry_free = heap.free_bytes();
        info!("Guard: '{}' begin ({} free, {})", name, entry_free, tier);
        self.open = true;
        OpSpan {
            name,
            entry_free_bytes: entry_free,
            entry_tier: tier,
            degraded_entry: degraded,
        }
    }

    /// Mid-sequence health re-check. The caller decides whether to abort
    /// the remaining steps on the returned tier.
    pub fn recheck(
        &self,
        monitor: &mut MemoryMonitor,
        heap: &impl HeapPort,
        now_ms: u64,
    ) -> HealthTier {
        debug_assert!(self.open, "recheck outside an open span");
        monitor.sample(heap, now_ms)
    }

    /// Close the span with a post-flight sample.
    pub fn end(
        &mut self,
        span: OpSpan,
        monitor: &mut MemoryMonitor,
        heap: &impl HeapPort,
        now_ms: u64,
    ) {
        let tier = monitor.sample(heap, now_ms);
        let free_now = heap.free_bytes();
        let delta = free_now as i64 - span.entry_free_bytes as i64;
        info!(
            "Guard: '{}' end ({} free, {} change {:+}, entered {})",
            span.name, free_now, tier, delta, span.entry_tier
        );
        self.open = false;
    }

    /// Whether a span is currently open.
    pub fn is_open(&self) -> bool {
        self.open
    }
}
