//! Heap health monitoring and escalating cleanup.
//!
//! Every supervision tick samples the allocator through [`HeapPort`] and
//! classifies the result into a [`HealthTier`]. Classification is a pure
//! function of the latest sample — no hysteresis, no latching — so the
//! monotonicity property (lower free memory never classifies less severe)
//! is mechanically checkable.
//!
//! ## Tier ladder
//!
//! | Tier      | Condition (free heap)          | Action                          |
//! |-----------|--------------------------------|---------------------------------|
//! | Emergency | < 9 KiB                        | restart after best-effort notify |
//! | Critical  | < 14 KiB                       | cleanup, re-sample, escalate     |
//! | Low       | < 20 KiB or fragmentation >30% | cleanup, no restart              |
//! | Normal    | otherwise                      | none                             |
//!
//! The escalation itself lives in the watchdog supervisor; this module
//! only classifies and reclaims.

use log::{info, warn};

use crate::app::ports::{HeapPort, WatchdogPort};

/// Free-heap floor below which the device cannot complete another
/// operation safely and must restart.
pub const EMERGENCY_FLOOR_BYTES: u32 = 9 * 1024;
/// Free-heap floor below which cleanup runs and a refractory result
/// escalates to restart.
pub const CRITICAL_FLOOR_BYTES: u32 = 14 * 1024;
/// Free-heap floor for opportunistic cleanup without escalation.
pub const LOW_FLOOR_BYTES: u32 = 20 * 1024;
/// Fragmentation percentage that classifies LOW on its own.
pub const LOW_FRAGMENTATION_PERCENT: u8 = 30;

/// Cleanup is iteration-bounded, not time-bounded: each pass yields to
/// the scheduler once and feeds the hardware watchdog.
const CLEANUP_MAX_PASSES: u32 = 8;
/// Recovery below this is logged as ineffective (diagnostic only).
const CLEANUP_NOISE_FLOOR_BYTES: i64 = 256;

// ───────────────────────────────────────────────────────────────
// Health tier
// ───────────────────────────────────────────────────────────────

/// Ordered memory-health classification. The derived total order runs
/// from least to most severe, so `tier >= HealthTier::Critical` reads as
/// "at least critical".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthTier {
    Normal,
    Low,
    Critical,
    Emergency,
}

impl HealthTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Low => "LOW",
            Self::Critical => "CRITICAL",
            Self::Emergency => "EMERGENCY",
        }
    }
}

impl core::fmt::Display for HealthTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// Health sample
// ───────────────────────────────────────────────────────────────

/// One point-in-time allocator reading. Not persisted.
#[derive(Debug, Clone, Copy)]
pub struct HealthSample {
    pub free_bytes: u32,
    pub largest_block_bytes: u32,
    /// `None` when the allocator cannot report block sizes.
    pub fragmentation_percent: Option<u8>,
    pub timestamp_ms: u64,
}

impl HealthSample {
    /// Capture a fresh sample from the heap port.
    pub fn capture(heap: &impl HeapPort, now_ms: u64) -> Self {
        let free = heap.free_bytes();
        let largest = heap.largest_block_bytes();
        let fragmentation = if free > 0 && largest <= free {
            Some((100 - (largest as u64 * 100 / free as u64)) as u8)
        } else {
            None
        };
        Self {
            free_bytes: free,
            largest_block_bytes: largest,
            fragmentation_percent: fragmentation,
            timestamp_ms: now_ms,
        }
    }

    /// Pure tier classification: thresholds checked most severe first,
    /// first match wins.
    pub fn tier(&self) -> HealthTier {
        if self.free_bytes < EMERGENCY_FLOOR_BYTES {
            return HealthTier::Emergency;
        }
        if self.free_bytes < CRITICAL_FLOOR_BYTES {
            return HealthTier::Critical;
        }
        if self.free_bytes < LOW_FLOOR_BYTES
            || self
                .fragmentation_percent
                .is_some_and(|f| f > LOW_FRAGMENTATION_PERCENT)
        {
            return HealthTier::Low;
        }
        HealthTier::Normal
    }
}

// ───────────────────────────────────────────────────────────────
// Memory monitor
// ───────────────────────────────────────────────────────────────

/// Tracks the latest heap sample and runs the cooperative cleanup loop.
pub struct MemoryMonitor {
    last_sample: Option<HealthSample>,
    cleanup_runs: u32,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self {
            last_sample: None,
            cleanup_runs: 0,
        }
    }

    /// Sample the heap and classify it. Each call recomputes the tier
    /// from scratch — transitions are never latched.
    pub fn sample(&mut self, heap: &impl HeapPort, now_ms: u64) -> HealthTier {
        let sample = HealthSample::capture(heap, now_ms);
        self.last_sample = Some(sample);
        sample.tier()
    }

    /// Run the bounded cooperative cleanup loop.
    ///
    /// Each pass yields to the scheduler (so deferred reclamation can
    /// run) and feeds the hardware watchdog (so the cleanup itself can
    /// never look like a stall). Returns bytes recovered (after − before)
    /// — may be negative if transient allocation occurred mid-cleanup.
    ///
    /// Blocks the calling context for the duration of the loop; on the
    /// order of tens to a few hundred milliseconds on device.
    pub fn force_cleanup(
        &mut self,
        heap: &mut impl HeapPort,
        watchdog: &mut impl WatchdogPort,
        now_ms: u64,
    ) -> i64 {
        let before = heap.free_bytes() as i64;
        self.cleanup_runs += 1;

        for _ in 0..CLEANUP_MAX_PASSES {
            watchdog.feed();
            heap.reclaim_step();
        }

        let after = heap.free_bytes() as i64;
        let reclaimed = after - before;
        info!("Memory: cleanup #{} reclaimed {} bytes ({} free)", self.cleanup_runs, reclaimed, after);

        let tier_now = self.sample(heap, now_ms);
        if reclaimed < CLEANUP_NOISE_FLOOR_BYTES && tier_now >= HealthTier::Low {
            // Diagnostic only — the tier re-check decides escalation.
            warn!(
                "Memory: cleanup ineffective ({} bytes, tier {})",
                reclaimed, tier_now
            );
        }

        reclaimed
    }

    /// The most recent sample, if any tick has run yet.
    pub fn last_sample(&self) -> Option<HealthSample> {
        self.last_sample
    }

    /// Lifetime count of cleanup runs (diagnostics).
    pub fn cleanup_runs(&self) -> u32 {
        self.cleanup_runs
    }
}
