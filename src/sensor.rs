//! Ring sensor debouncer.
//!
//! Turns the noisy analog doorbell line into a debounced, edge-triggered
//! ring event. Must be sampled at a roughly fixed cadence from the main
//! loop (tick-driven, not event-driven).
//!
//! The line is active-low: a press pulls the ADC reading *below* the
//! configured threshold. An event fires only on a rising edge of the
//! active flag, and only when the debounce window since the last emitted
//! event has elapsed.
//!
//! The edge flag updates unconditionally on every sample, including when
//! the window suppresses the event. A sustained press that re-crosses the
//! window boundary therefore stays suppressed without the signal having
//! to drop first. A value oscillating faster than one tick can still
//! double-trigger only if it also spans the window twice — accepted
//! tradeoff of simplicity over an exact Schmitt trigger.

use log::info;

/// A recognised ring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingEvent {
    /// Raw ADC value at the triggering sample.
    pub raw: u16,
    /// Monotonic timestamp of the event.
    pub at_ms: u64,
}

/// Debounce state for the ring line. Owned exclusively by the supervisor
/// service; mutated once per tick.
pub struct RingDebouncer {
    threshold: u16,
    debounce_window_ms: u32,
    last_raw: u16,
    last_edge_state: bool,
    last_event_ms: Option<u64>,
}

impl RingDebouncer {
    pub fn new(threshold: u16, debounce_window_ms: u32) -> Self {
        Self {
            threshold,
            debounce_window_ms,
            last_raw: u16::MAX,
            last_edge_state: false,
            last_event_ms: None,
        }
    }

    /// Feed one raw sample. Total over the numeric domain — never fails.
    pub fn sample(&mut self, raw: u16, now_ms: u64) -> Option<RingEvent> {
        let active = raw < self.threshold;
        let rising = active && !self.last_edge_state;

        // Unconditional update: the edge is recorded even when the
        // debounce window suppresses the event below.
        self.last_edge_state = active;
        self.last_raw = raw;

        if !rising {
            return None;
        }

        let within_window = self
            .last_event_ms
            .is_some_and(|t| now_ms.saturating_sub(t) <= self.debounce_window_ms as u64);
        if within_window {
            return None;
        }

        self.last_event_ms = Some(now_ms);
        info!("Ring: event (raw={} < {})", raw, self.threshold);
        Some(RingEvent { raw, at_ms: now_ms })
    }

    /// Most recent raw reading (status page).
    pub fn last_raw(&self) -> u16 {
        self.last_raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_press_fires() {
        let mut d = RingDebouncer::new(200, 5_000);
        assert!(d.sample(150, 1_000).is_some());
    }

    #[test]
    fn idle_line_never_fires() {
        let mut d = RingDebouncer::new(200, 5_000);
        for t in 0..100u64 {
            assert!(d.sample(900, t * 100).is_none());
        }
    }

    #[test]
    fn sustained_press_fires_once() {
        let mut d = RingDebouncer::new(200, 5_000);
        assert!(d.sample(150, 0).is_some());
        for t in 1..50u64 {
            assert!(d.sample(150, t * 100).is_none(), "no edge while held");
        }
    }

    #[test]
    fn oscillation_within_window_is_suppressed() {
        // First drop fires, then 4s of 150/250 oscillation with a 5s
        // window stays quiet.
        let mut d = RingDebouncer::new(200, 5_000);
        assert!(d.sample(150, 0).is_some());
        let mut t = 0u64;
        while t < 4_000 {
            t += 100;
            let raw = if (t / 100) % 2 == 0 { 150 } else { 250 };
            assert!(d.sample(raw, t).is_none(), "suppressed at t={t}");
        }
    }

    #[test]
    fn refires_after_window_with_fresh_edge() {
        let mut d = RingDebouncer::new(200, 5_000);
        assert!(d.sample(150, 0).is_some());
        // Release, wait past the window, press again.
        assert!(d.sample(900, 2_000).is_none());
        assert!(d.sample(150, 6_000).is_some());
    }

    #[test]
    fn suppressed_edge_does_not_rearm_window() {
        // The window gates on the last *emitted* event, so a suppressed
        // edge inside the window does not push the window forward.
        let mut d = RingDebouncer::new(200, 5_000);
        assert!(d.sample(150, 0).is_some());
        assert!(d.sample(900, 1_000).is_none());
        assert!(d.sample(150, 2_000).is_none()); // suppressed edge
        assert!(d.sample(900, 3_000).is_none());
        assert!(d.sample(150, 5_500).is_some()); // window measured from t=0
    }

    #[test]
    fn threshold_is_strict() {
        let mut d = RingDebouncer::new(200, 1_000);
        assert!(d.sample(200, 0).is_none(), "equal to threshold is inactive");
        assert!(d.sample(199, 100).is_some());
    }
}
