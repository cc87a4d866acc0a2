//! Remote-service connectivity tracking.
//!
//! Tracks whether the messaging service is reachable, drives reconnect
//! attempts at a constant interval (deliberately no exponential backoff —
//! the device is the only client of its own link, so a fixed cadence is
//! both simpler and bounded), and selects the transport endpoint on first
//! use.
//!
//! ## State machine
//!
//! ```text
//!   DISCONNECTED ──(probe ok + liveness ok)──▶ CONNECTED
//!   CONNECTED ──(I/O failure, or silence + failed probe)──▶ DISCONNECTED
//! ```
//!
//! The endpoint selection (candidate ports probed in order, first
//! accepted connection wins) is cached for the device's uptime. Automatic
//! re-probe is a policy decision left to the administrative surface — the
//! cache is only bypassed by restarting the device.

use log::{info, warn};

use crate::app::ports::MessagingPort;

/// Messaging service host. The port list below is probed against it in
/// order on first connect.
pub const RELAY_HOST: &str = "relay.gatewarden.io";
/// Candidate transport ports, preferred first.
pub const CANDIDATE_PORTS: &[u16] = &[443, 8443, 88, 80];
/// Per-candidate probe timeout.
pub const PROBE_TIMEOUT_MS: u32 = 3_000;

/// Fixed gap between reconnect attempts while disconnected.
pub const RECONNECT_INTERVAL_MS: u64 = 30_000;
/// Silence ceiling: connected but no traffic for this long triggers a
/// liveness probe.
pub const SILENCE_CEILING_MS: u64 = 300_000;

/// Link state. Two states only — "connecting" is not observable from the
/// cooperative loop's point of view, since attempts run to completion
/// within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// Connectivity record. Mutated exclusively here; read by the watchdog
/// supervisor and the status surface.
pub struct ConnectivityState {
    state: LinkState,
    last_success_ms: Option<u64>,
    last_activity_ms: Option<u64>,
    last_attempt_ms: Option<u64>,
    /// Diagnostic only — the reconnect interval is constant.
    reconnect_attempts: u32,
    selected_port: Option<u16>,
}

impl ConnectivityState {
    pub fn new() -> Self {
        Self {
            state: LinkState::Disconnected,
            last_success_ms: None,
            last_activity_ms: None,
            last_attempt_ms: None,
            reconnect_attempts: 0,
            selected_port: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Record a successful application-level round-trip.
    pub fn mark_success(&mut self, now_ms: u64) {
        if self.state != LinkState::Connected {
            info!(
                "Conn: CONNECTED (after {} attempts, port {:?})",
                self.reconnect_attempts, self.selected_port
            );
        }
        self.state = LinkState::Connected;
        self.last_success_ms = Some(now_ms);
        self.last_activity_ms = Some(now_ms);
        self.reconnect_attempts = 0;
    }

    /// Record an explicit I/O failure from the messaging collaborator.
    pub fn mark_failure(&mut self) {
        if self.state == LinkState::Connected {
            warn!("Conn: I/O failure, DISCONNECTED");
        }
        self.state = LinkState::Disconnected;
    }

    /// Record inbound/outbound traffic (resets the silence clock).
    pub fn mark_activity(&mut self, now_ms: u64) {
        self.last_activity_ms = Some(now_ms);
    }

    /// Gate reconnection to at most once per fixed interval while
    /// disconnected.
    pub fn should_attempt_reconnect(&self, now_ms: u64) -> bool {
        if self.state == LinkState::Connected {
            return false;
        }
        match self.last_attempt_ms {
            None => true,
            Some(t) => now_ms.saturating_sub(t) >= RECONNECT_INTERVAL_MS,
        }
    }

    /// Attempt a full reconnect: endpoint selection (cached), transport
    /// probe, then application-level liveness. Returns the new connected
    /// flag.
    pub fn try_connect(&mut self, transport: &mut impl MessagingPort, now_ms: u64) -> bool {
        self.last_attempt_ms = Some(now_ms);
        self.reconnect_attempts += 1;

        let Some(port) = self.select_endpoint(transport) else {
            warn!(
                "Conn: no endpoint reachable (attempt {})",
                self.reconnect_attempts
            );
            self.state = LinkState::Disconnected;
            return false;
        };

        if !transport.probe(RELAY_HOST, port, PROBE_TIMEOUT_MS) {
            warn!(
                "Conn: probe to {}:{} failed (attempt {})",
                RELAY_HOST, port, self.reconnect_attempts
            );
            self.state = LinkState::Disconnected;
            return false;
        }

        if !transport.liveness_check() {
            warn!("Conn: transport up but liveness failed");
            self.state = LinkState::Disconnected;
            return false;
        }

        self.mark_success(now_ms);
        true
    }

    /// Connected-but-silent check: past the silence ceiling, run a
    /// liveness probe; demote to DISCONNECTED on failure. Returns `true`
    /// if the link was demoted. Never a restart trigger by itself.
    pub fn check_silence(&mut self, transport: &mut impl MessagingPort, now_ms: u64) -> bool {
        if self.state != LinkState::Connected {
            return false;
        }
        let silent_ms = self
            .last_activity_ms
            .map_or(u64::MAX, |t| now_ms.saturating_sub(t));
        if silent_ms <= SILENCE_CEILING_MS {
            return false;
        }
        info!("Conn: silent for {}ms, probing liveness", silent_ms);
        if transport.liveness_check() {
            self.mark_activity(now_ms);
            false
        } else {
            warn!("Conn: liveness failed after silence, DISCONNECTED");
            self.state = LinkState::Disconnected;
            true
        }
    }

    /// Probe the candidate port list in order and cache the first that
    /// accepts a transport connection. Subsequent calls return the cache.
    pub fn select_endpoint(&mut self, transport: &mut impl MessagingPort) -> Option<u16> {
        if let Some(port) = self.selected_port {
            return Some(port);
        }
        for &port in CANDIDATE_PORTS {
            if transport.probe(RELAY_HOST, port, PROBE_TIMEOUT_MS) {
                info!("Conn: selected endpoint {}:{}", RELAY_HOST, port);
                self.selected_port = Some(port);
                return Some(port);
            }
        }
        None
    }

    // ── Diagnostics ───────────────────────────────────────────

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn selected_port(&self) -> Option<u16> {
        self.selected_port
    }

    pub fn last_activity_ms(&self) -> Option<u64> {
        self.last_activity_ms
    }

    pub fn last_success_ms(&self) -> Option<u64> {
        self.last_success_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::InboundMessage;

    /// Scriptable transport: per-port probe outcomes plus a liveness flag.
    struct FakeTransport {
        open_ports: Vec<u16>,
        alive: bool,
        probes: Vec<u16>,
    }

    impl FakeTransport {
        fn new(open_ports: &[u16], alive: bool) -> Self {
            Self {
                open_ports: open_ports.to_vec(),
                alive,
                probes: Vec::new(),
            }
        }
    }

    impl MessagingPort for FakeTransport {
        fn send_message(&mut self, _target: i64, _text: &str) -> bool {
            self.alive
        }
        fn send_message_with_keyboard(
            &mut self,
            _target: i64,
            _text: &str,
            _keyboard: &[&[&str]],
        ) -> bool {
            self.alive
        }
        fn poll_updates(&mut self) -> heapless::Vec<InboundMessage, 4> {
            heapless::Vec::new()
        }
        fn probe(&mut self, _host: &str, port: u16, _timeout_ms: u32) -> bool {
            self.probes.push(port);
            self.open_ports.contains(&port)
        }
        fn liveness_check(&mut self) -> bool {
            self.alive
        }
    }

    #[test]
    fn starts_disconnected() {
        let c = ConnectivityState::new();
        assert!(!c.is_connected());
        assert!(c.should_attempt_reconnect(0));
    }

    #[test]
    fn endpoint_selection_prefers_first_open_port() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[8443, 80], true);
        assert_eq!(c.select_endpoint(&mut t), Some(8443));
        // 443 probed and skipped, 8443 accepted.
        assert_eq!(t.probes, vec![443, 8443]);
    }

    #[test]
    fn endpoint_selection_is_cached() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[443], true);
        assert_eq!(c.select_endpoint(&mut t), Some(443));
        let probes_after_first = t.probes.len();
        assert_eq!(c.select_endpoint(&mut t), Some(443));
        assert_eq!(t.probes.len(), probes_after_first, "cache hit, no re-probe");
    }

    #[test]
    fn connect_requires_liveness_not_just_transport() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[443], false);
        assert!(!c.try_connect(&mut t, 0));
        assert!(!c.is_connected());

        t.alive = true;
        assert!(c.try_connect(&mut t, RECONNECT_INTERVAL_MS));
        assert!(c.is_connected());
        assert_eq!(c.reconnect_attempts(), 0, "reset on success");
    }

    #[test]
    fn reconnect_interval_is_constant() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[], true);
        assert!(c.should_attempt_reconnect(0));
        assert!(!c.try_connect(&mut t, 0));

        assert!(!c.should_attempt_reconnect(RECONNECT_INTERVAL_MS - 1));
        assert!(c.should_attempt_reconnect(RECONNECT_INTERVAL_MS));
        assert!(!c.try_connect(&mut t, RECONNECT_INTERVAL_MS));
        assert_eq!(c.reconnect_attempts(), 2);
        // Interval stays fixed: next attempt allowed one interval later,
        // not exponentially later.
        assert!(c.should_attempt_reconnect(2 * RECONNECT_INTERVAL_MS));
    }

    #[test]
    fn failure_disconnects() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[443], true);
        assert!(c.try_connect(&mut t, 0));
        c.mark_failure();
        assert!(!c.is_connected());
    }

    #[test]
    fn reconnect_after_failure_keeps_cached_endpoint() {
        // The endpoint cache survives a link failure: reconnecting probes
        // the cached port only, never the full candidate sweep. Only a
        // device restart produces a fresh sweep.
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[8443], true);
        assert!(c.try_connect(&mut t, 0));
        assert_eq!(c.selected_port(), Some(8443));

        c.mark_failure();
        t.probes.clear();
        assert!(c.try_connect(&mut t, RECONNECT_INTERVAL_MS));
        assert_eq!(t.probes, vec![8443], "cached port only, no sweep");
        assert_eq!(c.selected_port(), Some(8443));
    }

    #[test]
    fn silence_with_live_service_stays_connected() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[443], true);
        assert!(c.try_connect(&mut t, 0));
        let demoted = c.check_silence(&mut t, SILENCE_CEILING_MS + 1_000);
        assert!(!demoted);
        assert!(c.is_connected());
        // Successful probe restamps activity.
        assert_eq!(c.last_activity_ms(), Some(SILENCE_CEILING_MS + 1_000));
    }

    #[test]
    fn silence_with_dead_service_demotes() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[443], true);
        assert!(c.try_connect(&mut t, 0));
        t.alive = false;
        let demoted = c.check_silence(&mut t, SILENCE_CEILING_MS + 1_000);
        assert!(demoted);
        assert!(!c.is_connected());
    }

    #[test]
    fn recent_activity_skips_probe() {
        let mut c = ConnectivityState::new();
        let mut t = FakeTransport::new(&[443], true);
        assert!(c.try_connect(&mut t, 0));
        c.mark_activity(10_000);
        let probes_before = t.probes.len();
        assert!(!c.check_silence(&mut t, 10_000 + SILENCE_CEILING_MS / 2));
        assert_eq!(t.probes.len(), probes_before);
    }
}
