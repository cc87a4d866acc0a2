//! Supervisor service — the hexagonal core.
//!
//! [`SupervisorService`] owns the health trackers, the ring debouncer,
//! and the actuation path. It exposes a clean, hardware-agnostic API.
//! All I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!    HeapPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  MessagingPort ◀│       SupervisorService       │
//!                 │  Memory · Conn · Ring · Gate  │
//!    RelayPort ◀──└──────────────────────────────┘
//! ```
//!
//! Per-tick ordering is load-bearing (it is what the stall detector is
//! calibrated against): watchdog feed and health checks first, then
//! reconnection, then ring sampling. Command handling and actuation run
//! from the composition root between ticks.

use log::{error, info, warn};

use crate::actuator::{GateSequencer, SequenceOutcome};
use crate::config::DeviceConfig;
use crate::connectivity::ConnectivityState;
use crate::guard::OpGuard;
use crate::memory::{HealthTier, MemoryMonitor};
use crate::sensor::RingDebouncer;
use crate::supervisor::{RestartReason, WatchdogSupervisor};

use super::commands::Command;
use super::events::{AppEvent, StatusSnapshot};
use super::ports::{
    ConfigStorePort, EventSink, HeapPort, MessagingPort, RelayPort, SystemPort, TimePort,
    WatchdogPort,
};

/// Fixed grace delay between the last-gasp notification attempt and the
/// hard restart, so in-flight log/network writes can drain.
pub const RESTART_GRACE_MS: u32 = 500;

// ───────────────────────────────────────────────────────────────
// SupervisorService
// ───────────────────────────────────────────────────────────────

/// The supervisor service orchestrates the whole resilience kernel.
pub struct SupervisorService {
    config: DeviceConfig,
    monitor: MemoryMonitor,
    connectivity: ConnectivityState,
    debouncer: RingDebouncer,
    guard: OpGuard,
    sequencer: GateSequencer,
    supervisor: WatchdogSupervisor,
    boot_ms: u64,
    last_tier: HealthTier,
    /// Last operator who issued a command; restart and ring notifications
    /// go here. `None` until the first inbound command.
    notify_target: Option<i64>,
}

impl SupervisorService {
    /// Construct the service from a validated configuration.
    ///
    /// Logs the boot bookkeeping carried over from the previous session
    /// (reboot count, uptime of the session that ended in a restart).
    pub fn new(config: DeviceConfig, boot_ms: u64) -> Self {
        info!(
            "Boot #{} (previous session ran {} minutes)",
            config.reboot_count, config.last_uptime_minutes
        );
        let debouncer = RingDebouncer::new(config.ring_threshold, config.ring_debounce_ms);
        Self {
            config,
            monitor: MemoryMonitor::new(),
            connectivity: ConnectivityState::new(),
            debouncer,
            guard: OpGuard::new(),
            sequencer: GateSequencer::new(),
            supervisor: WatchdogSupervisor::new(),
            boot_ms,
            last_tier: HealthTier::Normal,
            notify_target: None,
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One loop iteration: supervision, then reconnection, then the ring
    /// sample. Returns a restart decision the caller must execute via
    /// [`execute_restart`](Self::execute_restart).
    pub fn tick(
        &mut self,
        now_ms: u64,
        ring_raw: u16,
        heap: &mut impl HeapPort,
        watchdog: &mut impl WatchdogPort,
        transport: &mut impl MessagingPort,
        sink: &mut impl EventSink,
    ) -> Option<RestartReason> {
        // 1. Watchdog feed + stall/memory/silence checks.
        if let Some(reason) = self.supervisor.tick(
            now_ms,
            &mut self.monitor,
            &mut self.connectivity,
            heap,
            watchdog,
            transport,
        ) {
            sink.emit(&AppEvent::RestartPending(reason));
            return Some(reason);
        }

        let tier = self
            .monitor
            .last_sample()
            .map_or(HealthTier::Normal, |s| s.tier());
        if tier != self.last_tier {
            sink.emit(&AppEvent::TierChanged {
                from: self.last_tier,
                to: tier,
            });
            self.last_tier = tier;
        }

        // 2. Reconnection at the fixed interval while disconnected.
        if self.connectivity.should_attempt_reconnect(now_ms) {
            let was_connected = self.connectivity.is_connected();
            self.connectivity.try_connect(transport, now_ms);
            if self.connectivity.is_connected() != was_connected {
                sink.emit(&AppEvent::ConnectivityChanged(self.connectivity.state()));
            }
        }

        // 3. Ring sampling (tick-driven, roughly fixed cadence).
        if let Some(event) = self.debouncer.sample(ring_raw, now_ms) {
            sink.emit(&AppEvent::RingDetected(event));
            self.notify_ring(transport, now_ms);
        }

        None
    }

    /// Best-effort operator notification of a ring event.
    fn notify_ring(&mut self, transport: &mut impl MessagingPort, now_ms: u64) {
        let Some(target) = self.notify_target else {
            return;
        };
        if !self.connectivity.is_connected() {
            return;
        }
        if transport.send_message(target, "Ring at the gate") {
            self.connectivity.mark_activity(now_ms);
        } else {
            self.connectivity.mark_failure();
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one operator command from the messaging channel.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        sender_id: i64,
        now_ms: u64,
        heap: &mut impl HeapPort,
        watchdog: &mut impl WatchdogPort,
        relays: &mut impl RelayPort,
        time: &mut impl TimePort,
        transport: &mut impl MessagingPort,
        sink: &mut impl EventSink,
    ) {
        // An inbound command is both traffic and a notification opt-in.
        self.notify_target = Some(sender_id);
        self.connectivity.mark_activity(now_ms);

        match cmd {
            Command::Ping => {
                self.reply(transport, sender_id, "pong", now_ms);
            }
            Command::Status => {
                let snap = self.status_snapshot(now_ms);
                let text = format!(
                    "Memory {} ({} bytes free)\nLink {} (port {:?})\nUp {} min, boot #{}, tick {}\nRing raw {}",
                    snap.tier,
                    snap.free_bytes,
                    if snap.connected { "up" } else { "down" },
                    snap.endpoint_port,
                    snap.uptime_minutes,
                    snap.reboot_count,
                    snap.tick_count,
                    snap.last_ring_raw,
                );
                let keyboard: &[&[&str]] = &[&["/open", "/status"]];
                if transport.send_message_with_keyboard(sender_id, &text, keyboard) {
                    self.connectivity.mark_activity(now_ms);
                } else {
                    self.connectivity.mark_failure();
                }
            }
            Command::TriggerGate => {
                let outcome = self.sequencer.trigger(
                    &self.config,
                    &mut self.guard,
                    &mut self.monitor,
                    heap,
                    watchdog,
                    relays,
                    time,
                );
                sink.emit(&AppEvent::SequenceFinished(outcome));
                let text = match outcome {
                    SequenceOutcome::Complete => "Gate triggered",
                    SequenceOutcome::Partial => {
                        "Gate pulsed; lock release skipped (memory pressure)"
                    }
                };
                self.reply(transport, sender_id, text, time.now_ms());
            }
        }
    }

    fn reply(
        &mut self,
        transport: &mut impl MessagingPort,
        target: i64,
        text: &str,
        now_ms: u64,
    ) {
        if transport.send_message(target, text) {
            self.connectivity.mark_activity(now_ms);
        } else {
            self.connectivity.mark_failure();
        }
    }

    // ── Restart path ──────────────────────────────────────────

    /// Execute a restart decision: persist bookkeeping once, best-effort
    /// notification, grace delay, hard restart. Every step before the
    /// final `restart()` is best-effort — a failed save or send never
    /// blocks recovery.
    pub fn execute_restart(
        &mut self,
        reason: RestartReason,
        now_ms: u64,
        store: &mut impl ConfigStorePort,
        transport: &mut impl MessagingPort,
        time: &mut impl TimePort,
        system: &mut impl SystemPort,
    ) {
        error!("Restarting: {}", reason);

        // Compute the whole record, then persist exactly once.
        self.config.reboot_count = self.config.reboot_count.saturating_add(1);
        self.config.last_uptime_minutes = self.uptime_minutes(now_ms);
        if let Err(e) = store.save(&self.config) {
            warn!("Pre-restart config save failed: {}", e);
        }

        if self.connectivity.is_connected() {
            if let Some(target) = self.notify_target {
                // Send carries its own hard timeout; result is ignored.
                let text = format!("Device restarting: {}", reason);
                let _ = transport.send_message(target, &text);
            }
        }

        time.delay_ms(RESTART_GRACE_MS);
        system.restart();
    }

    // ── Queries ───────────────────────────────────────────────

    /// Assemble the current status snapshot.
    pub fn status_snapshot(&self, now_ms: u64) -> StatusSnapshot {
        let sample = self.monitor.last_sample();
        StatusSnapshot {
            tier: sample.map_or(HealthTier::Normal, |s| s.tier()).as_str(),
            free_bytes: sample.map_or(0, |s| s.free_bytes),
            connected: self.connectivity.is_connected(),
            endpoint_port: self.connectivity.selected_port(),
            uptime_minutes: self.uptime_minutes(now_ms),
            reboot_count: self.config.reboot_count,
            tick_count: self.supervisor.tick_count(),
            last_ring_raw: self.debouncer.last_raw(),
        }
    }

    /// Whole minutes since boot.
    pub fn uptime_minutes(&self, now_ms: u64) -> u32 {
        (now_ms.saturating_sub(self.boot_ms) / 60_000) as u32
    }

    pub fn is_connected(&self) -> bool {
        self.connectivity.is_connected()
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> DeviceConfig {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{ConfigError, InboundMessage};
    use crate::connectivity::RECONNECT_INTERVAL_MS;

    struct FakeHeap {
        free: u32,
    }
    impl HeapPort for FakeHeap {
        fn free_bytes(&self) -> u32 {
            self.free
        }
        fn largest_block_bytes(&self) -> u32 {
            self.free
        }
        fn reclaim_step(&mut self) {}
    }

    struct FakeWatchdog;
    impl WatchdogPort for FakeWatchdog {
        fn feed(&mut self) {}
    }

    struct FakeRelays {
        gate_pulses: u32,
        aux_pulses: u32,
    }
    impl RelayPort for FakeRelays {
        fn set_gate(&mut self, active: bool) {
            if active {
                self.gate_pulses += 1;
            }
        }
        fn set_aux(&mut self, active: bool) {
            if active {
                self.aux_pulses += 1;
            }
        }
    }

    struct FakeTime {
        now: u64,
        delays: Vec<u32>,
    }
    impl TimePort for FakeTime {
        fn now_ms(&self) -> u64 {
            self.now
        }
        fn delay_ms(&mut self, ms: u32) {
            self.now += ms as u64;
            self.delays.push(ms);
        }
    }

    struct FakeTransport {
        alive: bool,
        sent: Vec<(i64, String)>,
    }
    impl FakeTransport {
        fn new(alive: bool) -> Self {
            Self {
                alive,
                sent: Vec::new(),
            }
        }
    }
    impl MessagingPort for FakeTransport {
        fn send_message(&mut self, target: i64, text: &str) -> bool {
            if self.alive {
                self.sent.push((target, text.to_string()));
            }
            self.alive
        }
        fn send_message_with_keyboard(&mut self, target: i64, text: &str, _k: &[&[&str]]) -> bool {
            self.send_message(target, text)
        }
        fn poll_updates(&mut self) -> heapless::Vec<InboundMessage, 4> {
            heapless::Vec::new()
        }
        fn probe(&mut self, _h: &str, _p: u16, _ms: u32) -> bool {
            self.alive
        }
        fn liveness_check(&mut self) -> bool {
            self.alive
        }
    }

    struct FakeStore {
        saved: Vec<DeviceConfig>,
        fail: bool,
    }
    impl ConfigStorePort for FakeStore {
        fn load(&self) -> Result<DeviceConfig, ConfigError> {
            Ok(DeviceConfig::default())
        }
        fn save(&mut self, config: &DeviceConfig) -> Result<(), ConfigError> {
            if self.fail {
                return Err(ConfigError::IoError);
            }
            self.saved.push(config.clone());
            Ok(())
        }
    }

    struct FakeSystem {
        restarted: bool,
    }
    impl SystemPort for FakeSystem {
        fn restart(&mut self) {
            self.restarted = true;
        }
    }

    #[derive(Default)]
    struct VecSink(Vec<AppEvent>);
    impl EventSink for VecSink {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(*event);
        }
    }

    const IDLE_RAW: u16 = 900;

    fn service() -> SupervisorService {
        SupervisorService::new(DeviceConfig::default(), 0)
    }

    #[test]
    fn healthy_tick_is_quiet_after_connect() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();

        // First tick connects (initial reconnect attempt is immediate).
        assert!(
            svc.tick(0, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink)
                .is_none()
        );
        assert!(svc.is_connected());
        assert!(matches!(sink.0[..], [AppEvent::ConnectivityChanged(_)]));

        sink.0.clear();
        assert!(
            svc.tick(1_000, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink)
                .is_none()
        );
        assert!(sink.0.is_empty(), "steady state emits nothing");
    }

    #[test]
    fn failed_connect_retries_on_interval() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(false);
        let mut sink = VecSink::default();

        svc.tick(0, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        assert!(!svc.is_connected());

        tr.alive = true;
        // Within the interval: no attempt, still disconnected.
        svc.tick(5_000, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        assert!(!svc.is_connected());
        // Past the interval: reconnects.
        svc.tick(
            RECONNECT_INTERVAL_MS + 1,
            IDLE_RAW,
            &mut heap,
            &mut FakeWatchdog,
            &mut tr,
            &mut sink,
        );
        assert!(svc.is_connected());
    }

    #[test]
    fn tier_change_is_emitted_once() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();

        svc.tick(0, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        heap.free = 16_000;
        sink.0.clear();
        svc.tick(1_000, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        assert!(matches!(
            sink.0[..],
            [AppEvent::TierChanged {
                from: HealthTier::Normal,
                to: HealthTier::Low,
            }]
        ));
        sink.0.clear();
        svc.tick(2_000, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        assert!(sink.0.is_empty(), "unchanged tier is not re-emitted");
    }

    #[test]
    fn ring_event_notifies_the_operator() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();

        svc.tick(0, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        // Operator registers by issuing a command first.
        let mut relays = FakeRelays {
            gate_pulses: 0,
            aux_pulses: 0,
        };
        let mut time = FakeTime {
            now: 100,
            delays: Vec::new(),
        };
        svc.handle_command(
            Command::Ping,
            42,
            100,
            &mut heap,
            &mut FakeWatchdog,
            &mut relays,
            &mut time,
            &mut tr,
            &mut sink,
        );
        tr.sent.clear();
        sink.0.clear();

        svc.tick(1_000, 150, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        assert!(matches!(sink.0[..], [AppEvent::RingDetected(_)]));
        assert_eq!(tr.sent.len(), 1);
        assert_eq!(tr.sent[0].0, 42);
    }

    #[test]
    fn restart_decision_emits_pending_event() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 8_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();

        let decision = svc.tick(0, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        assert!(matches!(
            decision,
            Some(RestartReason::MemoryEmergency { .. })
        ));
        assert!(matches!(sink.0[..], [AppEvent::RestartPending(_)]));
    }

    #[test]
    fn ping_gets_a_pong() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();
        let mut relays = FakeRelays {
            gate_pulses: 0,
            aux_pulses: 0,
        };
        let mut time = FakeTime {
            now: 0,
            delays: Vec::new(),
        };

        svc.handle_command(
            Command::Ping,
            7,
            0,
            &mut heap,
            &mut FakeWatchdog,
            &mut relays,
            &mut time,
            &mut tr,
            &mut sink,
        );
        assert_eq!(tr.sent, vec![(7, "pong".to_string())]);
    }

    #[test]
    fn trigger_gate_pulses_both_lines_and_replies() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();
        let mut relays = FakeRelays {
            gate_pulses: 0,
            aux_pulses: 0,
        };
        let mut time = FakeTime {
            now: 0,
            delays: Vec::new(),
        };

        svc.handle_command(
            Command::TriggerGate,
            7,
            0,
            &mut heap,
            &mut FakeWatchdog,
            &mut relays,
            &mut time,
            &mut tr,
            &mut sink,
        );
        assert_eq!(relays.gate_pulses, 1);
        assert_eq!(relays.aux_pulses, 1);
        assert!(matches!(
            sink.0[..],
            [AppEvent::SequenceFinished(SequenceOutcome::Complete)]
        ));
        assert_eq!(tr.sent.last().unwrap().1, "Gate triggered");
    }

    #[test]
    fn trigger_gate_under_pressure_reports_partial() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 13_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();
        let mut relays = FakeRelays {
            gate_pulses: 0,
            aux_pulses: 0,
        };
        let mut time = FakeTime {
            now: 0,
            delays: Vec::new(),
        };

        svc.handle_command(
            Command::TriggerGate,
            7,
            0,
            &mut heap,
            &mut FakeWatchdog,
            &mut relays,
            &mut time,
            &mut tr,
            &mut sink,
        );
        assert_eq!(relays.gate_pulses, 1);
        assert_eq!(relays.aux_pulses, 0, "aux skipped under pressure");
        assert!(matches!(
            sink.0[..],
            [AppEvent::SequenceFinished(SequenceOutcome::Partial)]
        ));
    }

    #[test]
    fn restart_persists_once_notifies_and_restarts() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();
        let mut store = FakeStore {
            saved: Vec::new(),
            fail: false,
        };
        let mut system = FakeSystem { restarted: false };
        let mut time = FakeTime {
            now: 120_000,
            delays: Vec::new(),
        };
        let mut relays = FakeRelays {
            gate_pulses: 0,
            aux_pulses: 0,
        };

        // Connect and register an operator.
        svc.tick(0, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        svc.handle_command(
            Command::Ping,
            7,
            0,
            &mut heap,
            &mut FakeWatchdog,
            &mut relays,
            &mut time,
            &mut tr,
            &mut sink,
        );
        tr.sent.clear();

        svc.execute_restart(
            RestartReason::LoopStall { gap_ms: 60_000 },
            120_000,
            &mut store,
            &mut tr,
            &mut time,
            &mut system,
        );

        assert_eq!(store.saved.len(), 1, "single whole-record write");
        assert_eq!(store.saved[0].reboot_count, 1);
        assert_eq!(store.saved[0].last_uptime_minutes, 2);
        assert_eq!(tr.sent.len(), 1, "last-gasp notification sent");
        assert_eq!(time.delays.last(), Some(&RESTART_GRACE_MS));
        assert!(system.restarted);
    }

    #[test]
    fn restart_proceeds_when_save_and_send_fail() {
        let mut svc = service();
        let mut tr = FakeTransport::new(false);
        let mut store = FakeStore {
            saved: Vec::new(),
            fail: true,
        };
        let mut system = FakeSystem { restarted: false };
        let mut time = FakeTime {
            now: 0,
            delays: Vec::new(),
        };

        svc.execute_restart(
            RestartReason::MemoryEmergency { free_bytes: 8_000 },
            60_000,
            &mut store,
            &mut tr,
            &mut time,
            &mut system,
        );
        assert!(system.restarted, "notification is strictly best-effort");
    }

    #[test]
    fn status_snapshot_reflects_state() {
        let mut svc = service();
        let mut heap = FakeHeap { free: 60_000 };
        let mut tr = FakeTransport::new(true);
        let mut sink = VecSink::default();

        svc.tick(0, IDLE_RAW, &mut heap, &mut FakeWatchdog, &mut tr, &mut sink);
        let snap = svc.status_snapshot(180_000);
        assert_eq!(snap.tier, "NORMAL");
        assert_eq!(snap.free_bytes, 60_000);
        assert!(snap.connected);
        assert_eq!(snap.endpoint_port, Some(443));
        assert_eq!(snap.uptime_minutes, 3);
        assert_eq!(snap.tick_count, 1);
    }
}
