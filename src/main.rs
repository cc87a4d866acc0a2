//! GateWarden Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative supervision loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter    Esp32Time      │
//! │  (Relay + ring)    (EventSink)    (ConfigStore) (TimePort)     │
//! │  MessagingAdapter  EspHeap        EspSystem     Watchdog       │
//! │  (Messaging)       (HeapPort)     (SystemPort)  (WatchdogPort) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           SupervisorService (pure logic)               │    │
//! │  │  Memory · Connectivity · Ring · Guard · Sequencer      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Loop ordering per iteration is fixed: watchdog feed and health checks
//! (inside `tick`), then command handling, then actuation. The stall
//! detector is calibrated against this order.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use gatewarden::adapters::hardware::HardwareAdapter;
use gatewarden::adapters::heap::EspHeapAdapter;
use gatewarden::adapters::log_sink::LogEventSink;
use gatewarden::adapters::messaging::MessagingAdapter;
use gatewarden::adapters::nvs::NvsAdapter;
use gatewarden::adapters::system::EspSystemAdapter;
use gatewarden::adapters::time::Esp32TimeAdapter;
use gatewarden::app::commands::Command;
use gatewarden::app::ports::{ConfigStorePort, MessagingPort, TimePort};
use gatewarden::app::service::SupervisorService;
use gatewarden::config::DeviceConfig;
use gatewarden::drivers;

/// Supervision loop cadence. The ring debouncer assumes this rough
/// sampling interval.
const LOOP_INTERVAL_MS: u32 = 100;

/// Map inbound free text onto the closed command set. The core never
/// parses strings; this is the dispatch boundary.
fn parse_command(text: &str) -> Option<Command> {
    match text.trim() {
        "/open" | "/gate" => Some(Command::TriggerGate),
        "/status" => Some(Command::Status),
        "/ping" => Some(Command::Ping),
        _ => None,
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  GateWarden v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt; the TWDT
        // resets the device after its timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 2. Load config from NVS (defaulted + rewritten if bad) ─
    let mut nvs = NvsAdapter::new()
        .map_err(|e| anyhow::anyhow!("NVS init failed: {e}"))?;
    let stored = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            DeviceConfig::default()
        }
    };
    let stored_valid = stored.validate().is_ok();
    let config = stored.sanitised();
    if !stored_valid {
        if let Err(e) = nvs.save(&config) {
            warn!("Config rewrite failed ({}), continuing unpersisted", e);
        }
    }

    // ── 3. Construct adapters ─────────────────────────────────
    let mut watchdog = drivers::watchdog::Watchdog::new(config.watchdog_timeout_secs);
    let mut heap = EspHeapAdapter::new();
    let mut time = Esp32TimeAdapter::new();
    let mut hw = HardwareAdapter::new();
    let mut messaging = MessagingAdapter::new();
    let mut system = EspSystemAdapter::new();
    let mut sink = LogEventSink::new();

    // ── 4. Construct the supervisor service ───────────────────
    let boot_ms = time.now_ms();
    let mut svc = SupervisorService::new(config, boot_ms);

    info!("System ready. Entering supervision loop.");

    // ── 5. Supervision loop ───────────────────────────────────
    loop {
        let now = time.now_ms();
        let ring_raw = hw.read_ring_raw();

        if let Some(reason) =
            svc.tick(now, ring_raw, &mut heap, &mut watchdog, &mut messaging, &mut sink)
        {
            // Fatal by design: persist once, notify best-effort, restart.
            svc.execute_restart(reason, now, &mut nvs, &mut messaging, &mut time, &mut system);
        }

        if svc.is_connected() {
            for msg in messaging.poll_updates() {
                let Some(cmd) = parse_command(msg.text.as_str()) else {
                    warn!("Unrecognised command from {}", msg.display_name);
                    continue;
                };
                info!("Command from {}: {:?}", msg.display_name, cmd);
                let now = time.now_ms();
                svc.handle_command(
                    cmd,
                    msg.sender_id,
                    now,
                    &mut heap,
                    &mut watchdog,
                    &mut hw,
                    &mut time,
                    &mut messaging,
                    &mut sink,
                );
            }
        }

        time.delay_ms(LOOP_INTERVAL_MS);
    }
}
