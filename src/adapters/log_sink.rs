//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future remote-telemetry adapter would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::RingDetected(e) => {
                info!("RING  | raw={} t={}ms", e.raw, e.at_ms);
            }
            AppEvent::TierChanged { from, to } => {
                info!("TIER  | {} -> {}", from, to);
            }
            AppEvent::SequenceFinished(outcome) => {
                info!("GATE  | sequence {:?}", outcome);
            }
            AppEvent::ConnectivityChanged(state) => {
                info!("LINK  | {:?}", state);
            }
            AppEvent::RestartPending(reason) => {
                info!("FATAL | restart pending: {}", reason);
            }
        }
    }
}
