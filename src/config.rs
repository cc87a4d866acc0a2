//! Persisted device configuration.
//!
//! All tunable parameters for the GateWarden controller. The record is
//! loaded once at boot from NVS, validated against the hard bounds below,
//! and defaulted + rewritten if absent or invalid. It is rewritten as a
//! whole record: readers never observe a partial-field update.
//!
//! Mutation paths: the restart bookkeeping in the supervisor service
//! (reboot count, uptime minutes) and the settings UI collaborator
//! (user edits, out of scope here).

use serde::{Deserialize, Serialize};

/// Validation bounds, hard-coded by design — a corrupted or hostile
/// settings channel must not be able to persist dangerous pulse widths.
pub const GATE_PULSE_MS_RANGE: core::ops::RangeInclusive<u32> = 100..=10_000;
pub const AUX_PULSE_MS_RANGE: core::ops::RangeInclusive<u32> = 50..=5_000;
pub const RING_THRESHOLD_RANGE: core::ops::RangeInclusive<u16> = 1..=4_095;
pub const RING_DEBOUNCE_MS_RANGE: core::ops::RangeInclusive<u32> = 500..=60_000;
pub const WATCHDOG_TIMEOUT_SECS_RANGE: core::ops::RangeInclusive<u16> = 5..=120;

/// Core device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Actuators ---
    /// Gate relay pulse width (milliseconds).
    pub gate_pulse_ms: u32,
    /// Auxiliary lock-release relay pulse width (milliseconds).
    pub aux_pulse_ms: u32,

    // --- Ring sensor ---
    /// ADC threshold below which the ring line is considered active.
    pub ring_threshold: u16,
    /// Minimum gap between two recognised ring events (milliseconds).
    pub ring_debounce_ms: u32,

    // --- Supervision ---
    /// Hardware task-watchdog timeout (seconds).
    pub watchdog_timeout_secs: u16,

    // --- Bookkeeping (written by the supervisor before restart) ---
    /// Lifetime count of deliberate restarts.
    pub reboot_count: u32,
    /// Uptime of the previous session, in whole minutes.
    pub last_uptime_minutes: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            gate_pulse_ms: 2_000,
            aux_pulse_ms: 600,
            ring_threshold: 200,
            ring_debounce_ms: 5_000,
            watchdog_timeout_secs: 15,
            reboot_count: 0,
            last_uptime_minutes: 0,
        }
    }
}

impl DeviceConfig {
    /// Range-check every tunable field.
    ///
    /// The bookkeeping counters (`reboot_count`, `last_uptime_minutes`)
    /// are unconstrained — any historical value is valid.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !GATE_PULSE_MS_RANGE.contains(&self.gate_pulse_ms) {
            return Err("gate_pulse_ms must be 100–10000");
        }
        if !AUX_PULSE_MS_RANGE.contains(&self.aux_pulse_ms) {
            return Err("aux_pulse_ms must be 50–5000");
        }
        if !RING_THRESHOLD_RANGE.contains(&self.ring_threshold) {
            return Err("ring_threshold must be 1–4095");
        }
        if !RING_DEBOUNCE_MS_RANGE.contains(&self.ring_debounce_ms) {
            return Err("ring_debounce_ms must be 500–60000");
        }
        if !WATCHDOG_TIMEOUT_SECS_RANGE.contains(&self.watchdog_timeout_secs) {
            return Err("watchdog_timeout_secs must be 5–120");
        }
        Ok(())
    }

    /// Sanitise a freshly loaded record: an out-of-bounds config is
    /// replaced wholesale with defaults, preserving only the bookkeeping
    /// counters (they are diagnostic history, not operating parameters).
    pub fn sanitised(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(reason) => {
                log::warn!("Config: stored record invalid ({reason}), rewriting defaults");
                Self {
                    reboot_count: self.reboot_count,
                    last_uptime_minutes: self.last_uptime_minutes,
                    ..Self::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DeviceConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_gate_pulse_out_of_range() {
        let cfg = DeviceConfig {
            gate_pulse_ms: 50,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = DeviceConfig {
            gate_pulse_ms: 20_000,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_ring_threshold() {
        let cfg = DeviceConfig {
            ring_threshold: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn sanitise_preserves_bookkeeping() {
        let cfg = DeviceConfig {
            gate_pulse_ms: 0, // invalid
            reboot_count: 17,
            last_uptime_minutes: 4_321,
            ..Default::default()
        };
        let clean = cfg.sanitised();
        assert!(clean.validate().is_ok());
        assert_eq!(clean.reboot_count, 17);
        assert_eq!(clean.last_uptime_minutes, 4_321);
        assert_eq!(clean.gate_pulse_ms, DeviceConfig::default().gate_pulse_ms);
    }

    #[test]
    fn sanitise_keeps_valid_config_untouched() {
        let cfg = DeviceConfig {
            gate_pulse_ms: 3_500,
            aux_pulse_ms: 250,
            ..Default::default()
        };
        let clean = cfg.clone().sanitised();
        assert_eq!(clean.gate_pulse_ms, 3_500);
        assert_eq!(clean.aux_pulse_ms, 250);
    }

    #[test]
    fn serde_roundtrip() {
        let c = DeviceConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.gate_pulse_ms, c2.gate_pulse_ms);
        assert_eq!(c.ring_threshold, c2.ring_threshold);
        assert_eq!(c.watchdog_timeout_secs, c2.watchdog_timeout_secs);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = DeviceConfig {
            reboot_count: 9,
            last_uptime_minutes: 123,
            ..Default::default()
        };
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: DeviceConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.reboot_count, c2.reboot_count);
        assert_eq!(c.last_uptime_minutes, c2.last_uptime_minutes);
        assert_eq!(c.ring_debounce_ms, c2.ring_debounce_ms);
    }
}
