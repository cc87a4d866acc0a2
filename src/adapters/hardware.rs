//! Relay and ring-line hardware adapter.
//!
//! Implements [`RelayPort`] for the two relay outputs and exposes the raw
//! ring ADC reading for the debouncer.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: GPIO writes and ADC1 oneshot reads via `hw_init`.
//! On host/test: relay state is tracked in-struct and the ring reading
//! comes from a static `AtomicU16` for injection.

use log::debug;

use crate::app::ports::RelayPort;
use crate::drivers::hw_init;
use crate::pins;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

/// Idle (unpressed) ring reading on the simulated line.
#[cfg(not(target_os = "espidf"))]
static SIM_RING_ADC: AtomicU16 = AtomicU16::new(3_000);

/// Inject a simulated ring reading (host tests only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_ring_adc(raw: u16) {
    SIM_RING_ADC.store(raw, Ordering::Relaxed);
}

pub struct HardwareAdapter {
    gate_active: bool,
    aux_active: bool,
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareAdapter {
    pub fn new() -> Self {
        Self {
            gate_active: false,
            aux_active: false,
        }
    }

    /// Raw ring ADC reading for the debouncer.
    #[cfg(target_os = "espidf")]
    pub fn read_ring_raw(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_RING)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read_ring_raw(&self) -> u16 {
        SIM_RING_ADC.load(Ordering::Relaxed)
    }

    pub fn gate_active(&self) -> bool {
        self.gate_active
    }

    pub fn aux_active(&self) -> bool {
        self.aux_active
    }
}

impl RelayPort for HardwareAdapter {
    fn set_gate(&mut self, active: bool) {
        self.gate_active = active;
        debug!("Relay: gate {}", if active { "ON" } else { "off" });
        hw_init::gpio_write(pins::GATE_RELAY_GPIO, active);
    }

    fn set_aux(&mut self, active: bool) {
        self.aux_active = active;
        debug!("Relay: aux {}", if active { "ON" } else { "off" });
        hw_init::gpio_write(pins::AUX_RELAY_GPIO, active);
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn relay_state_is_tracked() {
        let mut hw = HardwareAdapter::new();
        assert!(!hw.gate_active());
        hw.set_gate(true);
        assert!(hw.gate_active());
        hw.set_gate(false);
        hw.set_aux(true);
        assert!(!hw.gate_active());
        assert!(hw.aux_active());
    }

    #[test]
    fn sim_ring_reading_is_injectable() {
        let hw = HardwareAdapter::new();
        sim_set_ring_adc(150);
        assert_eq!(hw.read_ring_raw(), 150);
        sim_set_ring_adc(3_000);
    }
}
