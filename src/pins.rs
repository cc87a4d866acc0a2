//! GPIO / peripheral pin assignments for the GateWarden main board.
//!
//! Single source of truth — every adapter references this module rather
//! than hard-coding pin numbers. Change a pin here and it propagates
//! everywhere.

// ---------------------------------------------------------------------------
// Relay outputs (opto-isolated relay board, active HIGH)
// ---------------------------------------------------------------------------

/// Gate motor trigger relay.
pub const GATE_RELAY_GPIO: i32 = 4;
/// Auxiliary lock-release relay.
pub const AUX_RELAY_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Ring sensor — analog (ADC1)
// ---------------------------------------------------------------------------

/// Doorbell ring line via resistive divider. Active-low: a press pulls
/// the reading below the configured threshold.
/// ADC1 channel 5 (GPIO 6 on ESP32-S3).
pub const RING_ADC_GPIO: i32 = 6;
/// ADC attenuation for the ring line (11 dB → 0 – 3.1 V range).
pub const RING_ADC_ATTEN: u32 = 3; // esp_idf_hal::adc::attenuation::DB_11

// ---------------------------------------------------------------------------
// UART debug
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;
