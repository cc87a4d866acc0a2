//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API so the device hard-resets if the main loop
//! stops feeding it. The timeout comes from
//! [`DeviceConfig::watchdog_timeout_secs`](crate::config::DeviceConfig);
//! the software stall detector in the supervisor is calibrated well below
//! it, so the TWDT only fires if the supervisor itself is wedged.
//!
//! The main loop must call `feed()` on every tick.

use crate::app::ports::WatchdogPort;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_secs: u16) -> Self {
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: u32::from(timeout_secs) * 1_000,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!(
                    "TWDT reconfigure returned {} (may already be configured)",
                    ret
                );
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK;
            if subscribed {
                info!(
                    "Watchdog: subscribed ({}s timeout, panic on trigger)",
                    timeout_secs
                );
            } else {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
            }

            Self { subscribed }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_secs: u16) -> Self {
        log::info!("Watchdog(sim): no-op ({}s timeout)", timeout_secs);
        Self {}
    }
}

impl WatchdogPort for Watchdog {
    fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
