//! System control adapter.
//!
//! Implements [`SystemPort`]: on device, `restart()` is `esp_restart()`
//! and never returns. The simulation backend records the call so the
//! restart path is testable end to end.

use crate::app::ports::SystemPort;

pub struct EspSystemAdapter {
    #[cfg(not(target_os = "espidf"))]
    restart_requested: bool,
}

impl Default for EspSystemAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EspSystemAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            restart_requested: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }
}

impl SystemPort for EspSystemAdapter {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        // Diverges: the bootloader reinitialises everything from
        // persisted configuration.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        log::error!("System(sim): restart requested");
        self.restart_requested = true;
    }
}
