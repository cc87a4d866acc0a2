//! ESP-IDF heap introspection adapter.
//!
//! Implements [`HeapPort`] for the memory monitor.
//!
//! - **`target_os = "espidf"`** — wraps `esp_get_free_heap_size()` and
//!   `heap_caps_get_largest_free_block()`. `reclaim_step` yields one
//!   FreeRTOS tick so deferred frees and allocator housekeeping can run.
//! - **`not(target_os = "espidf")`** — an in-memory simulation whose free
//!   size tests can script directly.

use crate::app::ports::HeapPort;

pub struct EspHeapAdapter {
    #[cfg(not(target_os = "espidf"))]
    sim_free: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_largest: u32,
}

impl Default for EspHeapAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EspHeapAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            sim_free: 120 * 1024,
            #[cfg(not(target_os = "espidf"))]
            sim_largest: 100 * 1024,
        }
    }

    /// Script the simulated heap (host tests only).
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim(&mut self, free: u32, largest: u32) {
        self.sim_free = free;
        self.sim_largest = largest;
    }
}

impl HeapPort for EspHeapAdapter {
    #[cfg(target_os = "espidf")]
    fn free_bytes(&self) -> u32 {
        unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn free_bytes(&self) -> u32 {
        self.sim_free
    }

    #[cfg(target_os = "espidf")]
    fn largest_block_bytes(&self) -> u32 {
        (unsafe {
            esp_idf_svc::sys::heap_caps_get_largest_free_block(
                esp_idf_svc::sys::MALLOC_CAP_8BIT,
            )
        }) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn largest_block_bytes(&self) -> u32 {
        self.sim_largest
    }

    #[cfg(target_os = "espidf")]
    fn reclaim_step(&mut self) {
        // One tick back to the scheduler; the idle task runs deferred
        // frees and TLSF housekeeping during it.
        unsafe { esp_idf_svc::sys::vTaskDelay(1) };
    }

    #[cfg(not(target_os = "espidf"))]
    fn reclaim_step(&mut self) {}
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn sim_heap_is_scriptable() {
        let mut heap = EspHeapAdapter::new();
        heap.set_sim(12_345, 6_789);
        assert_eq!(heap.free_bytes(), 12_345);
        assert_eq!(heap.largest_block_bytes(), 6_789);
    }
}
