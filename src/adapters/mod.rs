//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to                   |
//! |-------------|------------------|-------------------------------|
//! | `hardware`  | RelayPort        | ESP32 GPIO relay outputs      |
//! |             | (ring ADC read)  | ESP32 ADC                     |
//! | `heap`      | HeapPort         | ESP-IDF heap introspection    |
//! | `log_sink`  | EventSink        | Serial log output             |
//! | `messaging` | MessagingPort    | Remote command channel (TCP)  |
//! | `nvs`       | ConfigStorePort  | NVS / in-memory store         |
//! | `system`    | SystemPort       | esp_restart                   |
//! | `time`      | TimePort         | ESP32 system timer            |
//!
//! Each adapter compiles a simulation backend on non-ESP targets so the
//! whole crate runs under host `cargo test`.

pub mod hardware;
pub mod heap;
pub mod log_sink;
pub mod messaging;
pub mod nvs;
pub mod system;
pub mod time;
