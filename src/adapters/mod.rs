//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements    | Connects to                            |
//! |-------------|---------------|----------------------------------------|
//! | `fs`        | FilePort      | SPIFFS via VFS / host directory        |
//! | `nvs`       | SettingsPort  | NVS / in-memory store                  |
//! | `mqtt`      | MqttPort      | ESP-IDF MQTT client / rumqttc          |
//! | `ir`        | IrPort        | RMT TX + RX / simulated transceiver    |
//! | `system`    | SystemPort    | eFuse MAC, SPI flash, station IP       |
//! | `time`      | —             | ESP32 system timer / `Instant`         |
//! | `device_id` | —             | eFuse MAC → broker client id           |
//! | `wifi`      | —             | ESP-IDF WiFi STA                       |

pub mod device_id;
pub mod fs;
pub mod ir;
pub mod mqtt;
pub mod nvs;
pub mod system;
pub mod time;
pub mod wifi;
