//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                   |
//! |------------|--------------------|-------------------------------|
//! | `display`  | DisplayPort        | SSD1306 72×40 over I²C        |
//! | `hardware` | SensorPort         | SHT4x, battery ADC            |
//! |            | ActuatorPort       | LED / relay GPIO, WS2812 RMT  |
//! |            | DisplayPort        | (delegates to `display`)      |
//! |            | NotifierPort       | (delegates to `notify`)       |
//! | `log_sink` | EventSink          | Serial log output             |
//! | `notify`   | NotifierPort       | HTTP POST to a ntfy topic     |
//! | `nvs`      | ConfigPort         | NVS / in-memory store         |
//! | `time`     | –                  | ESP32 system timer            |
//! | `uart`     | ByteChannel        | UART1 to the MH-Z19           |
//! | `web`      | (CommandSource via `channels`) | ESP-IDF HTTP server |
//! | `wifi`     | –                  | ESP-IDF WiFi STA              |

pub mod display;
pub mod hardware;
pub mod log_sink;
pub mod notify;
pub mod nvs;
pub mod time;
pub mod uart;
pub mod web;
pub mod wifi;
