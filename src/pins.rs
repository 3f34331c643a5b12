//! GPIO / peripheral pin assignments for the ESP32-C3 SuperMini + 0.42" OLED board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Onboard blue LED. Active LOW: driving the pin HIGH turns it off.
pub const LED_GPIO: i32 = 8;
/// Relay module input (active HIGH).
pub const RELAY_GPIO: i32 = 10;
/// WS2812B strip data line (driven by RMT channel 0).
pub const STRIP_DATA_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// CO2 sensor (MH-Z19B, UART1 @ 9600 8N1)
// ---------------------------------------------------------------------------

pub const CO2_UART_TX_GPIO: i32 = 21;
pub const CO2_UART_RX_GPIO: i32 = 20;
pub const CO2_UART_BAUD: u32 = 9_600;

// ---------------------------------------------------------------------------
// I²C bus (SHT40 climate sensor, shared with the SSD1306 72x40 panel)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 5;
pub const I2C_SCL_GPIO: i32 = 6;
pub const I2C_FREQ_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// Battery sense: 100k/100k divider to ADC1 channel 0 (GPIO 0)
// ---------------------------------------------------------------------------

pub const BATTERY_ADC_GPIO: i32 = 0;
pub const BATTERY_ADC_CHANNEL: u32 = 0;
/// Divider ratio: battery volts = pin volts × this.
pub const BATTERY_DIVIDER_RATIO: f32 = 2.0;
