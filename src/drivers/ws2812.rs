//! WS2812B strip output over the RMT peripheral.
//!
//! Each bit is one high/low pulse pair; colours go out in GRB order,
//! MSB first.  The whole strip is sent as one variable-length signal.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `TxRmtDriver` on RMT channel 0.
//! On host/test: keeps the last frame in memory for inspection.

use crate::app::state::Rgb;
use crate::drivers::strip::{MAX_STRIP_LEN, Pixels};

#[cfg(target_os = "espidf")]
use esp_idf_hal::rmt::{PinState, Pulse, TxRmtDriver, VariableLengthSignal};

/// Wire order of one pixel.
pub fn grb_word((r, g, b): Rgb) -> u32 {
    (u32::from(g) << 16) | (u32::from(r) << 8) | u32::from(b)
}

pub struct Ws2812 {
    #[cfg(target_os = "espidf")]
    tx: TxRmtDriver<'static>,
    last: Pixels,
}

#[cfg(target_os = "espidf")]
impl Ws2812 {
    pub fn new(tx: TxRmtDriver<'static>) -> Self {
        Self { tx, last: Pixels::new() }
    }

    pub fn write(&mut self, pixels: &[Rgb]) -> Result<(), esp_idf_hal::sys::EspError> {
        use core::time::Duration;

        let ticks_hz = self.tx.counter_clock()?;
        let t0h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(350))?;
        let t0l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(800))?;
        let t1h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(700))?;
        let t1l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(600))?;

        let mut signal = VariableLengthSignal::new();
        for &px in pixels.iter().take(MAX_STRIP_LEN) {
            let word = grb_word(px);
            for bit in (0..24).rev() {
                let pair = if word & (1 << bit) != 0 { [&t1h, &t1l] } else { [&t0h, &t0l] };
                signal.push(pair)?;
            }
        }
        self.tx.start_blocking(&signal)?;
        self.remember(pixels);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl Ws2812 {
    pub fn new() -> Self {
        Self { last: Pixels::new() }
    }

    pub fn write(&mut self, pixels: &[Rgb]) -> Result<(), core::convert::Infallible> {
        self.remember(pixels);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for Ws2812 {
    fn default() -> Self {
        Self::new()
    }
}

impl Ws2812 {
    fn remember(&mut self, pixels: &[Rgb]) {
        self.last.clear();
        for &px in pixels.iter().take(MAX_STRIP_LEN) {
            let _ = self.last.push(px);
        }
    }

    /// The most recently written frame.
    pub fn last_frame(&self) -> &[Rgb] {
        &self.last
    }
}
