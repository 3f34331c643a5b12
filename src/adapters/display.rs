//! Status panel adapter.
//!
//! Implements [`DisplayPort`] for the 72×40 SSD1306 on the shared I²C bus.
//! Frames are rasterised by [`draw_frame`] into the driver's buffer and
//! flushed in one transfer.  A panel that fails to initialise is logged
//! once and then ignored so the rest of the firmware keeps running.
//!
//! - **`target_os = "espidf"`**: `ssd1306` in buffered graphics mode over
//!   an `embedded-hal-bus` `RefCellDevice`.
//! - **`not(target_os = "espidf")`**: keeps the last frame and logs it.

use log::{debug, warn};

use crate::app::ports::DisplayPort;
use crate::display::{DisplayFrame, draw_frame};

#[cfg(target_os = "espidf")]
use esp_idf_hal::i2c::I2cDriver;
#[cfg(target_os = "espidf")]
use embedded_hal_bus::i2c::RefCellDevice;
#[cfg(target_os = "espidf")]
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

/// Panel handle on the shared bus.
#[cfg(target_os = "espidf")]
pub type PanelI2c = RefCellDevice<'static, I2cDriver<'static>>;

#[cfg(target_os = "espidf")]
type Oled = Ssd1306<
    I2CInterface<PanelI2c>,
    DisplaySize72x40,
    BufferedGraphicsMode<DisplaySize72x40>,
>;

#[cfg(target_os = "espidf")]
pub struct OledPanel {
    oled: Oled,
    ready: bool,
}

#[cfg(target_os = "espidf")]
impl OledPanel {
    pub fn new(i2c: PanelI2c) -> Self {
        let mut oled = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize72x40,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        let ready = match oled.init() {
            Ok(()) => {
                log::info!("Display: SSD1306 72x40 initialised");
                true
            }
            Err(e) => {
                warn!("Display: init failed ({:?}), continuing without panel", e);
                false
            }
        };
        Self { oled, ready }
    }
}

#[cfg(target_os = "espidf")]
impl DisplayPort for OledPanel {
    fn render(&mut self, frame: &DisplayFrame) {
        if !self.ready {
            return;
        }
        if let Err(e) = draw_frame(frame, &mut self.oled) {
            warn!("Display: draw failed ({:?})", e);
            return;
        }
        if let Err(e) = self.oled.flush() {
            warn!("Display: flush failed ({:?})", e);
        }
        debug!("Display: frame flushed (scroll {})", frame.scroll_px);
    }
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
use embedded_graphics::mock_display::MockDisplay;
#[cfg(not(target_os = "espidf"))]
use embedded_graphics::pixelcolor::BinaryColor;

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct OledPanel {
    last: Option<DisplayFrame>,
    frames: usize,
}

#[cfg(not(target_os = "espidf"))]
impl OledPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&DisplayFrame> {
        self.last.as_ref()
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames
    }
}

#[cfg(not(target_os = "espidf"))]
impl DisplayPort for OledPanel {
    fn render(&mut self, frame: &DisplayFrame) {
        let mut target: MockDisplay<BinaryColor> = MockDisplay::new();
        target.set_allow_out_of_bounds_drawing(true);
        target.set_allow_overdraw(true);
        if let Err(e) = draw_frame(frame, &mut target) {
            warn!("Display(sim): draw failed ({:?})", e);
        }
        debug!(
            "Display(sim): [{}] [{}] [{}] [{}]",
            frame.status, frame.rows[0], frame.rows[1], frame.rows[2]
        );
        self.last = Some(frame.clone());
        self.frames += 1;
    }
}
