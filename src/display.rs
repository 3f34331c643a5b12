//! Status panel composition for the 72×40 SSD1306.
//!
//! [`DisplayController`] turns a [`DeviceState`] into a [`DisplayFrame`]
//! (four text rows in the 6×10 font) and decides when the panel actually
//! needs a redraw.  [`draw_frame`] rasterises a frame onto any
//! `embedded-graphics` target, so the same code drives the OLED on target
//! and a pixel counter in tests.
//!
//! ```text
//!  row 0  192.168.1.23 ◀── scrolls 2 px / 300 ms when wider than 72 px
//!  row 1  CO2 412 TMO
//!  row 2  message[0..12]
//!  row 3  message[12..24]  (or climate when the message fits in one row)
//! ```

use core::fmt::Write as _;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

use crate::app::state::{DeviceState, ResultCode};
use crate::config::SystemConfig;

pub const PANEL_WIDTH_PX: u32 = 72;
pub const PANEL_HEIGHT_PX: u32 = 40;
pub const GLYPH_WIDTH_PX: u32 = 6;
const ROW_HEIGHT_PX: i32 = 10;
/// Characters that fit on one row.
pub const ROW_CHARS: usize = 12;
/// Blank gap between the two copies of a scrolling status row.
const SCROLL_GAP_PX: u32 = 30;
const SCROLL_STEP_PX: u32 = 2;

pub type Row = String<ROW_CHARS>;
pub type StatusLine = String<24>;

/// One composed screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayFrame {
    pub status: StatusLine,
    /// Horizontal scroll of the status row in pixels.
    pub scroll_px: u32,
    pub rows: [Row; 3],
}

impl DisplayFrame {
    /// Two-line splash used during bring-up ("Connecting", "WiFi FAIL").
    pub fn splash(line1: &str, line2: &str) -> Self {
        let mut f = Self::default();
        push_truncated(&mut f.rows[0], line1);
        push_truncated(&mut f.rows[1], line2);
        f
    }

    pub fn status_width_px(&self) -> u32 {
        status_width_px(&self.status)
    }
}

fn status_width_px(s: &str) -> u32 {
    s.chars().count() as u32 * GLYPH_WIDTH_PX
}

fn push_truncated<const N: usize>(dst: &mut String<N>, src: &str) {
    for ch in src.chars() {
        if dst.push(ch).is_err() {
            break;
        }
    }
}

/// Render the CO2 row, e.g. `CO2 412 TMO`, `CO2 --- NR`, `CO2 650`.
pub fn co2_row(state: &DeviceState) -> Row {
    let mut row = Row::new();
    let co2 = &state.co2;
    let _ = if co2.has_sample() {
        write!(row, "CO2 {}", co2.ppm)
    } else {
        write!(row, "CO2 ---")
    };
    if co2.result != ResultCode::Ok {
        let _ = write!(row, " {}", co2.result.tag());
    } else if co2.warming_up {
        let _ = row.push_str(" WU");
    }
    row
}

/// Compose a frame from the current state (scroll offset supplied by caller).
pub fn compose(state: &DeviceState, status: &str, scroll_px: u32) -> DisplayFrame {
    let mut frame = DisplayFrame { scroll_px, ..DisplayFrame::default() };
    push_truncated(&mut frame.status, status);
    frame.rows[0] = co2_row(state);

    let mut chars = state.message.chars();
    for ch in chars.by_ref().take(ROW_CHARS) {
        let _ = frame.rows[1].push(ch);
    }
    for ch in chars.by_ref().take(ROW_CHARS) {
        let _ = frame.rows[2].push(ch);
    }
    if frame.rows[2].is_empty() && state.climate.valid {
        let _ = write!(
            frame.rows[2],
            "{:.1}C {:.0}%",
            state.climate.temperature_c, state.climate.humidity_pct
        );
    }
    frame
}

// ═══════════════════════════════════════════════════════════════
//  Refresh controller
// ═══════════════════════════════════════════════════════════════

pub struct DisplayController {
    status: StatusLine,
    scroll_px: u32,
    scroll_interval_ms: u64,
    last_scroll_at_ms: u64,
    last_frame: Option<DisplayFrame>,
}

impl DisplayController {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            status: StatusLine::new(),
            scroll_px: 0,
            scroll_interval_ms: u64::from(config.display_scroll_interval_ms),
            last_scroll_at_ms: 0,
            last_frame: None,
        }
    }

    /// Replace the status row text (normally the station IP).
    pub fn set_status(&mut self, text: &str) {
        self.status.clear();
        push_truncated(&mut self.status, text);
        self.scroll_px = 0;
    }

    pub fn scroll_px(&self) -> u32 {
        self.scroll_px
    }

    fn advance_scroll(&mut self, now_ms: u64) {
        let width = status_width_px(&self.status);
        if width <= PANEL_WIDTH_PX {
            self.scroll_px = 0;
            return;
        }
        if now_ms.saturating_sub(self.last_scroll_at_ms) < self.scroll_interval_ms {
            return;
        }
        self.last_scroll_at_ms = now_ms;
        self.scroll_px += SCROLL_STEP_PX;
        if self.scroll_px >= width + SCROLL_GAP_PX {
            self.scroll_px = 0;
        }
    }

    /// Returns a frame when the panel content differs from what was last drawn.
    pub fn update(&mut self, now_ms: u64, state: &DeviceState) -> Option<DisplayFrame> {
        self.advance_scroll(now_ms);
        let frame = compose(state, &self.status, self.scroll_px);
        if self.last_frame.as_ref() == Some(&frame) {
            return None;
        }
        self.last_frame = Some(frame.clone());
        Some(frame)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Rasteriser
// ═══════════════════════════════════════════════════════════════

/// Draw `frame` onto a cleared target.
pub fn draw_frame<D>(frame: &DisplayFrame, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    target.clear(BinaryColor::Off)?;

    let width = frame.status_width_px();
    if width <= PANEL_WIDTH_PX {
        Text::with_baseline(&frame.status, Point::zero(), style, Baseline::Top).draw(target)?;
    } else {
        let x = -(frame.scroll_px as i32);
        let period = (width + SCROLL_GAP_PX) as i32;
        Text::with_baseline(&frame.status, Point::new(x, 0), style, Baseline::Top).draw(target)?;
        Text::with_baseline(&frame.status, Point::new(x + period, 0), style, Baseline::Top)
            .draw(target)?;
    }

    for (i, row) in frame.rows.iter().enumerate() {
        let y = ROW_HEIGHT_PX * (i as i32 + 1);
        Text::with_baseline(row, Point::new(0, y), style, Baseline::Top).draw(target)?;
    }
    Ok(())
}
