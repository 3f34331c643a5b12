//! LED strip frame generator.
//!
//! Produces the pixel buffer for the WS2812 strip from a [`StripState`].
//! Solid mode is a single colour; Rainbow mode spreads the colour wheel
//! along the strip and rotates it one step per animation frame.
//!
//! | Mode    | Output                                   | Rate            |
//! |---------|------------------------------------------|-----------------|
//! | Off     | all black                                | on change       |
//! | Solid   | `color` scaled by `brightness`           | on change       |
//! | Rainbow | wheel, hue offset += 1 per frame         | `frame_interval`|

use heapless::Vec;

use crate::app::state::{Rgb, StripMode, StripState};
use crate::config::SystemConfig;

/// Largest strip the frame buffer can hold.
pub const MAX_STRIP_LEN: usize = 64;

pub type Pixels = Vec<Rgb, MAX_STRIP_LEN>;

/// Map a hue position 0–255 onto the R→G→B colour wheel.
pub fn wheel(pos: u8) -> Rgb {
    let pos = 255 - pos;
    match pos {
        0..=84 => (255 - pos * 3, 0, pos * 3),
        85..=169 => {
            let p = pos - 85;
            (0, p * 3, 255 - p * 3)
        }
        _ => {
            let p = pos - 170;
            (p * 3, 255 - p * 3, 0)
        }
    }
}

/// Scale a colour by a 0–255 brightness.
pub fn scale((r, g, b): Rgb, brightness: u8) -> Rgb {
    let br = brightness as u16;
    (
        ((r as u16 * br) / 255) as u8,
        ((g as u16 * br) / 255) as u8,
        ((b as u16 * br) / 255) as u8,
    )
}

/// Strip animation engine. Stack-allocated, no heap.
pub struct StripAnimator {
    len: usize,
    frame_interval_ms: u64,
    last_frame_at_ms: u64,
    hue_offset: u8,
}

impl StripAnimator {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            len: usize::from(config.strip_len).min(MAX_STRIP_LEN),
            frame_interval_ms: u64::from(config.strip_frame_interval_ms),
            last_frame_at_ms: 0,
            hue_offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn hue_offset(&self) -> u8 {
        self.hue_offset
    }

    /// Build the pixel buffer for the current state without advancing.
    pub fn render(&self, strip: &StripState) -> Pixels {
        let mut px = Pixels::new();
        for i in 0..self.len {
            let c = if !strip.on {
                (0, 0, 0)
            } else {
                match strip.mode {
                    StripMode::Solid => scale(strip.color, strip.brightness),
                    StripMode::Rainbow => {
                        let hue = ((i * 256 / self.len) as u8).wrapping_add(self.hue_offset);
                        scale(wheel(hue), strip.brightness)
                    }
                }
            };
            let _ = px.push(c);
        }
        px
    }

    /// Advance the rainbow by one frame if one is due.
    ///
    /// Returns `None` when the strip is off, in Solid mode, or the frame
    /// interval has not elapsed; the hue does not move in those cases.
    pub fn advance(&mut self, now_ms: u64, strip: &StripState) -> Option<Pixels> {
        if !strip.on || strip.mode != StripMode::Rainbow {
            return None;
        }
        if now_ms.saturating_sub(self.last_frame_at_ms) < self.frame_interval_ms {
            return None;
        }
        self.last_frame_at_ms = now_ms;
        self.hue_offset = self.hue_offset.wrapping_add(1);
        Some(self.render(strip))
    }
}
