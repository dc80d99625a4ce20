//! Chase test pattern streamed by the binary.

use lumen_common::consts::{DMX_MAX_VALUE, DMX_UNIVERSE_SIZE};

/// Width of the lit band in channels.
const BAND: usize = 8;

/// A band of full-level channels moving one step per frame, with a short
/// fading tail. Each universe is offset so adjacent universes don't light
/// in lockstep.
#[derive(Debug, Clone, Default)]
pub struct Chase {
    frame: u32,
}

impl Chase {
    /// Chase at frame zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Move to the next frame.
    pub fn advance(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    /// Render `universe` for the current frame into `out`.
    pub fn render(&self, universe: u16, out: &mut [u8; DMX_UNIVERSE_SIZE]) {
        let head = (self.frame as usize + usize::from(universe) * BAND * 4) % DMX_UNIVERSE_SIZE;
        out.fill(0);
        for step in 0..BAND * 2 {
            let channel = (head + DMX_UNIVERSE_SIZE - step) % DMX_UNIVERSE_SIZE;
            out[channel] = if step < BAND {
                DMX_MAX_VALUE
            } else {
                (DMX_MAX_VALUE as usize * (BAND * 2 - step) / (BAND + 1)) as u8
            };
        }
    }
}
