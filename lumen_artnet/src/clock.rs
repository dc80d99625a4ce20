//! Millisecond clock used for poll scheduling and node expiry.

use std::time::Instant;

/// Monotonic millisecond counter. Wraps at `u32::MAX`; consumers compare
/// timestamps with `wrapping_sub`.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_millis(&self) -> u32;
}

/// Clock backed by [`Instant`], starting at zero on construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_millis(&self) -> u32 {
        // Truncation gives the wrapping counter.
        self.origin.elapsed().as_millis() as u32
    }
}
