//! Master clock configuration.

use crate::Ticks;

/// Master clock configuration for a system.
///
/// On the machines modelled here the CPU clock is the master clock; the
/// frame budget and all peripheral timing derive from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Clock frequency in Hz (e.g., `2_000_000` for the BBC Micro's 6502).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per frame at the given frame rate (integer division).
    ///
    /// A frame rate of zero is treated as one frame per second.
    #[must_use]
    pub const fn ticks_per_frame(&self, frames_per_second: u64) -> Ticks {
        let fps = if frames_per_second == 0 {
            1
        } else {
            frames_per_second
        };
        Ticks::new(self.frequency_hz / fps)
    }

    /// Effective speed in MHz for `ticks` executed over `seconds`.
    #[must_use]
    pub fn mhz(ticks: Ticks, seconds: f64) -> f64 {
        if seconds <= 0.0 {
            return 0.0;
        }
        ticks.get() as f64 / seconds / 1_000_000.0
    }
}
