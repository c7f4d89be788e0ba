//! Trait for components advanced by their own clock.

use crate::Ticks;

/// A component that can be advanced by clock ticks.
///
/// A tick is one period of the component's own clock (a 6522 on the BBC
/// Micro ticks at 1 MHz, half the CPU rate).
pub trait Tickable {
    /// Advance the component by one tick.
    fn tick(&mut self);

    /// Advance the component by multiple ticks.
    ///
    /// Default implementation calls `tick()` in a loop. Components may
    /// override for efficiency, but must produce identical results.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
