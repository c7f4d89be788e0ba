//! Shared interrupt request line.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// A wired-OR interrupt request line.
///
/// Each device that can pull the line gets its own source bit. The line is
/// asserted while any source holds it. Clones share the same line, so a
/// device callback and the CPU can each own a handle.
#[derive(Debug, Clone, Default)]
pub struct IrqLine {
    sources: Arc<AtomicU32>,
}

impl IrqLine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the line for `source` (0-31).
    pub fn set(&self, source: u8, asserted: bool) {
        let bit = 1u32 << (source & 0x1F);
        if asserted {
            self.sources.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.sources.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    /// True while any source asserts the line.
    #[must_use]
    pub fn is_asserted(&self) -> bool {
        self.sources.load(Ordering::Acquire) != 0
    }

    /// Bit mask of sources currently asserting the line.
    #[must_use]
    pub fn sources(&self) -> u32 {
        self.sources.load(Ordering::Acquire)
    }

    /// Release every source.
    pub fn clear_all(&self) {
        self.sources.store(0, Ordering::Release);
    }

    /// Build a level callback for `source`, for wiring into a device.
    #[must_use]
    pub fn handler(&self, source: u8) -> Box<dyn FnMut(bool) + Send> {
        let line = self.clone();
        Box::new(move |asserted| line.set(source, asserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wired_or_of_sources() {
        let line = IrqLine::new();
        line.set(0, true);
        line.set(1, true);
        line.set(0, false);
        assert!(line.is_asserted());
        line.set(1, false);
        assert!(!line.is_asserted());
    }

    #[test]
    fn handler_drives_shared_line() {
        let line = IrqLine::new();
        let mut handler = line.handler(3);
        handler(true);
        assert_eq!(line.sources(), 0x08);
        handler(false);
        assert!(!line.is_asserted());
    }
}
