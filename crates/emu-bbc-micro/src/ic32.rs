//! IC32: the 74LS259 addressable latch on system VIA port B.
//!
//! A port B write selects one of eight latch bits with bits 0-2 and sets it
//! to bit 3.
//!
//! | Bit | Signal                 | Active |
//! |-----|------------------------|--------|
//! | 0   | Sound write enable     | low    |
//! | 1   | Speech read select     | low    |
//! | 2   | Speech write select    | low    |
//! | 3   | Keyboard write enable  | low    |
//! | 4-5 | Screen start address   |        |
//! | 6   | Caps lock LED          | low    |
//! | 7   | Shift lock LED         | low    |

pub const SOUND_WRITE_ENABLE: u8 = 0x01;
pub const SPEECH_READ: u8 = 0x02;
pub const SPEECH_WRITE: u8 = 0x04;
pub const KEYBOARD_WRITE_ENABLE: u8 = 0x08;
pub const CAPS_LOCK_LED: u8 = 0x40;
pub const SHIFT_LOCK_LED: u8 = 0x80;

/// Latch state. Bits hold the level on the output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ic32(pub u8);

impl Ic32 {
    /// Apply a port B write. Returns true if the latch changed.
    pub fn write(&mut self, port_b: u8) -> bool {
        let mask = 1u8 << (port_b & 0x07);
        let old = self.0;
        if port_b & 0x08 != 0 {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
        self.0 != old
    }

    /// Keyboard write enable is low: the OS drives row and column from
    /// port A and the hardware column counter is stopped.
    #[must_use]
    pub fn keyboard_enabled(self) -> bool {
        self.0 & KEYBOARD_WRITE_ENABLE == 0
    }

    /// The keyboard's column counter is running.
    #[must_use]
    pub fn auto_scan(self) -> bool {
        !self.keyboard_enabled()
    }

    #[must_use]
    pub fn sound_enabled(self) -> bool {
        self.0 & SOUND_WRITE_ENABLE == 0
    }

    #[must_use]
    pub fn caps_lock(self) -> bool {
        self.0 & CAPS_LOCK_LED == 0
    }

    #[must_use]
    pub fn shift_lock(self) -> bool {
        self.0 & SHIFT_LOCK_LED == 0
    }

    /// Screen start address bits (C0, C1).
    #[must_use]
    pub fn screen_base(self) -> u8 {
        (self.0 >> 4) & 0x03
    }
}
