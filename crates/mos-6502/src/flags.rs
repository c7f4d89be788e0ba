//! 6502 processor status register (P).
//!
//! The status register contains flags that reflect the result of operations
//! and control CPU behavior.

/// Carry flag - set if operation resulted in carry, clear on borrow.
pub const C: u8 = 0x01;

/// Zero flag - set if result is zero.
pub const Z: u8 = 0x02;

/// Interrupt disable - when set, IRQ interrupts are ignored.
pub const I: u8 = 0x04;

/// Decimal mode - enables BCD arithmetic for ADC/SBC.
pub const D: u8 = 0x08;

/// Break flag - never held in the live register, only in pushed copies.
/// Set when BRK/PHP push status, clear when IRQ/NMI push it.
pub const B: u8 = 0x10;

/// Unused bit - always reads as 1.
pub const U: u8 = 0x20;

/// Overflow flag - set if signed arithmetic overflowed.
pub const V: u8 = 0x40;

/// Negative flag - set if result has bit 7 set.
pub const N: u8 = 0x80;

/// Read bit `n` (0-7) of a byte.
#[must_use]
pub const fn bit(value: u8, n: u8) -> bool {
    value & (1 << (n & 7)) != 0
}

/// Return `value` with bit `n` (0-7) set or cleared.
#[must_use]
pub const fn with_bit(value: u8, n: u8, on: bool) -> u8 {
    let mask = 1 << (n & 7);
    if on { value | mask } else { value & !mask }
}

/// True if the byte is zero.
#[must_use]
pub const fn is_zero(value: u8) -> bool {
    value == 0
}

/// True if bit 7 of the byte is set.
#[must_use]
pub const fn is_negative(value: u8) -> bool {
    value & 0x80 != 0
}

/// Processor status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    /// Status after reset: unused and zero set.
    pub const RESET: Self = Self(U | Z);

    /// Create a new status register with the unused bit set.
    #[must_use]
    pub const fn new() -> Self {
        Self(U)
    }

    /// Create a live status from a raw (pulled) byte: unused set, break clear.
    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self((value | U) & !B)
    }

    /// Raw value for BRK/PHP (break and unused both set).
    #[must_use]
    pub const fn to_byte_brk(self) -> u8 {
        self.0 | U | B
    }

    /// Raw value for IRQ/NMI (unused set, break clear).
    #[must_use]
    pub const fn to_byte_irq(self) -> u8 {
        (self.0 | U) & !B
    }

    /// Check if a flag is set.
    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Set a flag.
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Clear a flag.
    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    /// Set or clear a flag based on condition.
    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Update N and Z flags based on a value.
    pub fn update_nz(&mut self, value: u8) {
        self.set_if(N, is_negative(value));
        self.set_if(Z, is_zero(value));
    }

    /// Carry as 0 or 1, for arithmetic.
    #[must_use]
    pub const fn carry(self) -> u8 {
        self.0 & C
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_helpers() {
        assert!(bit(0x80, 7));
        assert!(!bit(0x80, 6));
        assert_eq!(with_bit(0x00, 3, true), 0x08);
        assert_eq!(with_bit(0xFF, 0, false), 0xFE);
        // Bit numbers are masked into range.
        assert!(bit(0x01, 8));
    }

    #[test]
    fn pulled_status_never_holds_break() {
        let p = Status::from_byte(0xFF);
        assert!(!p.is_set(B));
        assert!(p.is_set(U));
    }

    #[test]
    fn pushed_copies() {
        let p = Status(U | C);
        assert_eq!(p.to_byte_brk(), U | B | C);
        assert_eq!(p.to_byte_irq(), U | C);
    }

    #[test]
    fn reset_value() {
        assert_eq!(Status::RESET.0, 0x22);
    }
}
