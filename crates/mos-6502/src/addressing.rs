//! 6502 addressing modes and operand decoding.
//!
//! The 6502 has 13 addressing modes:
//! - Implied: No operand (e.g., CLC, RTS)
//! - Accumulator: Operates on A register (e.g., ASL A)
//! - Immediate: #$nn (literal value)
//! - Zero Page: $nn (8-bit address in page zero)
//! - Zero Page,X: $nn,X (8-bit address + X, wraps in page zero)
//! - Zero Page,Y: $nn,Y (8-bit address + Y, wraps in page zero)
//! - Absolute: $nnnn (16-bit address)
//! - Absolute,X: $nnnn,X (16-bit address + X, wraps at 64K)
//! - Absolute,Y: $nnnn,Y (16-bit address + Y, wraps at 64K)
//! - Indirect: ($nnnn) (JMP only, buggy page boundary behavior)
//! - Indexed Indirect: ($nn,X) (pointer in zero page indexed by X)
//! - Indirect Indexed: ($nn),Y (zero page pointer + Y)
//! - Relative: Branch offset (-128 to +127)
//!
//! Indexed modes charge no page-crossing penalty; only branches do.

use crate::Mos6502;
use emu_core::Bus;

/// Operand addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_bytes(self) -> u8 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::Relative
            | Self::IndexedIndirect
            | Self::IndirectIndexed => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }
}

/// A decoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    None,
    Accumulator,
    Immediate(u8),
    Address(u16),
}

/// Effective address of a zero-page indexed operand.
#[must_use]
pub(crate) const fn zero_page_indexed(base: u8, index: u8) -> u16 {
    base.wrapping_add(index) as u16
}

/// Read a 16-bit pointer stored in zero page. The high byte wraps to $00.
fn read_zero_page_word(bus: &mut impl Bus, zp: u8) -> u16 {
    let low = bus.read(u16::from(zp));
    let high = bus.read(u16::from(zp.wrapping_add(1)));
    u16::from_le_bytes([low, high])
}

impl Mos6502 {
    /// Fetch the next byte at PC and increment PC.
    pub(crate) fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Fetch a 16-bit word (little-endian) at PC.
    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// Read a 16-bit word from memory (little-endian).
    pub(crate) fn read_word(bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Read a 16-bit word with the NMOS page wrap bug (indirect JMP).
    /// If addr is $xxFF, the high byte comes from $xx00.
    pub(crate) fn read_word_page_bug(bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr);
        u16::from_le_bytes([low, high])
    }

    /// Push a byte onto the stack.
    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        let addr = self.regs.push();
        bus.write(addr, value);
    }

    /// Pull a byte from the stack.
    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        let addr = self.regs.pop();
        bus.read(addr)
    }

    /// Push a 16-bit word onto the stack (high byte first).
    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.push(bus, high);
        self.push(bus, low);
    }

    /// Pull a 16-bit word from the stack (low byte first).
    pub(crate) fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    /// Consume the operand bytes for `mode` and resolve them.
    ///
    /// Relative operands are resolved by the branch handler, not here.
    pub(crate) fn decode_operand(&mut self, bus: &mut impl Bus, mode: AddressingMode) -> Operand {
        match mode {
            AddressingMode::Implied | AddressingMode::Relative => Operand::None,
            AddressingMode::Accumulator => Operand::Accumulator,
            AddressingMode::Immediate => Operand::Immediate(self.fetch(bus)),
            AddressingMode::ZeroPage => Operand::Address(u16::from(self.fetch(bus))),
            AddressingMode::ZeroPageX => {
                let base = self.fetch(bus);
                Operand::Address(zero_page_indexed(base, self.regs.x))
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch(bus);
                Operand::Address(zero_page_indexed(base, self.regs.y))
            }
            AddressingMode::Absolute => Operand::Address(self.fetch_word(bus)),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word(bus);
                Operand::Address(base.wrapping_add(u16::from(self.regs.x)))
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word(bus);
                Operand::Address(base.wrapping_add(u16::from(self.regs.y)))
            }
            AddressingMode::Indirect => {
                let pointer = self.fetch_word(bus);
                Operand::Address(Self::read_word_page_bug(bus, pointer))
            }
            AddressingMode::IndexedIndirect => {
                let zp = self.fetch(bus).wrapping_add(self.regs.x);
                Operand::Address(read_zero_page_word(bus, zp))
            }
            AddressingMode::IndirectIndexed => {
                let zp = self.fetch(bus);
                let base = read_zero_page_word(bus, zp);
                Operand::Address(base.wrapping_add(u16::from(self.regs.y)))
            }
        }
    }

    /// Read the value an operand refers to.
    pub(crate) fn load(&self, bus: &mut impl Bus, operand: Operand) -> u8 {
        match operand {
            Operand::Immediate(value) => value,
            Operand::Address(addr) => bus.read(addr),
            Operand::Accumulator | Operand::None => self.regs.a,
        }
    }

    /// Write back to an operand (memory or accumulator).
    pub(crate) fn store(&mut self, bus: &mut impl Bus, operand: Operand, value: u8) {
        match operand {
            Operand::Address(addr) => bus.write(addr, value),
            Operand::Accumulator => self.regs.a = value,
            Operand::Immediate(_) | Operand::None => {}
        }
    }

    /// Take a relative branch if `condition` holds.
    ///
    /// The displacement is relative to the PC after the operand byte. Returns
    /// the extra cycles: 0 not taken, 1 taken, 2 taken across a page.
    pub(crate) fn branch_if(&mut self, bus: &mut impl Bus, condition: bool) -> u32 {
        let offset = self.fetch(bus) as i8;
        if !condition {
            return 0;
        }
        let from = self.regs.pc;
        let target = from.wrapping_add_signed(i16::from(offset));
        self.regs.pc = target;
        if from & 0xFF00 == target & 0xFF00 {
            1
        } else {
            2
        }
    }
}
