//! Instruction definition table.
//!
//! One entry per opcode byte, built at compile time from the definition
//! list below. Opcodes outside the documented set (plus the KIL halt
//! opcodes) have no entry; the CPU executes them as a one-byte NOP that
//! stops the run loop.

use crate::AddressingMode::{
    self, Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, IndexedIndirect,
    Indirect, IndirectIndexed, Relative, ZeroPage, ZeroPageX, ZeroPageY,
};

/// Instruction mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    /// Halt pseudo-instruction (the NMOS JAM opcodes).
    Kil,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
}

use Mnemonic::{
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp, Cpx,
    Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp, Jsr, Kil, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php,
    Pla, Plp, Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
};

const ALL_MNEMONICS: [Mnemonic; 57] = [
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp, Cpx,
    Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp, Jsr, Kil, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php,
    Pla, Plp, Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
];

impl Mnemonic {
    /// Upper-case assembler name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Adc => "ADC",
            And => "AND",
            Asl => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Kil => "KIL",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol => "ROL",
            Ror => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
        }
    }

    /// Look up a mnemonic by name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_MNEMONICS
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    /// True for the eight conditional branches.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(self, Bcc | Bcs | Beq | Bmi | Bne | Bpl | Bvc | Bvs)
    }
}

/// Static definition of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Total length including the opcode byte (1-3).
    pub bytes: u8,
    /// Base cycle count, charged when the handler does not return its own.
    pub cycles: u8,
    /// False for the KIL entries: listed for lookups and disassembly, but
    /// executing one halts the CPU.
    pub implemented: bool,
    /// Example assembler syntax, e.g. `LDA ($44),Y`.
    pub sample: &'static str,
}

const fn op(
    opcode: u8,
    mnemonic: Mnemonic,
    mode: AddressingMode,
    cycles: u8,
    sample: &'static str,
) -> Instruction {
    Instruction {
        opcode,
        mnemonic,
        mode,
        bytes: 1 + mode.operand_bytes(),
        cycles,
        implemented: !matches!(mnemonic, Mnemonic::Kil),
        sample,
    }
}

const DEFINITIONS: [Instruction; 163] = [
    op(0x00, Brk, Implied, 7, "BRK"),
    op(0x01, Ora, IndexedIndirect, 6, "ORA ($44,X)"),
    op(0x02, Kil, Implied, 0, "KIL"),
    op(0x05, Ora, ZeroPage, 3, "ORA $44"),
    op(0x06, Asl, ZeroPage, 5, "ASL $44"),
    op(0x08, Php, Implied, 3, "PHP"),
    op(0x09, Ora, Immediate, 2, "ORA #$44"),
    op(0x0A, Asl, Accumulator, 2, "ASL A"),
    op(0x0D, Ora, Absolute, 4, "ORA $4400"),
    op(0x0E, Asl, Absolute, 6, "ASL $4400"),
    op(0x10, Bpl, Relative, 2, "BPL $44"),
    op(0x11, Ora, IndirectIndexed, 5, "ORA ($44),Y"),
    op(0x12, Kil, Implied, 0, "KIL"),
    op(0x15, Ora, ZeroPageX, 4, "ORA $44,X"),
    op(0x16, Asl, ZeroPageX, 6, "ASL $44,X"),
    op(0x18, Clc, Implied, 2, "CLC"),
    op(0x19, Ora, AbsoluteY, 4, "ORA $4400,Y"),
    op(0x1D, Ora, AbsoluteX, 4, "ORA $4400,X"),
    op(0x1E, Asl, AbsoluteX, 7, "ASL $4400,X"),
    op(0x20, Jsr, Absolute, 6, "JSR $4400"),
    op(0x21, And, IndexedIndirect, 6, "AND ($44,X)"),
    op(0x22, Kil, Implied, 0, "KIL"),
    op(0x24, Bit, ZeroPage, 3, "BIT $44"),
    op(0x25, And, ZeroPage, 3, "AND $44"),
    op(0x26, Rol, ZeroPage, 5, "ROL $44"),
    op(0x28, Plp, Implied, 4, "PLP"),
    op(0x29, And, Immediate, 2, "AND #$44"),
    op(0x2A, Rol, Accumulator, 2, "ROL A"),
    op(0x2C, Bit, Absolute, 4, "BIT $4400"),
    op(0x2D, And, Absolute, 4, "AND $4400"),
    op(0x2E, Rol, Absolute, 6, "ROL $4400"),
    op(0x30, Bmi, Relative, 2, "BMI $44"),
    op(0x31, And, IndirectIndexed, 5, "AND ($44),Y"),
    op(0x32, Kil, Implied, 0, "KIL"),
    op(0x35, And, ZeroPageX, 4, "AND $44,X"),
    op(0x36, Rol, ZeroPageX, 6, "ROL $44,X"),
    op(0x38, Sec, Implied, 2, "SEC"),
    op(0x39, And, AbsoluteY, 4, "AND $4400,Y"),
    op(0x3D, And, AbsoluteX, 4, "AND $4400,X"),
    op(0x3E, Rol, AbsoluteX, 7, "ROL $4400,X"),
    op(0x40, Rti, Implied, 6, "RTI"),
    op(0x41, Eor, IndexedIndirect, 6, "EOR ($44,X)"),
    op(0x42, Kil, Implied, 0, "KIL"),
    op(0x45, Eor, ZeroPage, 3, "EOR $44"),
    op(0x46, Lsr, ZeroPage, 5, "LSR $44"),
    op(0x48, Pha, Implied, 3, "PHA"),
    op(0x49, Eor, Immediate, 2, "EOR #$44"),
    op(0x4A, Lsr, Accumulator, 2, "LSR A"),
    op(0x4C, Jmp, Absolute, 3, "JMP $4400"),
    op(0x4D, Eor, Absolute, 4, "EOR $4400"),
    op(0x4E, Lsr, Absolute, 6, "LSR $4400"),
    op(0x50, Bvc, Relative, 2, "BVC $44"),
    op(0x51, Eor, IndirectIndexed, 5, "EOR ($44),Y"),
    op(0x52, Kil, Implied, 0, "KIL"),
    op(0x55, Eor, ZeroPageX, 4, "EOR $44,X"),
    op(0x56, Lsr, ZeroPageX, 6, "LSR $44,X"),
    op(0x58, Cli, Implied, 2, "CLI"),
    op(0x59, Eor, AbsoluteY, 4, "EOR $4400,Y"),
    op(0x5D, Eor, AbsoluteX, 4, "EOR $4400,X"),
    op(0x5E, Lsr, AbsoluteX, 7, "LSR $4400,X"),
    op(0x60, Rts, Implied, 6, "RTS"),
    op(0x61, Adc, IndexedIndirect, 6, "ADC ($44,X)"),
    op(0x62, Kil, Implied, 0, "KIL"),
    op(0x65, Adc, ZeroPage, 3, "ADC $44"),
    op(0x66, Ror, ZeroPage, 5, "ROR $44"),
    op(0x68, Pla, Implied, 4, "PLA"),
    op(0x69, Adc, Immediate, 2, "ADC #$44"),
    op(0x6A, Ror, Accumulator, 2, "ROR A"),
    op(0x6C, Jmp, Indirect, 5, "JMP ($4400)"),
    op(0x6D, Adc, Absolute, 4, "ADC $4400"),
    op(0x6E, Ror, Absolute, 6, "ROR $4400"),
    op(0x70, Bvs, Relative, 2, "BVS $44"),
    op(0x71, Adc, IndirectIndexed, 5, "ADC ($44),Y"),
    op(0x72, Kil, Implied, 0, "KIL"),
    op(0x75, Adc, ZeroPageX, 4, "ADC $44,X"),
    op(0x76, Ror, ZeroPageX, 6, "ROR $44,X"),
    op(0x78, Sei, Implied, 2, "SEI"),
    op(0x79, Adc, AbsoluteY, 4, "ADC $4400,Y"),
    op(0x7D, Adc, AbsoluteX, 4, "ADC $4400,X"),
    op(0x7E, Ror, AbsoluteX, 7, "ROR $4400,X"),
    op(0x81, Sta, IndexedIndirect, 6, "STA ($44,X)"),
    op(0x84, Sty, ZeroPage, 3, "STY $44"),
    op(0x85, Sta, ZeroPage, 3, "STA $44"),
    op(0x86, Stx, ZeroPage, 3, "STX $44"),
    op(0x88, Dey, Implied, 2, "DEY"),
    op(0x8A, Txa, Implied, 2, "TXA"),
    op(0x8C, Sty, Absolute, 4, "STY $4400"),
    op(0x8D, Sta, Absolute, 4, "STA $4400"),
    op(0x8E, Stx, Absolute, 4, "STX $4400"),
    op(0x90, Bcc, Relative, 2, "BCC $44"),
    op(0x91, Sta, IndirectIndexed, 6, "STA ($44),Y"),
    op(0x92, Kil, Implied, 0, "KIL"),
    op(0x94, Sty, ZeroPageX, 4, "STY $44,X"),
    op(0x95, Sta, ZeroPageX, 4, "STA $44,X"),
    op(0x96, Stx, ZeroPageY, 4, "STX $44,Y"),
    op(0x98, Tya, Implied, 2, "TYA"),
    op(0x99, Sta, AbsoluteY, 5, "STA $4400,Y"),
    op(0x9A, Txs, Implied, 2, "TXS"),
    op(0x9D, Sta, AbsoluteX, 5, "STA $4400,X"),
    op(0xA0, Ldy, Immediate, 2, "LDY #$44"),
    op(0xA1, Lda, IndexedIndirect, 6, "LDA ($44,X)"),
    op(0xA2, Ldx, Immediate, 2, "LDX #$44"),
    op(0xA4, Ldy, ZeroPage, 3, "LDY $44"),
    op(0xA5, Lda, ZeroPage, 3, "LDA $44"),
    op(0xA6, Ldx, ZeroPage, 3, "LDX $44"),
    op(0xA8, Tay, Implied, 2, "TAY"),
    op(0xA9, Lda, Immediate, 2, "LDA #$44"),
    op(0xAA, Tax, Implied, 2, "TAX"),
    op(0xAC, Ldy, Absolute, 4, "LDY $4400"),
    op(0xAD, Lda, Absolute, 4, "LDA $4400"),
    op(0xAE, Ldx, Absolute, 4, "LDX $4400"),
    op(0xB0, Bcs, Relative, 2, "BCS $44"),
    op(0xB1, Lda, IndirectIndexed, 5, "LDA ($44),Y"),
    op(0xB2, Kil, Implied, 0, "KIL"),
    op(0xB4, Ldy, ZeroPageX, 4, "LDY $44,X"),
    op(0xB5, Lda, ZeroPageX, 4, "LDA $44,X"),
    op(0xB6, Ldx, ZeroPageY, 4, "LDX $44,Y"),
    op(0xB8, Clv, Implied, 2, "CLV"),
    op(0xB9, Lda, AbsoluteY, 4, "LDA $4400,Y"),
    op(0xBA, Tsx, Implied, 2, "TSX"),
    op(0xBC, Ldy, AbsoluteX, 4, "LDY $4400,X"),
    op(0xBD, Lda, AbsoluteX, 4, "LDA $4400,X"),
    op(0xBE, Ldx, AbsoluteY, 4, "LDX $4400,Y"),
    op(0xC0, Cpy, Immediate, 2, "CPY #$44"),
    op(0xC1, Cmp, IndexedIndirect, 6, "CMP ($44,X)"),
    op(0xC4, Cpy, ZeroPage, 3, "CPY $44"),
    op(0xC5, Cmp, ZeroPage, 3, "CMP $44"),
    op(0xC6, Dec, ZeroPage, 5, "DEC $44"),
    op(0xC8, Iny, Implied, 2, "INY"),
    op(0xC9, Cmp, Immediate, 2, "CMP #$44"),
    op(0xCA, Dex, Implied, 2, "DEX"),
    op(0xCC, Cpy, Absolute, 4, "CPY $4400"),
    op(0xCD, Cmp, Absolute, 4, "CMP $4400"),
    op(0xCE, Dec, Absolute, 6, "DEC $4400"),
    op(0xD0, Bne, Relative, 2, "BNE $44"),
    op(0xD1, Cmp, IndirectIndexed, 5, "CMP ($44),Y"),
    op(0xD2, Kil, Implied, 0, "KIL"),
    op(0xD5, Cmp, ZeroPageX, 4, "CMP $44,X"),
    op(0xD6, Dec, ZeroPageX, 6, "DEC $44,X"),
    op(0xD8, Cld, Implied, 2, "CLD"),
    op(0xD9, Cmp, AbsoluteY, 4, "CMP $4400,Y"),
    op(0xDD, Cmp, AbsoluteX, 4, "CMP $4400,X"),
    op(0xDE, Dec, AbsoluteX, 7, "DEC $4400,X"),
    op(0xE0, Cpx, Immediate, 2, "CPX #$44"),
    op(0xE1, Sbc, IndexedIndirect, 6, "SBC ($44,X)"),
    op(0xE4, Cpx, ZeroPage, 3, "CPX $44"),
    op(0xE5, Sbc, ZeroPage, 3, "SBC $44"),
    op(0xE6, Inc, ZeroPage, 5, "INC $44"),
    op(0xE8, Inx, Implied, 2, "INX"),
    op(0xE9, Sbc, Immediate, 2, "SBC #$44"),
    op(0xEA, Nop, Implied, 2, "NOP"),
    op(0xEC, Cpx, Absolute, 4, "CPX $4400"),
    op(0xED, Sbc, Absolute, 4, "SBC $4400"),
    op(0xEE, Inc, Absolute, 6, "INC $4400"),
    op(0xF0, Beq, Relative, 2, "BEQ $44"),
    op(0xF1, Sbc, IndirectIndexed, 5, "SBC ($44),Y"),
    op(0xF2, Kil, Implied, 0, "KIL"),
    op(0xF5, Sbc, ZeroPageX, 4, "SBC $44,X"),
    op(0xF6, Inc, ZeroPageX, 6, "INC $44,X"),
    op(0xF8, Sed, Implied, 2, "SED"),
    op(0xF9, Sbc, AbsoluteY, 4, "SBC $4400,Y"),
    op(0xFD, Sbc, AbsoluteX, 4, "SBC $4400,X"),
    op(0xFE, Inc, AbsoluteX, 7, "INC $4400,X"),
];

const fn build_table() -> [Option<Instruction>; 256] {
    let mut table = [None; 256];
    let mut i = 0;
    while i < DEFINITIONS.len() {
        let def = DEFINITIONS[i];
        table[def.opcode as usize] = Some(def);
        i += 1;
    }
    table
}

/// Instruction definitions indexed by opcode byte.
pub static INSTRUCTIONS: [Option<Instruction>; 256] = build_table();

/// Definition for `opcode`, or `None` if the opcode is not in the defined set.
#[must_use]
pub fn instruction(opcode: u8) -> Option<&'static Instruction> {
    INSTRUCTIONS[usize::from(opcode)].as_ref()
}

/// Opcode encoding `mnemonic` in `mode`, if the combination exists.
#[must_use]
pub fn opcode_for(mnemonic: Mnemonic, mode: AddressingMode) -> Option<u8> {
    DEFINITIONS
        .iter()
        .find(|def| def.mnemonic == mnemonic && def.mode == mode)
        .map(|def| def.opcode)
}
