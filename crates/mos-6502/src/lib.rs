//! MOS 6502 CPU core.
//!
//! Instructions execute atomically: `execute_next()` decodes one opcode
//! through the constant instruction table, runs it against the bus and
//! returns the cycles it took. A zero cycle count means the CPU stopped
//! (an unimplemented opcode, KIL, or BRK with interrupts disabled).
//!
//! Timing is budgeted per video frame. `run_single_frame()` spends one
//! frame's worth of cycles; `run()` adds real-time pacing and services the
//! interrupt line at each frame boundary.

mod addressing;
mod config;
mod cpu;
pub mod flags;
mod opcodes;
mod registers;
mod run;

pub use addressing::AddressingMode;
pub use config::{BrkMode, CpuConfig, DecimalMode, IrqPolling};
pub use cpu::Mos6502;
pub use flags::Status;
pub use opcodes::{INSTRUCTIONS, Instruction, Mnemonic, instruction, opcode_for};
pub use registers::Registers;
pub use run::{CpuStats, FrameStats, RunControl, RunOutcome};

/// NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector address.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address.
pub const IRQ_VECTOR: u16 = 0xFFFE;
