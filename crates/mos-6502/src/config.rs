//! CPU configuration.
//!
//! The defaults reproduce the behaviour BBC-era test programs rely on. The
//! alternatives select strict NMOS behaviour where the two differ.

/// How BRK behaves when the interrupt-disable flag is already set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrkMode {
    /// BRK with I set returns zero cycles and stops the run loop without
    /// touching the stack. Programs use this as a halt instruction.
    #[default]
    HaltWhenInterruptsDisabled,
    /// BRK always pushes and vectors, as on silicon.
    Hardware,
}

/// Flag behaviour of ADC/SBC in decimal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalMode {
    /// Nibble-corrected result; C and V from the parallel binary sum,
    /// Z and N from the decimal result.
    #[default]
    Compatible,
    /// NMOS 6502: C from the corrected high nibble, Z from the binary sum,
    /// N and V from the intermediate high nibble.
    Nmos,
}

/// When the CPU samples its IRQ line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrqPolling {
    /// Once per frame, after the frame's cycle budget is spent.
    #[default]
    FrameBoundary,
    /// After every instruction.
    EveryInstruction,
}

/// Configuration for constructing a CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuConfig {
    /// Clock rate in Hz.
    pub cycles_per_second: u64,
    /// Video frames per second; sets the per-frame cycle budget.
    pub frame_rate: u32,
    pub brk_mode: BrkMode,
    pub decimal_mode: DecimalMode,
    pub irq_polling: IrqPolling,
    /// Pace `run()` against wall-clock time.
    pub throttle: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            cycles_per_second: 2_000_000,
            frame_rate: 50,
            brk_mode: BrkMode::default(),
            decimal_mode: DecimalMode::default(),
            irq_polling: IrqPolling::default(),
            throttle: true,
        }
    }
}

impl CpuConfig {
    /// Strict NMOS behaviour with per-instruction interrupt sampling.
    #[must_use]
    pub fn hardware() -> Self {
        Self {
            brk_mode: BrkMode::Hardware,
            decimal_mode: DecimalMode::Nmos,
            irq_polling: IrqPolling::EveryInstruction,
            ..Self::default()
        }
    }
}
