//! CPU state, instruction dispatch and interrupt entry.

use std::sync::Arc;

use emu_core::{Bus, Cpu, IrqLine, MasterClock, Observable, Value};

use crate::addressing::Operand;
use crate::flags::{B, C, D, I, N, U, V, Z};
use crate::{
    AddressingMode, BrkMode, CpuConfig, CpuStats, DecimalMode, IRQ_VECTOR, Instruction,
    IrqPolling, Mnemonic, NMI_VECTOR, RESET_VECTOR, Registers, RunControl, Status, instruction,
};

/// Cycles taken to enter an IRQ or NMI handler.
const INTERRUPT_CYCLES: u32 = 7;

/// MOS 6502 CPU.
///
/// Executes whole instructions. Each call to `execute_next()` runs one
/// instruction to completion and reports the cycles it took; the bus is
/// ticked by the same amount so peripherals stay in step.
pub struct Mos6502 {
    pub regs: Registers,
    pub(crate) config: CpuConfig,
    halted: bool,
    cycles_per_frame: u64,
    total_cycles: u64,
    frame_count: u64,
    /// Cycles the previous frame ran past its budget.
    frame_overrun: u64,
    irq_pending: bool,
    nmi_pending: bool,
    irq: IrqLine,
    pub(crate) control: Arc<RunControl>,
    pub(crate) stats: Arc<CpuStats>,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// Create a CPU with the default configuration (2 MHz, 50 Hz frames).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CpuConfig) -> Self {
        let clock = MasterClock::new(config.cycles_per_second);
        Self {
            regs: Registers::new(),
            config,
            halted: false,
            cycles_per_frame: clock.ticks_per_frame(u64::from(config.frame_rate)).get(),
            total_cycles: 0,
            frame_count: 0,
            frame_overrun: 0,
            irq_pending: false,
            nmi_pending: false,
            irq: IrqLine::new(),
            control: Arc::new(RunControl::new()),
            stats: Arc::new(CpuStats::default()),
        }
    }

    /// Set the expected speed, derive the per-frame budget and reset.
    pub fn initialise<B: Bus>(&mut self, bus: &mut B, cycles_per_second: u64, frame_rate: u32) {
        self.config.cycles_per_second = cycles_per_second;
        self.config.frame_rate = frame_rate;
        self.cycles_per_frame = MasterClock::new(cycles_per_second)
            .ticks_per_frame(u64::from(frame_rate))
            .get();
        self.reset(bus);
    }

    /// Reset registers and counters, load PC from the reset vector.
    pub fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.regs = Registers::new();
        self.regs.pc = Self::read_word(bus, RESET_VECTOR);
        self.halted = false;
        self.total_cycles = 0;
        self.frame_count = 0;
        self.frame_overrun = 0;
        self.irq_pending = false;
        self.nmi_pending = false;
        self.stats.reset();
        log::debug!("6502 reset, PC=${:04X}", self.regs.pc);
    }

    /// Execute one instruction and tick the bus by its cycle count.
    ///
    /// Returns the cycles consumed. Zero means the CPU halted; the halt is
    /// sticky until `resume()`, `reset()` or `run()`.
    pub fn execute_next<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let opcode_addr = self.regs.pc;
        let opcode = self.fetch(bus);

        let cycles = match instruction(opcode) {
            Some(def) if def.implemented => {
                let def = *def;
                self.dispatch(bus, &def).unwrap_or(u32::from(def.cycles))
            }
            Some(def) => {
                log::debug!("{} at ${opcode_addr:04X}", def.sample);
                0
            }
            None => {
                log::warn!("Unimplemented opcode ${opcode:02X} at ${opcode_addr:04X}");
                0
            }
        };

        if cycles == 0 {
            self.halted = true;
            log::debug!("6502 halted at ${opcode_addr:04X} (opcode ${opcode:02X})");
            return 0;
        }

        self.account(bus, cycles);
        if self.config.irq_polling == IrqPolling::EveryInstruction {
            cycles + self.service_interrupts(bus)
        } else {
            cycles
        }
    }

    fn account<B: Bus>(&mut self, bus: &mut B, cycles: u32) {
        self.total_cycles += u64::from(cycles);
        self.stats.add_cycles(cycles);
        bus.tick(cycles);
    }

    /// Execute instructions until one frame's cycle budget is spent.
    ///
    /// Stops early on a halt or a stop request. Returns the cycles
    /// consumed. Cycles run past the budget are taken off the next frame.
    pub fn run_single_frame<B: Bus>(&mut self, bus: &mut B) -> u64 {
        if self.halted {
            return 0;
        }

        let budget = self.cycles_per_frame.saturating_sub(self.frame_overrun);
        let mut spent = 0u64;
        while spent < budget {
            let cycles = self.execute_next(bus);
            if cycles == 0 {
                break;
            }
            spent += u64::from(cycles);
            if self.control.is_stop_requested() {
                break;
            }
        }

        self.frame_overrun = spent.saturating_sub(budget);
        self.frame_count += 1;
        self.stats.add_frame();
        spent
    }

    /// Enter a pending NMI or IRQ handler. Returns the cycles taken.
    ///
    /// NMI is edge-triggered and always taken. IRQ is taken while the
    /// shared line is asserted (or a request was latched through
    /// `interrupt()`) and the interrupt-disable flag is clear.
    pub fn service_interrupts<B: Bus>(&mut self, bus: &mut B) -> u32 {
        if self.halted {
            return 0;
        }

        if self.nmi_pending {
            self.nmi_pending = false;
            self.enter_interrupt(bus, NMI_VECTOR);
            log::trace!("NMI taken, PC=${:04X}", self.regs.pc);
            return INTERRUPT_CYCLES;
        }

        if (self.irq_pending || self.irq.is_asserted()) && !self.regs.p.is_set(I) {
            self.irq_pending = false;
            self.enter_interrupt(bus, IRQ_VECTOR);
            log::trace!("IRQ taken, PC=${:04X}", self.regs.pc);
            return INTERRUPT_CYCLES;
        }

        0
    }

    fn enter_interrupt<B: Bus>(&mut self, bus: &mut B, vector: u16) {
        self.push_word(bus, self.regs.pc);
        self.push(bus, self.regs.p.to_byte_irq());
        self.regs.p.set(I);
        self.regs.pc = Self::read_word(bus, vector);
        self.account(bus, INTERRUPT_CYCLES);
    }

    /// True after a zero-cycle instruction until execution is resumed.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Clear a halt so execution can continue from the current PC.
    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// Wire the CPU to a shared interrupt line.
    pub fn connect_irq(&mut self, line: IrqLine) {
        self.irq = line;
    }

    /// The interrupt line this CPU samples.
    #[must_use]
    pub fn irq_line(&self) -> &IrqLine {
        &self.irq
    }

    /// Replace the run control shared with other threads.
    pub fn set_control(&mut self, control: Arc<RunControl>) {
        self.control = control;
    }

    #[must_use]
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Counters mirrored into atomics for polling from another thread.
    #[must_use]
    pub fn stats(&self) -> Arc<CpuStats> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub fn cycles_per_frame(&self) -> u64 {
        self.cycles_per_frame
    }

    pub(crate) fn set_pc(&mut self, pc: u16) {
        self.regs.pc = pc;
    }

    // =========================================================================
    // Instruction handlers
    // =========================================================================

    /// Run one decoded instruction. `None` means charge the table's base
    /// cycles; `Some(0)` halts.
    fn dispatch<B: Bus>(&mut self, bus: &mut B, def: &Instruction) -> Option<u32> {
        let mode = def.mode;
        let base = u32::from(def.cycles);

        match def.mnemonic {
            // Loads and stores
            Mnemonic::Lda => {
                let value = self.read_operand(bus, mode);
                self.regs.a = value;
                self.regs.p.update_nz(value);
            }
            Mnemonic::Ldx => {
                let value = self.read_operand(bus, mode);
                self.regs.x = value;
                self.regs.p.update_nz(value);
            }
            Mnemonic::Ldy => {
                let value = self.read_operand(bus, mode);
                self.regs.y = value;
                self.regs.p.update_nz(value);
            }
            Mnemonic::Sta => self.write_operand(bus, mode, self.regs.a),
            Mnemonic::Stx => self.write_operand(bus, mode, self.regs.x),
            Mnemonic::Sty => self.write_operand(bus, mode, self.regs.y),

            // Arithmetic and logic
            Mnemonic::Adc => {
                let value = self.read_operand(bus, mode);
                self.do_adc(value);
            }
            Mnemonic::Sbc => {
                let value = self.read_operand(bus, mode);
                self.do_sbc(value);
            }
            Mnemonic::And => {
                self.regs.a &= self.read_operand(bus, mode);
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Ora => {
                self.regs.a |= self.read_operand(bus, mode);
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Eor => {
                self.regs.a ^= self.read_operand(bus, mode);
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Bit => {
                let value = self.read_operand(bus, mode);
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                self.regs.p.set_if(N, value & 0x80 != 0);
                self.regs.p.set_if(V, value & 0x40 != 0);
            }
            Mnemonic::Cmp => {
                let value = self.read_operand(bus, mode);
                self.compare(self.regs.a, value);
            }
            Mnemonic::Cpx => {
                let value = self.read_operand(bus, mode);
                self.compare(self.regs.x, value);
            }
            Mnemonic::Cpy => {
                let value = self.read_operand(bus, mode);
                self.compare(self.regs.y, value);
            }

            // Shifts, rotates and memory increments
            Mnemonic::Asl => self.modify(bus, mode, |cpu, value| {
                cpu.regs.p.set_if(C, value & 0x80 != 0);
                value << 1
            }),
            Mnemonic::Lsr => self.modify(bus, mode, |cpu, value| {
                cpu.regs.p.set_if(C, value & 0x01 != 0);
                value >> 1
            }),
            Mnemonic::Rol => self.modify(bus, mode, |cpu, value| {
                let carry_in = cpu.regs.p.carry();
                cpu.regs.p.set_if(C, value & 0x80 != 0);
                (value << 1) | carry_in
            }),
            Mnemonic::Ror => self.modify(bus, mode, |cpu, value| {
                let carry_in = cpu.regs.p.carry() << 7;
                cpu.regs.p.set_if(C, value & 0x01 != 0);
                (value >> 1) | carry_in
            }),
            Mnemonic::Inc => self.modify(bus, mode, |_, value| value.wrapping_add(1)),
            Mnemonic::Dec => self.modify(bus, mode, |_, value| value.wrapping_sub(1)),

            // Register increments and transfers
            Mnemonic::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Mnemonic::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p.update_nz(self.regs.y);
            }
            Mnemonic::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Mnemonic::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.y);
            }
            Mnemonic::Tax => {
                self.regs.x = self.regs.a;
                self.regs.p.update_nz(self.regs.x);
            }
            Mnemonic::Tay => {
                self.regs.y = self.regs.a;
                self.regs.p.update_nz(self.regs.y);
            }
            Mnemonic::Txa => {
                self.regs.a = self.regs.x;
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Tya => {
                self.regs.a = self.regs.y;
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Tsx => {
                self.regs.x = self.regs.s;
                self.regs.p.update_nz(self.regs.x);
            }
            Mnemonic::Txs => self.regs.s = self.regs.x,

            // Stack
            Mnemonic::Pha => self.push(bus, self.regs.a),
            Mnemonic::Php => self.push(bus, self.regs.p.to_byte_brk()),
            Mnemonic::Pla => {
                self.regs.a = self.pull(bus);
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Plp => {
                let value = self.pull(bus);
                self.regs.p = Status::from_byte(value);
            }

            // Flags
            Mnemonic::Clc => self.regs.p.clear(C),
            Mnemonic::Sec => self.regs.p.set(C),
            Mnemonic::Cli => self.regs.p.clear(I),
            Mnemonic::Sei => self.regs.p.set(I),
            Mnemonic::Cld => self.regs.p.clear(D),
            Mnemonic::Sed => self.regs.p.set(D),
            Mnemonic::Clv => self.regs.p.clear(V),

            // Branches
            Mnemonic::Bcc => return Some(base + self.branch_if(bus, !self.regs.p.is_set(C))),
            Mnemonic::Bcs => return Some(base + self.branch_if(bus, self.regs.p.is_set(C))),
            Mnemonic::Bne => return Some(base + self.branch_if(bus, !self.regs.p.is_set(Z))),
            Mnemonic::Beq => return Some(base + self.branch_if(bus, self.regs.p.is_set(Z))),
            Mnemonic::Bpl => return Some(base + self.branch_if(bus, !self.regs.p.is_set(N))),
            Mnemonic::Bmi => return Some(base + self.branch_if(bus, self.regs.p.is_set(N))),
            Mnemonic::Bvc => return Some(base + self.branch_if(bus, !self.regs.p.is_set(V))),
            Mnemonic::Bvs => return Some(base + self.branch_if(bus, self.regs.p.is_set(V))),

            // Jumps and returns
            Mnemonic::Jmp => {
                if let Operand::Address(target) = self.decode_operand(bus, mode) {
                    self.regs.pc = target;
                }
            }
            Mnemonic::Jsr => {
                let target = self.fetch_word(bus);
                self.push_word(bus, self.regs.pc.wrapping_sub(1));
                self.regs.pc = target;
            }
            Mnemonic::Rts => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
            }
            Mnemonic::Rti => {
                let status = self.pull(bus);
                self.regs.p = Status::from_byte(status);
                self.regs.pc = self.pull_word(bus);
            }
            Mnemonic::Brk => return self.brk(bus),

            Mnemonic::Nop => {}
            Mnemonic::Kil => return Some(0),
        }

        None
    }

    fn read_operand<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode) -> u8 {
        let operand = self.decode_operand(bus, mode);
        self.load(bus, operand)
    }

    fn write_operand<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode, value: u8) {
        let operand = self.decode_operand(bus, mode);
        self.store(bus, operand, value);
    }

    /// Read-modify-write on memory or the accumulator; sets N and Z from
    /// the result.
    fn modify<B: Bus>(&mut self, bus: &mut B, mode: AddressingMode, op: impl FnOnce(&mut Self, u8) -> u8) {
        let operand = self.decode_operand(bus, mode);
        let value = self.load(bus, operand);
        let result = op(self, value);
        self.store(bus, operand, result);
        self.regs.p.update_nz(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        match register.cmp(&value) {
            std::cmp::Ordering::Less => {
                self.regs.p.clear(C);
                self.regs.p.clear(Z);
            }
            std::cmp::Ordering::Equal => {
                self.regs.p.set(C);
                self.regs.p.set(Z);
            }
            std::cmp::Ordering::Greater => {
                self.regs.p.set(C);
                self.regs.p.clear(Z);
            }
        }
        self.regs.p.set_if(N, result & 0x80 != 0);
    }

    fn brk<B: Bus>(&mut self, bus: &mut B) -> Option<u32> {
        if self.config.brk_mode == BrkMode::HaltWhenInterruptsDisabled && self.regs.p.is_set(I) {
            return Some(0);
        }
        // Skip the padding byte.
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.push_word(bus, self.regs.pc);
        self.push(bus, self.regs.p.to_byte_brk());
        self.regs.p.set(I);
        self.regs.pc = Self::read_word(bus, IRQ_VECTOR);
        None
    }

    // =========================================================================
    // ALU
    // =========================================================================

    fn do_adc(&mut self, value: u8) {
        if !self.regs.p.is_set(D) {
            self.do_adc_binary(value);
            return;
        }
        match self.config.decimal_mode {
            DecimalMode::Compatible => self.do_adc_decimal_compatible(value),
            DecimalMode::Nmos => self.do_adc_decimal_nmos(value),
        }
    }

    fn do_sbc(&mut self, value: u8) {
        if !self.regs.p.is_set(D) {
            // SBC is ADC with the inverted operand
            self.do_adc_binary(!value);
            return;
        }
        match self.config.decimal_mode {
            DecimalMode::Compatible => self.do_sbc_decimal_compatible(value),
            DecimalMode::Nmos => self.do_sbc_decimal_nmos(value),
        }
    }

    /// Binary sum with carry; sets C and V. Returns the 8-bit result.
    fn binary_sum(&mut self, value: u8) -> u8 {
        let a = self.regs.a;
        let sum = u16::from(a) + u16::from(value) + u16::from(self.regs.p.carry());
        let result = sum as u8;
        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (value ^ result) & 0x80 != 0);
        result
    }

    fn do_adc_binary(&mut self, value: u8) {
        self.regs.a = self.binary_sum(value);
        self.regs.p.update_nz(self.regs.a);
    }

    /// Nibble-corrected BCD sum; C and V come from the binary sum.
    fn do_adc_decimal_compatible(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = self.regs.p.carry();

        let mut lo = (a & 0x0F) + (value & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = u16::from(a >> 4) + u16::from(value >> 4) + u16::from(lo > 0x0F);
        if hi > 9 {
            hi += 6;
        }

        self.binary_sum(value);
        self.regs.a = ((hi << 4) as u8) | (lo & 0x0F);
        self.regs.p.update_nz(self.regs.a);
    }

    /// Nibble-corrected BCD difference; C and V come from the binary
    /// difference.
    fn do_sbc_decimal_compatible(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = i16::from(1 - self.regs.p.carry());

        let mut lo = i16::from(a & 0x0F) - i16::from(value & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(value >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }

        self.binary_sum(!value);
        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_adc_decimal_nmos(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = self.regs.p.carry();

        let mut lo = (a & 0x0F) + (value & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = (a >> 4) + (value >> 4) + u8::from(lo > 0x0F);

        // Z from the binary sum, N and V from the intermediate high nibble
        let binary = a.wrapping_add(value).wrapping_add(carry);
        self.regs.p.set_if(Z, binary == 0);
        self.regs.p.set_if(N, hi & 0x08 != 0);
        let intermediate = hi << 4;
        self.regs
            .p
            .set_if(V, (a ^ intermediate) & !(a ^ value) & 0x80 != 0);

        if hi > 9 {
            hi += 6;
        }
        self.regs.p.set_if(C, hi > 0x0F);
        self.regs.a = (hi << 4) | (lo & 0x0F);
    }

    fn do_sbc_decimal_nmos(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = i16::from(1 - self.regs.p.carry());

        // All flags follow the binary difference
        let binary = i16::from(a) - i16::from(value) - borrow;
        self.regs.p.set_if(C, binary >= 0);
        self.regs.p.set_if(Z, (binary as u8) == 0);
        self.regs.p.set_if(N, binary & 0x80 != 0);
        self.regs.p.set_if(
            V,
            (i16::from(a) ^ binary) & (i16::from(a) ^ i16::from(value)) & 0x80 != 0,
        );

        let mut lo = i16::from(a & 0x0F) - i16::from(value & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(value >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }
        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
    }
}

impl Cpu for Mos6502 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        self.execute_next(bus)
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn interrupt(&mut self) -> bool {
        self.irq_pending = true;
        !self.regs.p.is_set(I)
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn reset<B: Bus>(&mut self, bus: &mut B) {
        Mos6502::reset(self, bus);
    }
}

const QUERY_PATHS: &[&str] = &[
    "a",
    "x",
    "y",
    "s",
    "pc",
    "p",
    "flags.c",
    "flags.z",
    "flags.i",
    "flags.d",
    "flags.v",
    "flags.n",
    "halted",
    "cycles",
    "frames",
    "cycles_per_frame",
    "irq",
];

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.p;
        Some(match path {
            "a" => self.regs.a.into(),
            "x" => self.regs.x.into(),
            "y" => self.regs.y.into(),
            "s" | "sp" => self.regs.s.into(),
            "pc" => self.regs.pc.into(),
            "p" => p.0.into(),
            "flags.c" => p.is_set(C).into(),
            "flags.z" => p.is_set(Z).into(),
            "flags.i" => p.is_set(I).into(),
            "flags.d" => p.is_set(D).into(),
            "flags.b" => p.is_set(B).into(),
            "flags.u" => p.is_set(U).into(),
            "flags.v" => p.is_set(V).into(),
            "flags.n" => p.is_set(N).into(),
            "halted" => self.halted.into(),
            "cycles" => self.total_cycles.into(),
            "frames" => self.frame_count.into(),
            "cycles_per_frame" => self.cycles_per_frame.into(),
            "irq" => (self.irq_pending || self.irq.is_asserted()).into(),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn cpu_at(bus: &mut SimpleBus, origin: u16, program: &[u8]) -> Mos6502 {
        bus.load(origin, program);
        bus.load(RESET_VECTOR, &origin.to_le_bytes());
        let mut cpu = Mos6502::new();
        cpu.reset(bus);
        cpu
    }

    #[test]
    fn reset_state() {
        let mut bus = SimpleBus::new();
        let cpu = cpu_at(&mut bus, 0xC000, &[]);
        assert_eq!(cpu.regs.pc, 0xC000);
        assert_eq!(cpu.regs.s, 0xFF);
        assert_eq!(cpu.regs.p.0, 0x22);
        assert_eq!(cpu.total_cycles(), 0);
    }

    #[test]
    fn frame_budget_at_two_megahertz() {
        assert_eq!(Mos6502::new().cycles_per_frame(), 40_000);
    }

    #[test]
    fn unimplemented_opcode_halts_as_one_byte_nop() {
        let mut bus = SimpleBus::new();
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xFF]);
        assert_eq!(cpu.execute_next(&mut bus), 0);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 0x0201);
        assert_eq!(bus.cycles(), 0);
    }

    #[test]
    fn bus_ticked_with_instruction_cycles() {
        let mut bus = SimpleBus::new();
        // LDA #$01; STA $2000
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xA9, 0x01, 0x8D, 0x00, 0x20]);
        assert_eq!(cpu.execute_next(&mut bus), 2);
        assert_eq!(cpu.execute_next(&mut bus), 4);
        assert_eq!(bus.cycles(), 6);
        assert_eq!(bus.peek(0x2000), 0x01);
    }

    #[test]
    fn brk_with_interrupts_enabled_vectors() {
        let mut bus = SimpleBus::new();
        bus.load(IRQ_VECTOR, &[0x00, 0x30]);
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0x00, 0xEA]);
        assert_eq!(cpu.execute_next(&mut bus), 7);
        assert_eq!(cpu.regs.pc, 0x3000);
        assert!(cpu.regs.p.is_set(I));
        // Return address skips the padding byte; pushed status has B set.
        assert_eq!(bus.peek(0x01FF), 0x02);
        assert_eq!(bus.peek(0x01FE), 0x02);
        assert_eq!(bus.peek(0x01FD) & B, B);
    }

    #[test]
    fn brk_hardware_mode_never_halts() {
        let mut bus = SimpleBus::new();
        bus.load(IRQ_VECTOR, &[0x00, 0x30]);
        bus.load(0x0200, &[0x78, 0x00]);
        bus.load(RESET_VECTOR, &[0x00, 0x02]);
        let mut cpu = Mos6502::with_config(CpuConfig::hardware());
        cpu.reset(&mut bus);
        cpu.execute_next(&mut bus);
        assert_eq!(cpu.execute_next(&mut bus), 7);
        assert_eq!(cpu.regs.pc, 0x3000);
    }

    #[test]
    fn irq_line_serviced_only_when_enabled() {
        let mut bus = SimpleBus::new();
        bus.load(IRQ_VECTOR, &[0x00, 0x40]);
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0x78]);
        let line = IrqLine::new();
        cpu.connect_irq(line.clone());
        line.set(0, true);

        cpu.regs.p.set(I);
        assert_eq!(cpu.service_interrupts(&mut bus), 0);

        cpu.regs.p.clear(I);
        assert_eq!(cpu.service_interrupts(&mut bus), 7);
        assert_eq!(cpu.regs.pc, 0x4000);
        assert!(cpu.regs.p.is_set(I));
        // Hardware IRQ pushes status without B.
        assert_eq!(bus.peek(0x01FD) & B, 0);
    }

    #[test]
    fn nmi_ignores_interrupt_disable() {
        let mut bus = SimpleBus::new();
        bus.load(NMI_VECTOR, &[0x00, 0x50]);
        let mut cpu = cpu_at(&mut bus, 0x0200, &[]);
        cpu.regs.p.set(I);
        cpu.nmi();
        assert_eq!(cpu.service_interrupts(&mut bus), 7);
        assert_eq!(cpu.regs.pc, 0x5000);
        // Edge-triggered: taken once.
        assert_eq!(cpu.service_interrupts(&mut bus), 0);
    }

    #[test]
    fn every_instruction_polling_takes_irq_mid_frame() {
        let mut bus = SimpleBus::new();
        bus.load(IRQ_VECTOR, &[0x00, 0x40]);
        bus.load(0x0200, &[0xEA]);
        bus.load(RESET_VECTOR, &[0x00, 0x02]);
        let mut cpu = Mos6502::with_config(CpuConfig {
            irq_polling: IrqPolling::EveryInstruction,
            ..CpuConfig::default()
        });
        cpu.reset(&mut bus);
        cpu.irq_line().set(0, true);
        assert_eq!(cpu.execute_next(&mut bus), 2 + 7);
        assert_eq!(cpu.regs.pc, 0x4000);
    }

    #[test]
    fn run_single_frame_carries_overrun() {
        let mut bus = SimpleBus::new();
        // JMP $0200 forever: 3 cycles, 40000 is not a multiple of 3.
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0x4C, 0x00, 0x02]);
        let first = cpu.run_single_frame(&mut bus);
        assert_eq!(first, 40_002);
        let second = cpu.run_single_frame(&mut bus);
        assert_eq!(second, 39_999);
        assert_eq!(cpu.frame_count(), 2);
        assert_eq!(cpu.total_cycles(), first + second);
    }

    #[test]
    fn decimal_compatible_adc() {
        let mut bus = SimpleBus::new();
        // SED; CLC; LDA #$19; ADC #$28
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xF8, 0x18, 0xA9, 0x19, 0x69, 0x28]);
        for _ in 0..4 {
            cpu.execute_next(&mut bus);
        }
        assert_eq!(cpu.regs.a, 0x47);
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn decimal_compatible_sbc() {
        let mut bus = SimpleBus::new();
        // SED; SEC; LDA #$42; SBC #$15
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xF8, 0x38, 0xA9, 0x42, 0xE9, 0x15]);
        for _ in 0..4 {
            cpu.execute_next(&mut bus);
        }
        assert_eq!(cpu.regs.a, 0x27);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn decimal_compatible_flags_follow_binary_sum() {
        // SED; CLC; LDA #$50; ADC #$50: BCD wraps to 00 but $A0 has no carry
        let mut bus = SimpleBus::new();
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xF8, 0x18, 0xA9, 0x50, 0x69, 0x50]);
        for _ in 0..4 {
            cpu.execute_next(&mut bus);
        }
        assert_eq!(cpu.regs.a, 0x00);
        assert!(!cpu.regs.p.is_set(C));
        assert!(cpu.regs.p.is_set(V));
        assert!(cpu.regs.p.is_set(Z));

        // SED; CLC; LDA #$99; ADC #$01: BCD 100 wraps, binary $9A does not
        let mut bus = SimpleBus::new();
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xF8, 0x18, 0xA9, 0x99, 0x69, 0x01]);
        for _ in 0..4 {
            cpu.execute_next(&mut bus);
        }
        assert_eq!(cpu.regs.a, 0x00);
        assert!(!cpu.regs.p.is_set(C));
        assert!(!cpu.regs.p.is_set(V));
    }

    #[test]
    fn decimal_compatible_sbc_flags_follow_binary_difference() {
        // SED; SEC; LDA #$80; SBC #$01: BCD 79, binary $7F overflows
        let mut bus = SimpleBus::new();
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xF8, 0x38, 0xA9, 0x80, 0xE9, 0x01]);
        for _ in 0..4 {
            cpu.execute_next(&mut bus);
        }
        assert_eq!(cpu.regs.a, 0x79);
        assert!(cpu.regs.p.is_set(C));
        assert!(cpu.regs.p.is_set(V));
        assert!(!cpu.regs.p.is_set(N));

        // SED; SEC; LDA #$20; SBC #$2A: non-BCD operand, both nibbles
        // corrected to $90 and the borrow taken from $20 - $2A
        let mut bus = SimpleBus::new();
        let mut cpu = cpu_at(&mut bus, 0x0200, &[0xF8, 0x38, 0xA9, 0x20, 0xE9, 0x2A]);
        for _ in 0..4 {
            cpu.execute_next(&mut bus);
        }
        assert_eq!(cpu.regs.a, 0x90);
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn decimal_nmos_carry_from_high_nibble() {
        let mut bus = SimpleBus::new();
        bus.load(0x0200, &[0xF8, 0x18, 0xA9, 0x50, 0x69, 0x50]);
        bus.load(RESET_VECTOR, &[0x00, 0x02]);
        let mut cpu = Mos6502::with_config(CpuConfig::hardware());
        cpu.reset(&mut bus);
        for _ in 0..4 {
            cpu.execute_next(&mut bus);
        }
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn observable_queries() {
        let mut bus = SimpleBus::new();
        let cpu = cpu_at(&mut bus, 0x1234, &[]);
        assert_eq!(cpu.query("pc"), Some(Value::U16(0x1234)));
        assert_eq!(cpu.query("flags.z"), Some(Value::Bool(true)));
        assert_eq!(cpu.query("bogus"), None);
        for path in cpu.query_paths() {
            assert!(cpu.query(path).is_some(), "{path}");
        }
    }
}
