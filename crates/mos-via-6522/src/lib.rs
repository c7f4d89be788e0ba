//! MOS 6522 Versatile Interface Adapter (VIA).
//!
//! The 6522 provides two 8-bit I/O ports, two 16-bit timers, a serial
//! shift register, and an interrupt controller. The BBC Micro has two:
//! the system VIA (keyboard, sound, addressable latch, vertical sync) and
//! the user VIA (printer and user port).
//!
//! # Registers ($0-$F)
//!
//! | Reg | Name | Description                         |
//! |-----|------|-------------------------------------|
//! | $0  | ORB  | Port B data (handshake)             |
//! | $1  | ORA  | Port A data (handshake)             |
//! | $2  | DDRB | Port B data direction (1 = output)  |
//! | $3  | DDRA | Port A data direction (1 = output)  |
//! | $4  | T1CL | Timer 1 counter low (read clears T1 IRQ) |
//! | $5  | T1CH | Timer 1 counter high (write starts T1) |
//! | $6  | T1LL | Timer 1 latch low                   |
//! | $7  | T1LH | Timer 1 latch high                  |
//! | $8  | T2CL | Timer 2 counter low (read clears T2 IRQ) |
//! | $9  | T2CH | Timer 2 counter high (write starts T2) |
//! | $A  | SR   | Shift register                      |
//! | $B  | ACR  | Auxiliary control register           |
//! | $C  | PCR  | Peripheral control register          |
//! | $D  | IFR  | Interrupt flag register              |
//! | $E  | IER  | Interrupt enable register            |
//! | $F  | ORA  | Port A data (no handshake)           |
//!
//! # Timing
//!
//! Counters are kept in half-cycle units of the VIA's 1 MHz clock, which
//! is one unit per 2 MHz CPU cycle. A timer armed with latch N starts at
//! `N*2+1` and underflows when the count drops below zero, N+1 VIA cycles
//! later. In continuous mode the reload adds `N*2+4` (a period of N+2
//! cycles); otherwise the counter free-runs through 65536 cycles without
//! signalling again.

use emu_core::{Observable, Tickable, Value};

/// Callback invoked with the new IRQ level whenever it changes.
pub type InterruptHandler = Box<dyn FnMut(bool) + Send>;

/// Half-cycle units added when a timer free-runs past an underflow.
const FREE_RUN_UNITS: i32 = 0x2_0000;

/// MOS 6522 Versatile Interface Adapter.
pub struct Via6522 {
    /// Port A output register.
    port_a: u8,
    /// Port B output register.
    port_b: u8,
    /// Port A data direction register (1 = output).
    ddr_a: u8,
    /// Port B data direction register (1 = output).
    ddr_b: u8,
    /// External input lines for port A (active-high, directly readable).
    pub external_a: u8,
    /// External input lines for port B (active-high, directly readable).
    pub external_b: u8,

    /// Timer 1 counter in half-cycle units.
    timer1_counter: i32,
    /// Timer 1 latch (16-bit, reloaded into counter on underflow).
    timer1_latch: u16,
    /// Timer 1 signals on its next underflow (one-shot mode).
    timer1_armed: bool,

    /// Timer 2 counter in half-cycle units.
    timer2_counter: i32,
    /// Timer 2 latch (only the low byte is latched; the high byte is
    /// written straight into the counter).
    timer2_latch: u16,
    /// Timer 2 signals on its next underflow.
    timer2_armed: bool,

    /// Shift register. Shifting is not emulated.
    shift_register: u8,

    /// Auxiliary control register (ACR).
    /// Bit 7: PB7 square wave output from T1
    /// Bit 6: T1 continuous
    /// Bit 5: T2 pulse counting (counted like timed mode here)
    /// Bits 4-2: Shift register control
    /// Bit 1: PB latching enable
    /// Bit 0: PA latching enable
    acr: u8,

    /// Peripheral control register (PCR).
    /// Bits 7-5: CB2 control
    /// Bit 4: CB1 edge (0 = negative, 1 = positive)
    /// Bits 3-1: CA2 control
    /// Bit 0: CA1 edge (0 = negative, 1 = positive)
    pcr: u8,

    /// Interrupt flag register (IFR). Bit 7 mirrors `(IFR & IER & 0x7F) != 0`.
    /// Bit 6: Timer 1
    /// Bit 5: Timer 2
    /// Bit 4: CB1
    /// Bit 3: CB2
    /// Bit 2: Shift register
    /// Bit 1: CA1
    /// Bit 0: CA2
    ifr: u8,

    /// Interrupt enable register (IER).
    ier: u8,

    /// Previous CA1 input state (for edge detection).
    ca1_prev: bool,
    /// Previous CB1 input state (for edge detection).
    cb1_prev: bool,
    /// CA2 held low by a handshake/pulse output cycle.
    ca2_low: bool,
    /// CB2 held low by a handshake/pulse output cycle.
    cb2_low: bool,

    /// PB7 output toggle (toggled by T1 when ACR bit 7 is set).
    pb7_output: bool,

    /// Last IRQ level reported to the handler.
    irq_level: bool,
    interrupt_handler: Option<InterruptHandler>,
}

impl Via6522 {
    /// Create a new VIA with all registers in their reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            port_a: 0,
            port_b: 0,
            ddr_a: 0,
            ddr_b: 0,
            external_a: 0xFF,
            external_b: 0xFF,
            timer1_counter: 0,
            timer1_latch: 0,
            timer1_armed: false,
            timer2_counter: 0,
            timer2_latch: 0,
            timer2_armed: false,
            shift_register: 0,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            ca1_prev: false,
            cb1_prev: false,
            ca2_low: false,
            cb2_low: false,
            pb7_output: false,
            irq_level: false,
            interrupt_handler: None,
        }
    }

    /// Install the callback driven on every IRQ level change.
    pub fn set_interrupt_handler(&mut self, handler: InterruptHandler) {
        self.interrupt_handler = Some(handler);
    }

    /// Clear all registers and disarm both timers.
    ///
    /// External inputs and the interrupt handler survive; the handler is
    /// told if the IRQ line drops.
    pub fn reset(&mut self) {
        self.port_a = 0;
        self.port_b = 0;
        self.ddr_a = 0;
        self.ddr_b = 0;
        self.timer1_counter = 0;
        self.timer1_latch = 0;
        self.timer1_armed = false;
        self.timer2_counter = 0;
        self.timer2_latch = 0;
        self.timer2_armed = false;
        self.shift_register = 0;
        self.acr = 0;
        self.pcr = 0;
        self.ifr = 0;
        self.ier = 0;
        self.ca2_low = false;
        self.cb2_low = false;
        self.pb7_output = false;
        self.update_irq();
    }

    /// Advance both timers by `cycles` CPU cycles (2 MHz).
    pub fn tick_cycles(&mut self, cycles: u32) {
        self.advance(cycles as i32);
    }

    /// Check if the VIA has an active (and enabled) interrupt.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        (self.ifr & self.ier & 0x7F) != 0
    }

    /// Read a VIA register.
    pub fn read(&mut self, reg: u8) -> u8 {
        let value = match reg & 0x0F {
            0x00 => {
                // ORB: Port B data with handshake: clears CB1/CB2 flags
                self.ifr &= !(IFR_CB1 | IFR_CB2);
                self.read_port_b()
            }
            0x01 => {
                // ORA: Port A data with handshake: clears CA1/CA2 flags
                self.ifr &= !(IFR_CA1 | IFR_CA2);
                self.start_ca2_handshake();
                self.read_port_a()
            }
            0x02 => self.ddr_b,
            0x03 => self.ddr_a,
            0x04 => {
                // T1C-L: read low byte AND clear T1 interrupt flag
                self.ifr &= !IFR_T1;
                Self::counter_value(self.timer1_counter) as u8
            }
            0x05 => (Self::counter_value(self.timer1_counter) >> 8) as u8,
            0x06 => self.timer1_latch as u8,
            0x07 => (self.timer1_latch >> 8) as u8,
            0x08 => {
                // T2C-L: read low byte AND clear T2 interrupt flag
                self.ifr &= !IFR_T2;
                Self::counter_value(self.timer2_counter) as u8
            }
            0x09 => (Self::counter_value(self.timer2_counter) >> 8) as u8,
            0x0A => {
                self.ifr &= !IFR_SR;
                self.shift_register
            }
            0x0B => self.acr,
            0x0C => self.pcr,
            0x0D => return self.ifr,
            // IER: bit 7 always reads as 1
            0x0E => return self.ier | 0x80,
            // ORA no-handshake: read port A without clearing CA1/CA2 flags
            _ => return self.read_port_a(),
        };
        self.update_irq();
        value
    }

    /// Write a VIA register.
    pub fn write(&mut self, reg: u8, value: u8) {
        match reg & 0x0F {
            0x00 => {
                // ORB: Port B data with handshake: clears CB1/CB2 flags
                self.ifr &= !(IFR_CB1 | IFR_CB2);
                self.port_b = value;
                if matches!(self.cb2_control(), 0b100 | 0b101) {
                    self.cb2_low = true;
                }
            }
            0x01 => {
                // ORA: Port A data with handshake: clears CA1/CA2 flags
                self.ifr &= !(IFR_CA1 | IFR_CA2);
                self.port_a = value;
                self.start_ca2_handshake();
            }
            0x02 => self.ddr_b = value,
            0x03 => self.ddr_a = value,
            0x04 | 0x06 => {
                // T1L-L: write latch low byte only
                self.timer1_latch = (self.timer1_latch & 0xFF00) | u16::from(value);
            }
            0x05 => {
                // T1C-H: write latch high byte, load counter from latch,
                // arm timer, clear T1 interrupt flag.
                self.timer1_latch = (self.timer1_latch & 0x00FF) | (u16::from(value) << 8);
                self.timer1_counter = Self::armed_count(self.timer1_latch);
                self.timer1_armed = true;
                self.ifr &= !IFR_T1;
                if self.acr & 0x80 != 0 {
                    self.pb7_output = false;
                }
                log::trace!("VIA T1 armed, latch=${:04X}", self.timer1_latch);
            }
            0x07 => {
                // T1L-H: write latch high byte only, clear T1 interrupt flag
                self.timer1_latch = (self.timer1_latch & 0x00FF) | (u16::from(value) << 8);
                self.ifr &= !IFR_T1;
            }
            0x08 => {
                // T2L-L: write latch low byte
                self.timer2_latch = (self.timer2_latch & 0xFF00) | u16::from(value);
            }
            0x09 => {
                // T2C-H: load counter (high from value, low from latch),
                // arm timer, clear T2 interrupt flag.
                self.timer2_latch = (self.timer2_latch & 0x00FF) | (u16::from(value) << 8);
                self.timer2_counter = Self::armed_count(self.timer2_latch);
                self.timer2_armed = true;
                self.ifr &= !IFR_T2;
            }
            0x0A => {
                self.shift_register = value;
                self.ifr &= !IFR_SR;
            }
            0x0B => self.acr = value,
            0x0C => {
                self.pcr = value;
                self.ca2_low = false;
                self.cb2_low = false;
            }
            0x0D => {
                // IFR: writing 1s clears the corresponding flags
                self.ifr &= !(value & 0x7F);
            }
            0x0E => {
                // IER: bit 7 selects set (1) or clear (0) mode
                if value & 0x80 != 0 {
                    self.ier |= value & 0x7F;
                } else {
                    self.ier &= !(value & 0x7F);
                }
            }
            _ => {
                // ORA no-handshake: write port A without clearing CA1/CA2
                self.port_a = value;
            }
        }
        self.update_irq();
    }

    /// Set the CA1 input line. Call this when the external signal changes.
    ///
    /// Edge detection: triggers on the configured edge (PCR bit 0).
    /// Sets IFR bit 1 (CA1) on the active edge.
    pub fn set_ca1(&mut self, state: bool) {
        let positive = self.pcr & 0x01 != 0;
        let triggered = if positive {
            !self.ca1_prev && state
        } else {
            self.ca1_prev && !state
        };
        if triggered {
            self.ifr |= IFR_CA1;
            // Handshake mode releases CA2 on the CA1 active edge.
            if self.ca2_control() == 0b100 {
                self.ca2_low = false;
            }
        }
        self.ca1_prev = state;
        self.update_irq();
    }

    /// Set the CB1 input line. Call this when the external signal changes.
    ///
    /// Edge detection: triggers on the configured edge (PCR bit 4).
    /// Sets IFR bit 4 (CB1) on the active edge.
    pub fn set_cb1(&mut self, state: bool) {
        let positive = self.pcr & 0x10 != 0;
        let triggered = if positive {
            !self.cb1_prev && state
        } else {
            self.cb1_prev && !state
        };
        if triggered {
            self.ifr |= IFR_CB1;
            if self.cb2_control() == 0b100 {
                self.cb2_low = false;
            }
        }
        self.cb1_prev = state;
        self.update_irq();
    }

    /// Set the CA2 flag directly. Used when external logic detects the
    /// condition that should set the CA2 interrupt flag.
    pub fn set_ca2_flag(&mut self) {
        self.ifr |= IFR_CA2;
        self.update_irq();
    }

    /// Set the CB2 flag directly.
    pub fn set_cb2_flag(&mut self) {
        self.ifr |= IFR_CB2;
        self.update_irq();
    }

    /// Level driven on CA2, or `None` when CA2 is an input.
    #[must_use]
    pub fn ca2_output(&self) -> Option<bool> {
        Self::control_line_output(self.ca2_control(), self.ca2_low)
    }

    /// Level driven on CB2, or `None` when CB2 is an input.
    #[must_use]
    pub fn cb2_output(&self) -> Option<bool> {
        Self::control_line_output(self.cb2_control(), self.cb2_low)
    }

    /// Read port A output value (combines port register and DDR).
    #[must_use]
    pub fn port_a_output(&self) -> u8 {
        self.port_a & self.ddr_a
    }

    /// Read port B output value (combines port register and DDR).
    ///
    /// When ACR bit 7 is set, bit 7 reflects the T1 toggle output instead
    /// of port_b bit 7.
    #[must_use]
    pub fn port_b_output(&self) -> u8 {
        let mut out = self.port_b & self.ddr_b;
        if self.acr & 0x80 != 0 {
            out = (out & 0x7F) | if self.pb7_output { 0x80 } else { 0 };
        }
        out
    }

    /// Get the current IFR value, including the bit 7 summary.
    #[must_use]
    pub fn ifr(&self) -> u8 {
        self.ifr
    }

    #[must_use]
    pub fn ier(&self) -> u8 {
        self.ier
    }

    #[must_use]
    pub fn acr(&self) -> u8 {
        self.acr
    }

    #[must_use]
    pub fn pcr(&self) -> u8 {
        self.pcr
    }

    /// Timer 1 counter as the CPU would read it.
    #[must_use]
    pub fn timer1_counter(&self) -> u16 {
        Self::counter_value(self.timer1_counter)
    }

    /// Timer 2 counter as the CPU would read it.
    #[must_use]
    pub fn timer2_counter(&self) -> u16 {
        Self::counter_value(self.timer2_counter)
    }

    // --- Internal helpers ---

    const fn armed_count(latch: u16) -> i32 {
        latch as i32 * 2 + 1
    }

    fn counter_value(units: i32) -> u16 {
        units.div_euclid(2) as u16
    }

    fn ca2_control(&self) -> u8 {
        (self.pcr >> 1) & 0x07
    }

    fn cb2_control(&self) -> u8 {
        (self.pcr >> 5) & 0x07
    }

    fn control_line_output(control: u8, held_low: bool) -> Option<bool> {
        match control {
            0b100 | 0b101 => Some(!held_low),
            0b110 => Some(false),
            0b111 => Some(true),
            _ => None,
        }
    }

    fn start_ca2_handshake(&mut self) {
        if matches!(self.ca2_control(), 0b100 | 0b101) {
            self.ca2_low = true;
        }
    }

    fn read_port_a(&self) -> u8 {
        (self.port_a & self.ddr_a) | (self.external_a & !self.ddr_a)
    }

    fn read_port_b(&self) -> u8 {
        let mut val = (self.port_b & self.ddr_b) | (self.external_b & !self.ddr_b);
        if self.acr & 0x80 != 0 {
            val = (val & 0x7F) | if self.pb7_output { 0x80 } else { 0 };
        }
        val
    }

    fn advance(&mut self, units: i32) {
        // Pulse mode releases the control lines after one cycle.
        if self.ca2_control() == 0b101 {
            self.ca2_low = false;
        }
        if self.cb2_control() == 0b101 {
            self.cb2_low = false;
        }

        self.timer1_counter -= units;
        while self.timer1_counter < 0 {
            let continuous = self.acr & 0x40 != 0;
            if self.timer1_armed || continuous {
                self.ifr |= IFR_T1;
                if self.acr & 0x80 != 0 {
                    self.pb7_output = !self.pb7_output;
                }
            }
            if continuous {
                self.timer1_counter += i32::from(self.timer1_latch) * 2 + 4;
            } else {
                self.timer1_armed = false;
                self.timer1_counter += FREE_RUN_UNITS;
            }
        }

        self.timer2_counter -= units;
        while self.timer2_counter < 0 {
            if self.timer2_armed {
                self.ifr |= IFR_T2;
                self.timer2_armed = false;
            }
            self.timer2_counter += FREE_RUN_UNITS;
        }

        self.update_irq();
    }

    /// Recompute IFR bit 7 and report level changes to the handler.
    fn update_irq(&mut self) {
        let level = self.irq_active();
        if level {
            self.ifr |= 0x80;
        } else {
            self.ifr &= 0x7F;
        }
        if level != self.irq_level {
            self.irq_level = level;
            if let Some(handler) = self.interrupt_handler.as_mut() {
                handler(level);
            }
        }
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

impl Tickable for Via6522 {
    /// One 1 MHz VIA cycle.
    fn tick(&mut self) {
        self.advance(2);
    }
}

const QUERY_PATHS: &[&str] = &[
    "ora",
    "orb",
    "ddra",
    "ddrb",
    "acr",
    "pcr",
    "ifr",
    "ier",
    "sr",
    "t1.counter",
    "t1.latch",
    "t1.units",
    "t1.armed",
    "t2.counter",
    "t2.latch",
    "t2.units",
    "t2.armed",
    "pb7",
    "irq",
];

impl Observable for Via6522 {
    fn query(&self, path: &str) -> Option<Value> {
        Some(match path {
            "ora" => self.port_a.into(),
            "orb" => self.port_b.into(),
            "ddra" => self.ddr_a.into(),
            "ddrb" => self.ddr_b.into(),
            "acr" => self.acr.into(),
            "pcr" => self.pcr.into(),
            "ifr" => self.ifr.into(),
            "ier" => self.ier.into(),
            "sr" => self.shift_register.into(),
            "t1.counter" => self.timer1_counter().into(),
            "t1.latch" => self.timer1_latch.into(),
            "t1.units" => self.timer1_counter.into(),
            "t1.armed" => self.timer1_armed.into(),
            "t2.counter" => self.timer2_counter().into(),
            "t2.latch" => self.timer2_latch.into(),
            "t2.units" => self.timer2_counter.into(),
            "t2.armed" => self.timer2_armed.into(),
            "pb7" => self.pb7_output.into(),
            "irq" => self.irq_level.into(),
            _ => return None,
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}

// IFR/IER bit masks
pub const IFR_CA2: u8 = 0x01;
pub const IFR_CA1: u8 = 0x02;
pub const IFR_SR: u8 = 0x04;
pub const IFR_CB2: u8 = 0x08;
pub const IFR_CB1: u8 = 0x10;
pub const IFR_T2: u8 = 0x20;
pub const IFR_T1: u8 = 0x40;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Handler that records every level it is given.
    fn recorder(via: &mut Via6522) -> Arc<Mutex<Vec<bool>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        via.set_interrupt_handler(Box::new(move |level| {
            sink.lock().expect("recorder lock").push(level);
        }));
        log
    }

    #[test]
    fn timer1_countdown_and_underflow() {
        let mut via = Via6522::new();
        via.write(0x04, 3); // T1L-L
        via.write(0x05, 0); // T1C-H = start (loads counter from latch)

        assert!(via.timer1_armed);
        assert_eq!(via.timer1_counter(), 3);
        assert_eq!(via.ifr & IFR_T1, 0);

        via.tick(); // 3 -> 2
        assert_eq!(via.timer1_counter(), 2);
        via.tick(); // 2 -> 1
        via.tick(); // 1 -> 0
        assert_eq!(via.ifr & IFR_T1, 0);
        via.tick(); // underflow
        assert_ne!(via.ifr & IFR_T1, 0);
    }

    #[test]
    fn timer1_one_shot_signals_once() {
        let mut via = Via6522::new();
        via.write(0x04, 2);
        via.write(0x05, 0);

        via.tick_n(emu_core::Ticks::new(3));
        assert!(!via.timer1_armed);
        assert_ne!(via.ifr & IFR_T1, 0);

        via.write(0x0D, IFR_T1);
        // Free-runs through a full 16-bit period without signalling.
        via.tick_n(emu_core::Ticks::new(70_000));
        assert_eq!(via.ifr & IFR_T1, 0);
    }

    #[test]
    fn timer1_continuous_period_is_latch_plus_two() {
        let mut via = Via6522::new();
        via.write(0x0B, 0x40); // Continuous mode
        via.write(0x04, 2);
        via.write(0x05, 0); // Start (counter = 2)

        via.tick_n(emu_core::Ticks::new(3));
        assert_ne!(via.ifr & IFR_T1, 0);
        via.write(0x0D, IFR_T1);

        via.tick_n(emu_core::Ticks::new(3));
        assert_eq!(via.ifr & IFR_T1, 0);
        via.tick();
        assert_ne!(via.ifr & IFR_T1, 0);
    }

    #[test]
    fn cpu_cycles_count_half_as_fast() {
        let mut via = Via6522::new();
        via.write(0x04, 10);
        via.write(0x05, 0);
        via.tick_cycles(4);
        assert_eq!(via.timer1_counter(), 8);
        via.tick_cycles(1);
        assert_eq!(via.timer1_counter(), 8);
        via.tick_cycles(1);
        assert_eq!(via.timer1_counter(), 7);
    }

    #[test]
    fn latch_ff_fires_on_tick_256_exactly_once() {
        let mut via = Via6522::new();
        let log = recorder(&mut via);
        via.write(0x0E, 0xC1);
        via.write(0x04, 0xFF);
        via.write(0x05, 0x00);

        via.tick_n(emu_core::Ticks::new(255));
        assert!(log.lock().expect("lock").is_empty());
        via.tick();
        assert_eq!(*log.lock().expect("lock"), vec![true]);
        via.tick_n(emu_core::Ticks::new(1000));
        assert_eq!(log.lock().expect("lock").len(), 1);
    }

    #[test]
    fn handler_called_on_level_changes_only() {
        let mut via = Via6522::new();
        let log = recorder(&mut via);
        via.write(0x0E, 0x80 | IFR_CA2 | IFR_CA1);

        via.set_ca2_flag();
        via.set_ca2_flag();
        via.write(0x0D, IFR_CA2);
        assert_eq!(*log.lock().expect("lock"), vec![true, false]);
    }

    #[test]
    fn ifr_bit7_tracks_enabled_flags() {
        let mut via = Via6522::new();
        via.set_cb2_flag();
        assert_eq!(via.read(0x0D), IFR_CB2);
        via.write(0x0E, 0x80 | IFR_CB2);
        assert_eq!(via.read(0x0D), 0x80 | IFR_CB2);
        via.write(0x0E, IFR_CB2);
        assert_eq!(via.read(0x0D), IFR_CB2);
    }

    #[test]
    fn timer1_write_high_starts_and_clears_irq() {
        let mut via = Via6522::new();
        via.ifr = IFR_T1;
        via.write(0x04, 10);
        via.write(0x05, 0);
        assert!(via.timer1_armed);
        assert_eq!(via.ifr & IFR_T1, 0);
        assert_eq!(via.timer1_counter(), 10);
    }

    #[test]
    fn timer1_read_low_clears_irq() {
        let mut via = Via6522::new();
        via.ifr = IFR_T1;
        let _ = via.read(0x04);
        assert_eq!(via.ifr & IFR_T1, 0);
    }

    #[test]
    fn timer2_one_shot() {
        let mut via = Via6522::new();
        via.write(0x08, 3); // T2L-L
        via.write(0x09, 0); // T2C-H = start

        assert!(via.timer2_armed);
        via.tick_n(emu_core::Ticks::new(3));
        assert_eq!(via.ifr & IFR_T2, 0);
        via.tick();
        assert!(!via.timer2_armed);
        assert_ne!(via.ifr & IFR_T2, 0);
    }

    #[test]
    fn timer2_read_low_clears_irq() {
        let mut via = Via6522::new();
        via.ifr = IFR_T2;
        let _ = via.read(0x08);
        assert_eq!(via.ifr & IFR_T2, 0);
    }

    #[test]
    fn ifr_write_clears_flags() {
        let mut via = Via6522::new();
        via.ifr = IFR_T1 | IFR_T2 | IFR_CA1;
        via.write(0x0D, IFR_T1 | IFR_CA1);
        assert_eq!(via.ifr, IFR_T2);
    }

    #[test]
    fn ier_set_clear_mode() {
        let mut via = Via6522::new();
        via.write(0x0E, 0x80 | IFR_T1 | IFR_CB1);
        assert_eq!(via.ier & IFR_T1, IFR_T1);
        assert_eq!(via.ier & IFR_CB1, IFR_CB1);

        via.write(0x0E, IFR_T1);
        assert_eq!(via.ier & IFR_T1, 0);
        assert_eq!(via.ier & IFR_CB1, IFR_CB1);
    }

    #[test]
    fn ier_reads_with_bit7_set() {
        let mut via = Via6522::new();
        via.ier = 0x42;
        assert_eq!(via.read(0x0E), 0xC2);
    }

    #[test]
    fn cb1_edge_sets_flag() {
        let mut via = Via6522::new();
        via.pcr = 0x10; // CB1 positive edge
        via.set_cb1(true);
        assert_ne!(via.ifr & IFR_CB1, 0);
    }

    #[test]
    fn cb1_negative_edge() {
        let mut via = Via6522::new();
        via.cb1_prev = true;
        via.set_cb1(false);
        assert_ne!(via.ifr & IFR_CB1, 0);
    }

    #[test]
    fn ca1_edge_sets_flag() {
        let mut via = Via6522::new();
        via.pcr = 0x01; // CA1 positive edge
        via.set_ca1(true);
        assert_ne!(via.ifr & IFR_CA1, 0);
    }

    #[test]
    fn external_port_reads() {
        let mut via = Via6522::new();
        via.ddr_a = 0x0F;
        via.port_a = 0xAB;
        via.external_a = 0xC0;
        // Output bits 0x0B mixed with input bits 0xC0.
        assert_eq!(via.read(0x0F), 0xCB);
    }

    #[test]
    fn port_b_external() {
        let mut via = Via6522::new();
        via.external_b = 0x42;
        assert_eq!(via.read(0x00), 0x42);
    }

    #[test]
    fn pb7_toggle_in_continuous_mode() {
        let mut via = Via6522::new();
        via.write(0x0B, 0xC0); // Continuous + PB7 output
        via.write(0x02, 0x80);
        via.write(0x04, 1);
        via.write(0x05, 0);

        assert!(!via.pb7_output);
        via.tick_n(emu_core::Ticks::new(2));
        assert!(via.pb7_output);
        assert_eq!(via.port_b_output() & 0x80, 0x80);
        via.tick_n(emu_core::Ticks::new(3));
        assert!(!via.pb7_output);
    }

    #[test]
    fn irq_active_requires_both_flag_and_enable() {
        let mut via = Via6522::new();
        via.ifr = IFR_T1;
        assert!(!via.irq_active());
        via.ier = IFR_T1;
        assert!(via.irq_active());
        via.ifr = 0;
        assert!(!via.irq_active());
    }

    #[test]
    fn read_orb_clears_cb_flags() {
        let mut via = Via6522::new();
        via.ifr = IFR_CB1 | IFR_CB2 | IFR_T1;
        let _ = via.read(0x00);
        assert_eq!(via.ifr & IFR_CB1, 0);
        assert_eq!(via.ifr & IFR_CB2, 0);
        assert_ne!(via.ifr & IFR_T1, 0);
    }

    #[test]
    fn read_ora_clears_ca_flags() {
        let mut via = Via6522::new();
        via.ifr = IFR_CA1 | IFR_CA2 | IFR_T2;
        let _ = via.read(0x01);
        assert_eq!(via.ifr & IFR_CA1, 0);
        assert_eq!(via.ifr & IFR_CA2, 0);
        assert_ne!(via.ifr & IFR_T2, 0);
    }

    #[test]
    fn ora_no_handshake_preserves_ca_flags() {
        let mut via = Via6522::new();
        via.ifr = IFR_CA1 | IFR_CA2;
        let _ = via.read(0x0F);
        assert_ne!(via.ifr & IFR_CA1, 0);
        assert_ne!(via.ifr & IFR_CA2, 0);
    }

    #[test]
    fn timer1_latch_write_does_not_start() {
        let mut via = Via6522::new();
        via.write(0x06, 0x10);
        via.write(0x07, 0x00);
        assert!(!via.timer1_armed);
        via.ifr = IFR_T1;
        via.write(0x07, 0x00);
        assert_eq!(via.ifr & IFR_T1, 0);
    }

    #[test]
    fn control_line_outputs() {
        let mut via = Via6522::new();
        assert_eq!(via.ca2_output(), None);

        via.write(0x0C, 0b110 << 1);
        assert_eq!(via.ca2_output(), Some(false));
        via.write(0x0C, 0b111 << 1 | 0b111 << 5);
        assert_eq!(via.ca2_output(), Some(true));
        assert_eq!(via.cb2_output(), Some(true));

        // Handshake: low after an ORA access until CA1 fires.
        via.write(0x0C, 0b100 << 1 | 0x01);
        let _ = via.read(0x01);
        assert_eq!(via.ca2_output(), Some(false));
        via.set_ca1(true);
        assert_eq!(via.ca2_output(), Some(true));

        // Pulse: low for one cycle after an ORB write.
        via.write(0x0C, 0b101 << 5);
        via.write(0x00, 0x00);
        assert_eq!(via.cb2_output(), Some(false));
        via.tick();
        assert_eq!(via.cb2_output(), Some(true));
    }

    #[test]
    fn reset_clears_registers_and_lowers_irq() {
        let mut via = Via6522::new();
        let log = recorder(&mut via);
        via.write(0x0E, 0x80 | IFR_CA2);
        via.set_ca2_flag();
        via.write(0x04, 0x34);
        via.write(0x05, 0x12);

        via.reset();
        assert_eq!(via.ifr(), 0);
        assert_eq!(via.ier(), 0);
        assert_eq!(via.timer1_counter(), 0);
        assert!(!via.timer1_armed);
        assert_eq!(*log.lock().expect("lock"), vec![true, false]);
    }

    #[test]
    fn observable_paths_resolve() {
        let via = Via6522::new();
        for path in via.query_paths() {
            assert!(via.query(path).is_some(), "{path}");
        }
        assert_eq!(via.query("ier"), Some(Value::U8(0)));
    }
}
