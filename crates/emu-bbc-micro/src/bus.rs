//! BBC Micro bus: memory and SHEILA I/O routing.
//!
//! Implements `emu_core::Bus`. Everything is memory-mapped; the I/O pages
//! sit at the top of the OS ROM window:
//!
//! | Range         | Device                                   |
//! |---------------|------------------------------------------|
//! | $FC00-$FDFF   | FRED/JIM expansion pages (unfitted, $FF) |
//! | $FE00-$FE07   | 6845 CRTC (register file only)           |
//! | $FE20-$FE2F   | Video ULA (write-only)                   |
//! | $FE30-$FE3F   | ROMSEL (write-only)                      |
//! | $FE40-$FE5F   | System VIA                               |
//! | $FE60-$FE7F   | User VIA                                 |
//!
//! Other SHEILA addresses read $FF and ignore writes.

use std::sync::mpsc::Receiver;

use emu_core::Bus;
use mos_via_6522::Via6522;

use crate::input::{KeyEvent, drain_key_events};
use crate::memory::BbcMemory;
use crate::system_via::SystemVia;

/// Value read from unmapped addresses.
const FLOATING_BUS: u8 = 0xFF;

/// The BBC Micro bus, implementing `emu_core::Bus`.
///
/// Owns memory and every peripheral. The CPU reaches them only through the
/// `Bus` trait.
pub struct BbcBus {
    pub memory: BbcMemory,
    pub system_via: SystemVia,
    pub user_via: Via6522,
    /// CRTC address register and register file. Nothing is displayed.
    crtc_address: u8,
    crtc_registers: [u8; 18],
    /// Video ULA control register and palette.
    ula_control: u8,
    ula_palette: [u8; 16],
    /// Key events from `KeyboardHandle`s.
    key_events: Receiver<KeyEvent>,
}

impl BbcBus {
    #[must_use]
    pub fn new(memory: BbcMemory, key_events: Receiver<KeyEvent>) -> Self {
        Self {
            memory,
            system_via: SystemVia::new(),
            user_via: Via6522::new(),
            crtc_address: 0,
            crtc_registers: [0; 18],
            ula_control: 0,
            ula_palette: [0; 16],
            key_events,
        }
    }

    /// Reset both VIAs, ROMSEL and the video register stubs. RAM and held
    /// keys survive.
    pub fn reset(&mut self) {
        self.system_via.reset();
        self.user_via.reset();
        self.memory.set_romsel(0);
        self.crtc_address = 0;
        self.crtc_registers = [0; 18];
        self.ula_control = 0;
        self.ula_palette = [0; 16];
    }

    #[must_use]
    pub fn crtc_register(&self, index: u8) -> u8 {
        self.crtc_registers
            .get(usize::from(index))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn ula_control(&self) -> u8 {
        self.ula_control
    }

    /// Physical colour for logical colour `index` (0-15).
    #[must_use]
    pub fn ula_palette(&self, index: u8) -> u8 {
        self.ula_palette[usize::from(index & 0x0F)]
    }

    /// Apply key events queued by other threads.
    pub fn drain_key_events(&mut self) {
        drain_key_events(&self.key_events, self.system_via.keyboard_mut());
    }

    fn crtc_read(&self, addr: u16) -> u8 {
        // Only the data register reads back, and only R12-R17.
        if addr & 1 == 1 && (12..=17).contains(&self.crtc_address) {
            self.crtc_registers[usize::from(self.crtc_address)]
        } else {
            0
        }
    }

    fn crtc_write(&mut self, addr: u16, value: u8) {
        if addr & 1 == 0 {
            self.crtc_address = value & 0x1F;
        } else if let Some(reg) = self.crtc_registers.get_mut(usize::from(self.crtc_address)) {
            *reg = value;
        }
    }

    fn ula_write(&mut self, addr: u16, value: u8) {
        if addr & 1 == 0 {
            self.ula_control = value;
        } else {
            self.ula_palette[usize::from(value >> 4)] = value & 0x0F;
        }
    }
}

impl Bus for BbcBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0xFC00..=0xFDFF => FLOATING_BUS,
            0xFE00..=0xFE07 => self.crtc_read(addr),
            0xFE40..=0xFE5F => self.system_via.read(addr as u8),
            0xFE60..=0xFE7F => self.user_via.read(addr as u8),
            0xFE08..=0xFE3F | 0xFE80..=0xFEFF => FLOATING_BUS,
            _ => self.memory.read(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0xFE00..=0xFE07 => self.crtc_write(addr, value),
            0xFE20..=0xFE2F => self.ula_write(addr, value),
            0xFE30..=0xFE3F => self.memory.set_romsel(value),
            0xFE40..=0xFE5F => self.system_via.write(addr as u8, value),
            0xFE60..=0xFE7F => self.user_via.write(addr as u8, value),
            0xFC00..=0xFDFF | 0xFE08..=0xFE1F | 0xFE80..=0xFEFF => {}
            _ => self.memory.write(addr, value),
        }
    }

    /// Key events first, then the VIAs and keyboard advance by the
    /// instruction's cycles.
    fn tick(&mut self, cycles: u32) {
        self.drain_key_events();
        self.system_via.tick(cycles);
        self.user_via.tick_cycles(cycles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::{Observable, Value};
    use std::sync::mpsc;

    fn bus() -> BbcBus {
        let mut rom = vec![0; 0x4000];
        rom[0x3F00] = 0xAB; // $FF00
        rom[0x3C00] = 0xCD; // $FC00, hidden by FRED
        let memory = BbcMemory::new(&rom).expect("valid ROM");
        let (_tx, rx) = mpsc::channel();
        BbcBus::new(memory, rx)
    }

    #[test]
    fn io_pages_hide_os_rom() {
        let mut bus = bus();
        assert_eq!(bus.read(0xFC00), 0xFF);
        assert_eq!(bus.read(0xFD80), 0xFF);
        assert_eq!(bus.read(0xFE80), 0xFF);
        assert_eq!(bus.read(0xFE20), 0xFF);
        assert_eq!(bus.read(0xFE30), 0xFF);
        assert_eq!(bus.read(0xFF00), 0xAB);
    }

    #[test]
    fn romsel_decodes_whole_window() {
        let mut bus = bus();
        bus.write(0xFE3F, 0x05);
        assert_eq!(bus.memory.romsel(), 5);
    }

    #[test]
    fn via_windows_mirror_every_sixteen_bytes() {
        let mut bus = bus();
        bus.write(0xFE4B, 0x40); // system VIA ACR
        assert_eq!(bus.read(0xFE5B), 0x40);
        assert_eq!(bus.system_via.via().acr(), 0x40);

        bus.write(0xFE62, 0xFF); // user VIA DDRB
        assert_eq!(bus.read(0xFE72), 0xFF);
        assert_eq!(bus.user_via.query("ddrb"), Some(Value::U8(0xFF)));
        assert_eq!(bus.system_via.query("ddrb"), Some(Value::U8(0x00)));
    }

    #[test]
    fn crtc_register_file() {
        let mut bus = bus();
        bus.write(0xFE00, 12);
        bus.write(0xFE01, 0x30);
        assert_eq!(bus.read(0xFE01), 0x30);
        assert_eq!(bus.crtc_register(12), 0x30);

        bus.write(0xFE00, 0);
        bus.write(0xFE01, 0x7F);
        assert_eq!(bus.read(0xFE01), 0, "R0 is write-only");
        assert_eq!(bus.crtc_register(0), 0x7F);
    }

    #[test]
    fn ula_palette_writes() {
        let mut bus = bus();
        bus.write(0xFE20, 0x9C);
        bus.write(0xFE21, 0x37);
        assert_eq!(bus.ula_control(), 0x9C);
        assert_eq!(bus.ula_palette(3), 0x07);
    }

    #[test]
    fn tick_runs_via_timers() {
        let mut bus = bus();
        bus.write(0xFE64, 0x10);
        bus.write(0xFE65, 0x00); // user VIA T1 = $0010
        bus.tick(4);
        assert_eq!(bus.user_via.timer1_counter(), 0x0E);
    }
}
