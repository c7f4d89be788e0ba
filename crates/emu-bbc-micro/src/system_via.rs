//! System VIA and the hardware hanging off it.
//!
//! Port B bits 0-3 drive the IC32 addressable latch; bits 4-5 read the
//! joystick fire buttons and bits 6-7 the speech chip. Port A is the "slow
//! data bus" shared by the keyboard and the sound chip: with the keyboard
//! enabled through IC32 it selects a key (row in bits 4-6, column in bits
//! 0-3) and reads it back on bit 7; with the sound chip enabled it carries
//! the byte the chip latches. CA2 is the keyboard interrupt.

use emu_core::{Observable, Value};
use mos_via_6522::{InterruptHandler, Via6522};

use crate::ic32::Ic32;
use crate::keyboard::KeyboardMatrix;

/// Caps lock and shift lock LED state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lights {
    pub caps_lock: bool,
    pub shift_lock: bool,
}

/// Callback invoked when an IC32 write changes either LED.
pub type LightsHandler = Box<dyn FnMut(Lights) + Send>;

/// Port B inputs: fire buttons released, no speech chip.
const PORT_B_INPUTS: u8 = 0xFF;

/// System VIA with IC32, keyboard and sound latch.
pub struct SystemVia {
    via: Via6522,
    ic32: Ic32,
    keyboard: KeyboardMatrix,
    /// Row and column last driven onto the keyboard through port A.
    key_row: u8,
    key_col: u8,
    /// Last byte latched by the sound chip.
    sound_latch: u8,
    lights: Option<LightsHandler>,
}

impl SystemVia {
    #[must_use]
    pub fn new() -> Self {
        let mut via = Via6522::new();
        via.external_b = PORT_B_INPUTS;
        Self {
            via,
            ic32: Ic32::default(),
            keyboard: KeyboardMatrix::new(),
            key_row: 0,
            key_col: 0,
            sound_latch: 0,
            lights: None,
        }
    }

    pub fn set_interrupt_handler(&mut self, handler: InterruptHandler) {
        self.via.set_interrupt_handler(handler);
    }

    pub fn set_lights_handler(&mut self, handler: LightsHandler) {
        self.lights = Some(handler);
    }

    /// Reset the VIA, IC32 and sound latch. Held keys stay down.
    pub fn reset(&mut self) {
        self.via.reset();
        self.ic32 = Ic32::default();
        self.sound_latch = 0;
        self.key_row = 0;
        self.key_col = 0;
    }

    /// Read a register (low nibble of the address).
    pub fn read(&mut self, reg: u8) -> u8 {
        let reg = reg & 0x0F;
        if matches!(reg, 0x01 | 0x0F) {
            self.refresh_port_a_input();
        }
        self.via.read(reg)
    }

    /// Write a register (low nibble of the address).
    pub fn write(&mut self, reg: u8, value: u8) {
        let reg = reg & 0x0F;
        self.via.write(reg, value);
        match reg {
            0x00 | 0x02 => self.write_ic32(),
            0x01 | 0x03 | 0x0F => self.drive_slow_data_bus(),
            _ => {}
        }
        self.check_keyboard_interrupt();
    }

    /// Advance by `cycles` CPU cycles: VIA timers, keyboard clock,
    /// auto-scan counter, latch release and the keyboard interrupt.
    pub fn tick(&mut self, cycles: u32) {
        self.via.tick_cycles(cycles);
        self.keyboard.advance(cycles);
        if self.ic32.auto_scan() {
            self.keyboard.tick_auto_scan();
        }
        self.keyboard.clear_released_latches();
        self.check_keyboard_interrupt();
    }

    #[must_use]
    pub fn ic32(&self) -> Ic32 {
        self.ic32
    }

    #[must_use]
    pub fn lights(&self) -> Lights {
        Lights {
            caps_lock: self.ic32.caps_lock(),
            shift_lock: self.ic32.shift_lock(),
        }
    }

    #[must_use]
    pub fn sound_latch(&self) -> u8 {
        self.sound_latch
    }

    #[must_use]
    pub fn via(&self) -> &Via6522 {
        &self.via
    }

    #[must_use]
    pub fn keyboard(&self) -> &KeyboardMatrix {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardMatrix {
        &mut self.keyboard
    }

    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.via.irq_active()
    }

    fn refresh_port_a_input(&mut self) {
        let key = self.ic32.keyboard_enabled() && self.keyboard.key_at(self.key_row, self.key_col);
        self.via.external_a = if key { 0xFF } else { 0x7F };
    }

    /// Port B output drives IC32: bits 0-2 pick the latch bit, bit 3 is
    /// its new value.
    fn write_ic32(&mut self) {
        let before = self.ic32;
        if !self.ic32.write(self.via.port_b_output()) {
            return;
        }
        log::trace!("IC32 ${:02X} -> ${:02X}", before.0, self.ic32.0);

        if before.caps_lock() != self.ic32.caps_lock()
            || before.shift_lock() != self.ic32.shift_lock()
        {
            let lights = self.lights();
            if let Some(handler) = self.lights.as_mut() {
                handler(lights);
            }
        }

        if self.ic32.sound_enabled() && !before.sound_enabled() {
            self.latch_sound();
        }
        if self.ic32.keyboard_enabled() && !before.keyboard_enabled() {
            self.select_key();
        }
    }

    fn drive_slow_data_bus(&mut self) {
        if self.ic32.keyboard_enabled() {
            self.select_key();
        }
        if self.ic32.sound_enabled() {
            self.latch_sound();
        }
    }

    fn select_key(&mut self) {
        let out = self.via.port_a_output();
        self.key_row = (out >> 4) & 0x07;
        self.key_col = out & 0x0F;
        self.keyboard.set_row_mask(1 << self.key_row);
        self.keyboard.select_columns(1 << self.key_col);
    }

    fn latch_sound(&mut self) {
        self.sound_latch = self.via.port_a_output();
    }

    fn check_keyboard_interrupt(&mut self) {
        if self.keyboard.kbd_int_check(self.ic32, self.via.pcr()) {
            self.via.set_ca2_flag();
        }
    }
}

impl Default for SystemVia {
    fn default() -> Self {
        Self::new()
    }
}

const QUERY_PATHS: &[&str] = &[
    "ic32",
    "sound",
    "keyboard.row",
    "keyboard.col",
    "keyboard.scan_column",
    "keyboard.latched",
    "keyboard.clock",
];

impl Observable for SystemVia {
    fn query(&self, path: &str) -> Option<Value> {
        Some(match path {
            "ic32" => self.ic32.0.into(),
            "sound" => self.sound_latch.into(),
            "keyboard.row" => self.key_row.into(),
            "keyboard.col" => self.key_col.into(),
            "keyboard.scan_column" => self.keyboard.scan_column().into(),
            "keyboard.latched" => match self.keyboard.latched_key() {
                Some(key) => key.into(),
                None => return None,
            },
            "keyboard.clock" => self.keyboard.clock().into(),
            _ => return self.via.query(path),
        })
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
