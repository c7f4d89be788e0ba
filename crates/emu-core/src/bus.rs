//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// Components access memory and peripherals through this trait. The bus
/// handles address decoding and routing to the appropriate device. The CPU
/// has no memory of its own and no knowledge of what backs an address.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Advance bus-attached devices by `cycles` CPU cycles.
    ///
    /// Called once after every instruction with the cycles it consumed.
    /// Devices whose timers piggy-back on the CPU clock hook in here.
    fn tick(&mut self, cycles: u32) {
        let _ = cycles;
    }
}

/// Flat 64 KB RAM bus with no devices.
///
/// Used by tests and by hosts that only need a processor and memory.
pub struct SimpleBus {
    ram: Box<[u8; 0x1_0000]>,
    cycles: u64,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x1_0000]),
            cycles: 0,
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at 64 KB.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[usize::from(addr)] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read a byte without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Total cycles reported through `tick()`.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    fn tick(&mut self, cycles: u32) {
        self.cycles += u64::from(cycles);
    }
}
