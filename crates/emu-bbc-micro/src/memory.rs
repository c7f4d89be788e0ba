//! BBC Micro memory: 32K RAM, sideways ROM banks and the OS ROM.
//!
//! | Range         | Contents                                   |
//! |---------------|--------------------------------------------|
//! | $0000-$7FFF   | RAM                                        |
//! | $8000-$BFFF   | Sideways ROM bank selected by ROMSEL       |
//! | $C000-$FFFF   | OS ROM (minus the $FC00-$FEFF I/O pages)   |
//!
//! The I/O pages are decoded by the bus before memory is consulted.

use crate::error::RomError;

const RAM_SIZE: usize = 0x8000;
const ROM_SIZE: usize = 0x4000;
const HALF_ROM_SIZE: usize = 0x2000;
const BANKS: usize = 16;

/// RAM and ROM storage plus the ROMSEL latch.
pub struct BbcMemory {
    ram: Box<[u8; RAM_SIZE]>,
    os_rom: Vec<u8>,
    /// Sideways ROM images, always 16K (8K images are stored mirrored).
    paged_roms: [Option<Vec<u8>>; BANKS],
    /// Selected sideways bank (0-15).
    romsel: u8,
}

impl BbcMemory {
    /// Create memory with the given 16K OS ROM and empty sideways banks.
    pub fn new(os_rom: &[u8]) -> Result<Self, RomError> {
        if os_rom.len() != ROM_SIZE {
            return Err(RomError::OsRomSize(os_rom.len()));
        }
        log::debug!("OS ROM loaded, reset vector ${:02X}{:02X}", os_rom[0x3FFD], os_rom[0x3FFC]);
        Ok(Self {
            ram: Box::new([0; RAM_SIZE]),
            os_rom: os_rom.to_vec(),
            paged_roms: std::array::from_fn(|_| None),
            romsel: 0,
        })
    }

    /// Install a sideways ROM. 8K images appear twice in the 16K window.
    pub fn load_paged_rom(&mut self, bank: u8, image: &[u8]) -> Result<(), RomError> {
        if usize::from(bank) >= BANKS {
            return Err(RomError::BankOutOfRange(bank));
        }
        let rom = match image.len() {
            ROM_SIZE => image.to_vec(),
            HALF_ROM_SIZE => image.repeat(2),
            len => return Err(RomError::PagedRomSize(len)),
        };
        log::debug!("sideways ROM bank {bank}: {} bytes", image.len());
        self.paged_roms[usize::from(bank)] = Some(rom);
        Ok(())
    }

    /// Read RAM or ROM. Addresses in the I/O pages read the OS ROM; the
    /// bus never routes them here.
    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        let addr = usize::from(addr);
        match addr {
            0x0000..=0x7FFF => self.ram[addr],
            0x8000..=0xBFFF => self.paged_roms[usize::from(self.romsel)]
                .as_ref()
                .map_or(0xFF, |rom| rom[addr - 0x8000]),
            _ => self.os_rom[addr - 0xC000],
        }
    }

    /// Write RAM. ROM writes are ignored.
    pub fn write(&mut self, addr: u16, value: u8) {
        if addr < 0x8000 {
            self.ram[usize::from(addr)] = value;
        } else {
            log::trace!("ignored ROM write ${addr:04X} = ${value:02X}");
        }
    }

    /// Copy `data` into RAM starting at `addr`. Bytes past $7FFF are dropped.
    pub fn load_ram(&mut self, addr: u16, data: &[u8]) {
        let start = usize::from(addr).min(RAM_SIZE);
        let end = (start + data.len()).min(RAM_SIZE);
        self.ram[start..end].copy_from_slice(&data[..end - start]);
    }

    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram[..]
    }

    #[must_use]
    pub fn romsel(&self) -> u8 {
        self.romsel
    }

    /// Select a sideways bank. Only the low four bits are decoded.
    pub fn set_romsel(&mut self, value: u8) {
        let bank = value & 0x0F;
        if bank != self.romsel {
            log::trace!("ROMSEL {} -> {bank}", self.romsel);
        }
        self.romsel = bank;
    }

    #[must_use]
    pub fn has_paged_rom(&self, bank: u8) -> bool {
        self.paged_roms
            .get(usize::from(bank))
            .is_some_and(Option::is_some)
    }
}
