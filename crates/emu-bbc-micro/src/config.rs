//! BBC Micro configuration.

use mos_6502::CpuConfig;

/// Configuration for constructing a BBC Micro instance.
///
/// ROM images are passed in as raw bytes; their sizes are checked when the
/// machine is built.
pub struct BbcConfig {
    /// OS ROM (16K, mapped at $C000-$FFFF).
    pub os_rom: Vec<u8>,
    /// Sideways ROMs as `(bank, image)`. Images are 8K (mirrored) or 16K.
    pub paged_roms: Vec<(u8, Vec<u8>)>,
    /// CPU behaviour. The clock rate and frame rate are always set to the
    /// machine's 2 MHz and 50 Hz when the machine is built.
    pub cpu: CpuConfig,
}

impl BbcConfig {
    /// Configuration with the given OS ROM and no sideways ROMs.
    #[must_use]
    pub fn new(os_rom: Vec<u8>) -> Self {
        Self {
            os_rom,
            paged_roms: Vec::new(),
            cpu: CpuConfig::default(),
        }
    }

    /// Add a sideways ROM image in `bank`.
    #[must_use]
    pub fn with_paged_rom(mut self, bank: u8, image: Vec<u8>) -> Self {
        self.paged_roms.push((bank, image));
        self
    }
}

impl Default for BbcConfig {
    /// A blank 16K OS ROM with no sideways ROMs.
    fn default() -> Self {
        Self::new(vec![0; 0x4000])
    }
}
