//! BBC Micro Model B emulator core.
//!
//! The CPU runs at 2 MHz and owns the frame budget: one 50 Hz frame is
//! 40,000 CPU cycles. The two 6522 VIAs run at 1 MHz and are ticked from
//! the bus after every instruction, together with the keyboard clock and
//! its auto-scan counter. VIA interrupt changes reach the CPU through a
//! shared `IrqLine`.

mod bbc;
mod bus;
pub mod config;
pub mod error;
pub mod ic32;
pub mod input;
mod keyboard;
mod memory;
mod system_via;

pub use bbc::Bbc;
pub use bus::BbcBus;
pub use config::BbcConfig;
pub use error::{BbcError, RomError};
pub use ic32::Ic32;
pub use input::{InputEvent, InputQueue, KeyEvent, KeyboardHandle};
pub use keyboard::{KeyboardMatrix, MIN_HOLD_CYCLES};
pub use memory::BbcMemory;
pub use system_via::{Lights, LightsHandler, SystemVia};

/// CPU clock (2 MHz).
pub const CPU_CLOCK_HZ: u64 = 2_000_000;

/// Field rate of the PAL display.
pub const FRAME_RATE: u32 = 50;

/// IRQ line source number of the system VIA.
pub const SYSTEM_VIA_IRQ: u8 = 0;

/// IRQ line source number of the user VIA.
pub const USER_VIA_IRQ: u8 = 1;
