//! Core traits and types for cycle-counted emulation.
//!
//! The CPU is the timing master. Peripherals advance by the number of CPU
//! cycles each instruction consumed, and real time is paced one video frame
//! at a time.

mod bus;
mod clock;
mod cpu;
mod irq;
mod observable;
mod pacer;
mod tickable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use clock::MasterClock;
pub use cpu::Cpu;
pub use irq::IrqLine;
pub use observable::{Observable, Value};
pub use pacer::FramePacer;
pub use tickable::Tickable;
pub use ticks::Ticks;
