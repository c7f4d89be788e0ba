//! Top-level BBC Micro system.
//!
//! The CPU is the timing master: it runs one frame's budget of 40,000
//! cycles, ticking the bus after every instruction so the VIAs and the
//! keyboard stay in step. Both VIAs pull a shared IRQ line, which the CPU
//! samples at the frame boundary (or after every instruction, if the CPU
//! is configured that way).

use std::sync::Arc;
use std::sync::mpsc::{self, Sender};

use emu_core::{Bus, FramePacer, IrqLine, Observable, Value};
use mos_6502::{CpuStats, Mos6502, RunControl, RunOutcome};

use crate::bus::BbcBus;
use crate::config::BbcConfig;
use crate::error::BbcError;
use crate::input::{InputQueue, KeyEvent, KeyboardHandle};
use crate::memory::BbcMemory;
use crate::system_via::LightsHandler;
use crate::{CPU_CLOCK_HZ, FRAME_RATE, SYSTEM_VIA_IRQ, USER_VIA_IRQ};

/// BBC Micro Model B.
pub struct Bbc {
    cpu: Mos6502,
    bus: BbcBus,
    irq: IrqLine,
    /// Timed input event queue, applied by `run_frame`.
    input_queue: InputQueue,
    /// Sending half of the bus's key event channel.
    key_sender: Sender<KeyEvent>,
    /// Measures wall time between `run_frame` calls; never blocks.
    frame_clock: FramePacer,
}

impl Bbc {
    /// Build a machine from `config` and reset the CPU.
    ///
    /// Fails if a ROM image has the wrong size or names a bank outside
    /// 0-15.
    pub fn new(config: &BbcConfig) -> Result<Self, BbcError> {
        let mut memory = BbcMemory::new(&config.os_rom)?;
        for (bank, image) in &config.paged_roms {
            memory.load_paged_rom(*bank, image)?;
        }

        let (key_sender, key_events) = mpsc::channel();
        let mut bus = BbcBus::new(memory, key_events);

        let irq = IrqLine::new();
        bus.system_via
            .set_interrupt_handler(irq.handler(SYSTEM_VIA_IRQ));
        bus.user_via.set_interrupt_handler(irq.handler(USER_VIA_IRQ));

        let mut cpu = Mos6502::with_config(config.cpu);
        cpu.connect_irq(irq.clone());
        cpu.initialise(&mut bus, CPU_CLOCK_HZ, FRAME_RATE);
        log::debug!(
            "BBC Micro ready: {} sideways ROM(s), {} cycles/frame",
            config.paged_roms.len(),
            cpu.cycles_per_frame()
        );

        Ok(Self {
            cpu,
            bus,
            irq,
            input_queue: InputQueue::new(),
            key_sender,
            frame_clock: FramePacer::unthrottled(FRAME_RATE),
        })
    }

    /// Run one frame and take any interrupt pending at its end.
    ///
    /// Input queue events due this frame are applied first and `FrameStats`
    /// are published through `control()` once the frame completes. Pacing
    /// is left to the caller. Returns the cycles executed, which is zero
    /// once the CPU has halted.
    pub fn run_frame(&mut self) -> u64 {
        self.input_queue.process(
            self.cpu.frame_count(),
            self.bus.system_via.keyboard_mut(),
        );
        let cycles = self.cpu.run_single_frame(&mut self.bus);
        if cycles > 0 {
            let elapsed = self.frame_clock.wait_for_next_frame();
            self.cpu
                .publish_frame(cycles, elapsed, self.frame_clock.measured_frame_rate());
        }
        cycles + u64::from(self.cpu.service_interrupts(&mut self.bus))
    }

    /// Execute one instruction. Returns its cycles, zero on a halt.
    pub fn step(&mut self) -> u32 {
        self.cpu.execute_next(&mut self.bus)
    }

    /// Run from `start` on the paced frame loop until a halt, a stop
    /// request through `control()`, or one instruction in single-step mode.
    ///
    /// Input queue events are applied ahead of each frame, as in
    /// `run_frame`.
    pub fn run(&mut self, start: u16, single_step: bool) -> RunOutcome {
        let input_queue = &mut self.input_queue;
        self.cpu
            .run_with(&mut self.bus, start, single_step, |frame, bus| {
                input_queue.process(frame, bus.system_via.keyboard_mut());
            })
    }

    /// Reset the peripherals and the CPU. RAM, sideways ROMs and held keys
    /// are kept.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.irq.clear_all();
        self.cpu.reset(&mut self.bus);
    }

    pub fn press_key(&mut self, row: u8, col: u8) {
        self.bus
            .system_via
            .keyboard_mut()
            .set_key_state(row, col, true);
    }

    pub fn release_key(&mut self, row: u8, col: u8) {
        self.bus
            .system_via
            .keyboard_mut()
            .set_key_state(row, col, false);
    }

    pub fn release_all_keys(&mut self) {
        self.bus.system_via.keyboard_mut().release_all_keys();
    }

    /// A handle other threads use to send key events. Events are applied
    /// on the next bus tick.
    #[must_use]
    pub fn keyboard_handle(&self) -> KeyboardHandle {
        KeyboardHandle::new(self.key_sender.clone())
    }

    pub fn input_queue(&mut self) -> &mut InputQueue {
        &mut self.input_queue
    }

    /// Install the caps/shift lock LED callback.
    pub fn set_lights_handler(&mut self, handler: LightsHandler) {
        self.bus.system_via.set_lights_handler(handler);
    }

    /// Copy `data` into RAM at `addr`.
    pub fn load_ram(&mut self, addr: u16, data: &[u8]) {
        self.bus.memory.load_ram(addr, data);
    }

    /// Read a byte the way the CPU would, including I/O side effects.
    pub fn read(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &BbcBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut BbcBus {
        &mut self.bus
    }

    #[must_use]
    pub fn irq_line(&self) -> &IrqLine {
        &self.irq
    }

    /// Run/stop/step control shared with other threads.
    #[must_use]
    pub fn control(&self) -> Arc<RunControl> {
        self.cpu.control()
    }

    #[must_use]
    pub fn stats(&self) -> Arc<CpuStats> {
        self.cpu.stats()
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.cpu.frame_count()
    }

    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.cpu.total_cycles()
    }
}

const QUERY_PATHS: &[&str] = &[
    "cpu.<path>",
    "sysvia.<path>",
    "uservia.<path>",
    "romsel",
    "irq",
    "frame",
    "cycles",
];

impl Observable for Bbc {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("sysvia.") {
            self.bus.system_via.query(rest)
        } else if let Some(rest) = path.strip_prefix("uservia.") {
            self.bus.user_via.query(rest)
        } else {
            match path {
                "romsel" => Some(self.bus.memory.romsel().into()),
                "irq" => Some(self.irq.is_asserted().into()),
                "frame" => Some(self.frame_count().into()),
                "cycles" => Some(self.total_cycles().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RomError;

    /// OS ROM whose reset vector points at a `JMP *` loop at $D000.
    fn looping_os_rom() -> Vec<u8> {
        let mut rom = vec![0; 0x4000];
        rom[0x1000..0x1003].copy_from_slice(&[0x4C, 0x00, 0xD0]);
        rom[0x3FFC] = 0x00;
        rom[0x3FFD] = 0xD0;
        rom
    }

    fn unthrottled(os_rom: Vec<u8>) -> BbcConfig {
        let mut config = BbcConfig::new(os_rom);
        config.cpu.throttle = false;
        config
    }

    #[test]
    fn new_rejects_bad_roms() {
        let err = Bbc::new(&BbcConfig::new(vec![0; 100])).err();
        assert!(matches!(err, Some(BbcError::Rom(RomError::OsRomSize(100)))));

        let config = BbcConfig::new(looping_os_rom()).with_paged_rom(16, vec![0; 0x4000]);
        let err = Bbc::new(&config).err();
        assert!(matches!(
            err,
            Some(BbcError::Rom(RomError::BankOutOfRange(16)))
        ));
    }

    #[test]
    fn reset_vector_loaded() {
        let bbc = Bbc::new(&unthrottled(looping_os_rom())).expect("valid config");
        assert_eq!(bbc.cpu().regs.pc, 0xD000);
        assert_eq!(bbc.cpu().cycles_per_frame(), 40_000);
    }

    #[test]
    fn run_frame_spends_one_frame_budget() {
        let mut bbc = Bbc::new(&unthrottled(looping_os_rom())).expect("valid config");
        let cycles = bbc.run_frame();
        // JMP is 3 cycles; the last one may overrun by up to 2.
        assert!((40_000..40_003).contains(&cycles));
        assert_eq!(bbc.frame_count(), 1);
        assert_eq!(bbc.cpu().regs.pc, 0xD000);
    }

    #[test]
    fn query_paths_route_to_components() {
        let bbc = Bbc::new(&unthrottled(looping_os_rom())).expect("valid config");
        assert_eq!(bbc.query("cpu.pc"), Some(Value::U16(0xD000)));
        assert_eq!(bbc.query("romsel"), Some(Value::U8(0)));
        assert_eq!(bbc.query("irq"), Some(Value::Bool(false)));
        assert_eq!(bbc.query("sysvia.ier"), Some(Value::U8(0)));
        assert_eq!(bbc.query("nope"), None);
    }

    #[test]
    fn reset_keeps_ram() {
        let mut bbc = Bbc::new(&unthrottled(looping_os_rom())).expect("valid config");
        bbc.load_ram(0x0070, &[0x12]);
        bbc.bus_mut().write(0xFE30, 0x04);
        bbc.run_frame();
        bbc.reset();
        assert_eq!(bbc.read(0x0070), 0x12);
        assert_eq!(bbc.bus().memory.romsel(), 0);
        assert_eq!(bbc.frame_count(), 0);
        assert_eq!(bbc.cpu().regs.pc, 0xD000);
    }
}
