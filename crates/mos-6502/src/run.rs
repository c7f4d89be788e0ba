//! Frame scheduler and cross-thread run control.
//!
//! The run loop is the only scheduler. It executes one frame's cycle
//! budget, waits for the frame deadline, publishes frame statistics and
//! services the interrupt line. Other threads talk to it only through
//! `RunControl` and read counters through `CpuStats`.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use emu_core::{Bus, FramePacer, MasterClock, Ticks};

use crate::Mos6502;

/// Why `run()` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A zero-cycle instruction executed (halt, KIL or unknown opcode).
    Halted,
    /// Another thread requested a stop.
    Stopped,
    /// Single-step mode executed its one instruction.
    Suspended,
}

/// Statistics published at the end of each paced frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Cycles executed in the frame.
    pub cycles: u64,
    /// Effective clock speed over the frame.
    pub mhz: f64,
    /// Measured frames per second.
    pub frame_rate: f64,
}

/// Run/stop/step requests shared between the run loop and a host thread.
#[derive(Debug, Default)]
pub struct RunControl {
    stop: AtomicBool,
    step: AtomicBool,
    frame_events: Mutex<Option<Sender<FrameStats>>>,
}

impl RunControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run loop to return at the next frame boundary.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Consume a pending stop request.
    pub fn take_stop_request(&self) -> bool {
        self.stop.swap(false, Ordering::AcqRel)
    }

    /// Make the next `run()` execute a single instruction.
    pub fn request_step(&self) {
        self.step.store(true, Ordering::Release);
    }

    /// Consume a pending step request.
    pub fn take_step_request(&self) -> bool {
        self.step.swap(false, Ordering::AcqRel)
    }

    /// Deliver `FrameStats` to `sender` after every frame.
    pub fn set_frame_sender(&self, sender: Option<Sender<FrameStats>>) {
        if let Ok(mut slot) = self.frame_events.lock() {
            *slot = sender;
        }
    }

    /// Send frame statistics to the registered receiver, if any.
    ///
    /// A receiver that has hung up is dropped.
    pub fn publish(&self, stats: FrameStats) {
        let Ok(mut slot) = self.frame_events.lock() else {
            return;
        };
        if let Some(sender) = slot.as_ref() {
            if sender.send(stats).is_err() {
                log::debug!("frame event receiver dropped");
                *slot = None;
            }
        }
    }
}

/// CPU counters readable from any thread.
#[derive(Debug, Default)]
pub struct CpuStats {
    cycles: AtomicU64,
    frames: AtomicU64,
}

impl CpuStats {
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub(crate) fn add_cycles(&self, cycles: u32) {
        self.cycles.fetch_add(u64::from(cycles), Ordering::Relaxed);
    }

    pub(crate) fn add_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.frames.store(0, Ordering::Relaxed);
    }
}

impl Mos6502 {
    /// Run from `start` until a halt, a stop request or, in single-step
    /// mode, one instruction.
    ///
    /// Each frame is paced to real time unless throttling is off in the
    /// configuration. Interrupts are sampled after the pacing wait; with
    /// `IrqPolling::EveryInstruction` they are also taken between
    /// instructions. A stop request is consumed when it ends the run.
    pub fn run<B: Bus>(&mut self, bus: &mut B, start: u16, single_step: bool) -> RunOutcome {
        self.run_with(bus, start, single_step, |_, _| {})
    }

    /// `run` with `before_frame(frame, bus)` called ahead of every frame's
    /// budget, where `frame` is the number of frames already completed.
    pub fn run_with<B, F>(
        &mut self,
        bus: &mut B,
        start: u16,
        single_step: bool,
        mut before_frame: F,
    ) -> RunOutcome
    where
        B: Bus,
        F: FnMut(u64, &mut B),
    {
        self.set_pc(start);
        self.resume();

        if single_step || self.control.take_step_request() {
            return if self.execute_next(bus) == 0 {
                RunOutcome::Halted
            } else {
                RunOutcome::Suspended
            };
        }

        let mut pacer = if self.config.throttle {
            FramePacer::new(self.config.frame_rate)
        } else {
            FramePacer::unthrottled(self.config.frame_rate)
        };

        loop {
            before_frame(self.frame_count(), bus);
            let cycles = self.run_single_frame(bus);
            if self.is_halted() {
                log::debug!("run loop halted after {} frames", self.frame_count());
                return RunOutcome::Halted;
            }

            let elapsed = pacer.wait_for_next_frame();
            self.publish_frame(cycles, elapsed, pacer.measured_frame_rate());

            self.service_interrupts(bus);

            if self.control.take_stop_request() {
                return RunOutcome::Stopped;
            }
        }
    }

    /// Send `FrameStats` for the frame just completed through the run
    /// control.
    pub fn publish_frame(&self, cycles: u64, elapsed: Duration, frame_rate: f64) {
        self.control.publish(FrameStats {
            frame: self.frame_count(),
            cycles,
            mhz: MasterClock::mhz(Ticks::new(cycles), elapsed.as_secs_f64()),
            frame_rate,
        });
    }
}
