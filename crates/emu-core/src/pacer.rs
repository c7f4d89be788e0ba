//! Real-time frame pacing.

use std::time::{Duration, Instant};

/// Paces emulation against a monotonic clock, one video frame at a time.
///
/// After the CPU has executed a frame's cycle budget the host calls
/// `wait_for_next_frame()`, which blocks until the frame's deadline. Waits
/// longer than a millisecond sleep; the remainder is spun.
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_duration: Duration,
    next_deadline: Instant,
    last_frame: Instant,
    last_frame_time: Duration,
    throttle: bool,
}

impl FramePacer {
    /// Create a pacer for the given frame rate (frames per second).
    #[must_use]
    pub fn new(frame_rate: u32) -> Self {
        let frame_duration = Duration::from_secs(1) / frame_rate.max(1);
        let now = Instant::now();
        Self {
            frame_duration,
            next_deadline: now + frame_duration,
            last_frame: now,
            last_frame_time: frame_duration,
            throttle: true,
        }
    }

    /// Create a pacer that never blocks (headless runs, tests).
    #[must_use]
    pub fn unthrottled(frame_rate: u32) -> Self {
        Self {
            throttle: false,
            ..Self::new(frame_rate)
        }
    }

    /// Nominal duration of one frame.
    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Whether `wait_for_next_frame()` blocks.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.throttle
    }

    /// Block until the current frame's deadline, then start the next frame.
    ///
    /// Returns the wall-clock time the finished frame took, including the
    /// wait.
    pub fn wait_for_next_frame(&mut self) -> Duration {
        if self.throttle {
            loop {
                let now = Instant::now();
                if now >= self.next_deadline {
                    break;
                }
                let remaining = self.next_deadline - now;
                if remaining > Duration::from_millis(1) {
                    std::thread::sleep(remaining - Duration::from_millis(1));
                } else {
                    std::hint::spin_loop();
                }
            }
        }

        let now = Instant::now();
        self.last_frame_time = now - self.last_frame;
        self.last_frame = now;

        // Fell more than a frame behind: resynchronise rather than
        // racing to catch up.
        self.next_deadline += self.frame_duration;
        if now > self.next_deadline {
            log::trace!("frame pacer behind by {:?}", now - self.next_deadline);
            self.next_deadline = now + self.frame_duration;
        }

        self.last_frame_time
    }

    /// Wall-clock duration of the most recently finished frame.
    #[must_use]
    pub fn last_frame_time(&self) -> Duration {
        self.last_frame_time
    }

    /// Instantaneous frame rate derived from the last frame time.
    #[must_use]
    pub fn measured_frame_rate(&self) -> f64 {
        let secs = self.last_frame_time.as_secs_f64();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifty_hertz_frame_is_twenty_milliseconds() {
        let pacer = FramePacer::new(50);
        assert_eq!(pacer.frame_duration(), Duration::from_millis(20));
    }

    #[test]
    fn throttled_wait_reaches_deadline() {
        let mut pacer = FramePacer::new(200);
        let start = Instant::now();
        pacer.wait_for_next_frame();
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn unthrottled_wait_returns_immediately() {
        let mut pacer = FramePacer::unthrottled(1);
        let start = Instant::now();
        pacer.wait_for_next_frame();
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(!pacer.is_throttled());
    }
}
