//! Keyboard input for the BBC Micro.
//!
//! Two ways in, both addressed by matrix position:
//! 1. `KeyboardHandle`: a cloneable sender a host thread (UI, network,
//!    test driver) uses to press and release keys. The bus drains the
//!    channel on every tick, so the matrix is only touched on the thread
//!    running the CPU.
//! 2. `InputQueue`: timed key events for scripted sequences, applied at
//!    the start of the frame they are scheduled for.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, SendError, Sender};

use crate::keyboard::KeyboardMatrix;

/// A key going down or up at matrix position (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub row: u8,
    pub col: u8,
    pub pressed: bool,
}

impl KeyEvent {
    #[must_use]
    pub const fn press(row: u8, col: u8) -> Self {
        Self {
            row,
            col,
            pressed: true,
        }
    }

    #[must_use]
    pub const fn release(row: u8, col: u8) -> Self {
        Self {
            row,
            col,
            pressed: false,
        }
    }
}

/// Sends key events to a running machine from any thread.
#[derive(Debug, Clone)]
pub struct KeyboardHandle {
    sender: Sender<KeyEvent>,
}

impl KeyboardHandle {
    pub(crate) fn new(sender: Sender<KeyEvent>) -> Self {
        Self { sender }
    }

    /// Queue an event. Fails only once the machine has been dropped.
    pub fn send(&self, event: KeyEvent) -> Result<(), SendError<KeyEvent>> {
        self.sender.send(event)
    }

    pub fn press(&self, row: u8, col: u8) -> Result<(), SendError<KeyEvent>> {
        self.send(KeyEvent::press(row, col))
    }

    pub fn release(&self, row: u8, col: u8) -> Result<(), SendError<KeyEvent>> {
        self.send(KeyEvent::release(row, col))
    }
}

/// Apply every event waiting on `receiver` to the matrix.
pub(crate) fn drain_key_events(receiver: &Receiver<KeyEvent>, keyboard: &mut KeyboardMatrix) {
    while let Ok(event) = receiver.try_recv() {
        keyboard.set_key_state(event.row, event.col, event.pressed);
    }
}

/// A timed keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Frame number at which this event fires.
    pub frame: u64,
    pub key: KeyEvent,
}

/// Timed input queue for scripted key sequences.
///
/// Events are kept sorted by frame number and processed at the start of
/// each frame.
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Insert an event, keeping frame order. Events for the same frame keep
    /// their insertion order.
    pub fn push(&mut self, event: InputEvent) {
        let pos = self
            .events
            .iter()
            .position(|e| e.frame > event.frame)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }

    /// Enqueue a press at `at_frame` and the matching release
    /// `hold_frames` later.
    pub fn enqueue_key(&mut self, row: u8, col: u8, at_frame: u64, hold_frames: u64) {
        self.push(InputEvent {
            frame: at_frame,
            key: KeyEvent::press(row, col),
        });
        self.push(InputEvent {
            frame: at_frame + hold_frames,
            key: KeyEvent::release(row, col),
        });
    }

    /// Apply all events due at or before `frame`.
    pub fn process(&mut self, frame: u64, keyboard: &mut KeyboardMatrix) {
        while self.events.front().is_some_and(|event| event.frame <= frame) {
            if let Some(InputEvent { key, .. }) = self.events.pop_front() {
                keyboard.set_key_state(key.row, key.col, key.pressed);
            }
        }
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn enqueue_key_creates_press_and_release() {
        let mut queue = InputQueue::new();
        queue.enqueue_key(4, 2, 10, 3);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn events_stay_in_frame_order() {
        let mut queue = InputQueue::new();
        queue.enqueue_key(1, 1, 20, 5);
        queue.enqueue_key(2, 2, 10, 2);
        let frames: Vec<u64> = queue.events.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![10, 12, 20, 25]);
    }

    #[test]
    fn process_applies_due_events() {
        let mut queue = InputQueue::new();
        let mut kbd = KeyboardMatrix::new();
        queue.enqueue_key(4, 2, 5, 3);

        queue.process(4, &mut kbd);
        assert!(!kbd.is_key_active(4, 2));

        queue.process(5, &mut kbd);
        assert!(kbd.is_key_active(4, 2));
        assert_eq!(queue.len(), 1);

        queue.process(8, &mut kbd);
        assert!(queue.is_empty());
        assert_eq!(kbd.latched_key(), None);
    }

    #[test]
    fn handle_events_reach_matrix_when_drained() {
        let (tx, rx) = mpsc::channel();
        let handle = KeyboardHandle::new(tx);
        let mut kbd = KeyboardMatrix::new();

        let remote = handle.clone();
        std::thread::spawn(move || remote.press(3, 7))
            .join()
            .expect("sender thread")
            .expect("receiver alive");
        assert!(!kbd.is_key_active(3, 7));

        drain_key_events(&rx, &mut kbd);
        assert!(kbd.is_key_active(3, 7));
    }

    #[test]
    fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel();
        let handle = KeyboardHandle::new(tx);
        drop(rx);
        assert!(handle.press(0, 0).is_err());
    }
}
