//! BBC Micro keyboard matrix.
//!
//! The keyboard is an 8-row x 16-column matrix (ten columns are wired) read
//! through system VIA port A. With IC32's keyboard write enable low, the OS
//! drives a row (bits 4-6) and column (bits 0-3) on port A and reads the key
//! back on bit 7. With it high, a hardware counter steps through columns
//! 0-9 and pulls CA2 whenever a key in rows 1-7 of the current column is
//! down. Row 0 holds the start-up links and SHIFT/CTRL, which never
//! interrupt.
//!
//! Presses are latched so a key released between two OS polls is still
//! seen: the latch drops only once the key is up, its row has been scanned
//! since the release, and `MIN_HOLD_CYCLES` have passed.

use crate::ic32::Ic32;

const ROWS: usize = 8;
const COLUMNS: usize = 16;

/// Columns the hardware scan counter walks through.
const SCAN_COLUMNS: u8 = 10;

/// Minimum time a latched key stays visible after its last change: one
/// 50 Hz frame of 2 MHz CPU cycles.
pub const MIN_HOLD_CYCLES: u64 = 40_000;

#[derive(Debug, Clone, Copy, Default)]
struct KeyState {
    pressed: bool,
    latched: bool,
    /// Keyboard clock at the last press or release.
    last_change: u64,
    /// Keyboard clock at the last read of this key's row.
    last_scan: u64,
}

impl KeyState {
    fn active(self) -> bool {
        self.pressed || self.latched
    }
}

/// 8x16 keyboard matrix with scan tracking and press latches.
///
/// All timestamps are in CPU cycles on the matrix's own clock, advanced by
/// the bus after every instruction.
pub struct KeyboardMatrix {
    keys: [[KeyState; COLUMNS]; ROWS],
    /// Rows selected for readback (bit per row).
    row_mask: u8,
    /// Columns selected for readback (bit per column).
    column_mask: u16,
    /// Column the hardware counter is on.
    scan_column: u8,
    clock: u64,
    /// Keys currently pressed or latched.
    active_keys: u32,
    /// Key number (`row << 4 | column`) of the first key latched.
    latched_key: Option<u8>,
}

impl KeyboardMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: [[KeyState::default(); COLUMNS]; ROWS],
            row_mask: 0,
            column_mask: 1,
            scan_column: 0,
            clock: 0,
            active_keys: 0,
            latched_key: None,
        }
    }

    /// Select the rows `read_column_bits` reports on.
    pub fn set_row_mask(&mut self, mask: u8) {
        self.row_mask = mask;
    }

    /// Select the columns checked in manual scan mode.
    pub fn select_columns(&mut self, mask: u16) {
        self.column_mask = mask;
    }

    #[must_use]
    pub fn row_mask(&self) -> u8 {
        self.row_mask
    }

    #[must_use]
    pub fn column_mask(&self) -> u16 {
        self.column_mask
    }

    /// Column the hardware counter currently selects.
    #[must_use]
    pub fn scan_column(&self) -> u8 {
        self.scan_column
    }

    /// Step the hardware column counter, wrapping after column 9.
    pub fn tick_auto_scan(&mut self) {
        self.scan_column = (self.scan_column + 1) % SCAN_COLUMNS;
        self.column_mask = 1 << self.scan_column;
    }

    /// Active-low column bits for all selected rows.
    ///
    /// A clear bit means some key in that column is pressed or latched in
    /// one of the selected rows. Every selected row is marked as scanned.
    pub fn read_column_bits(&mut self) -> u16 {
        let mut bits = 0u16;
        for row in 0..ROWS {
            if self.row_mask & (1 << row) == 0 {
                continue;
            }
            for (col, key) in self.keys[row].iter_mut().enumerate() {
                key.last_scan = self.clock;
                if key.active() {
                    bits |= 1 << col;
                }
            }
        }
        !bits
    }

    /// Whether the key is pressed or still latched.
    #[must_use]
    pub fn is_key_active(&self, row: u8, col: u8) -> bool {
        self.key(row, col).is_some_and(|key| key.active())
    }

    /// Port A bit 7 readback for one key. Marks the key's row as scanned.
    pub fn key_at(&mut self, row: u8, col: u8) -> bool {
        if usize::from(row) >= ROWS {
            return false;
        }
        let clock = self.clock;
        for key in &mut self.keys[usize::from(row)] {
            key.last_scan = clock;
        }
        self.is_key_active(row, col)
    }

    /// Host key entry point.
    ///
    /// A press latches the key and, if no key holds the latch number yet,
    /// claims it. A release clears the pressed state and gives up the latch
    /// number; the key's own latch waits for `clear_released_latches`.
    pub fn set_key_state(&mut self, row: u8, col: u8, pressed: bool) {
        if usize::from(row) >= ROWS || usize::from(col) >= COLUMNS {
            return;
        }
        let number = (row << 4) | col;
        let clock = self.clock;
        let key = &mut self.keys[usize::from(row)][usize::from(col)];
        if key.pressed == pressed {
            return;
        }

        key.pressed = pressed;
        key.last_change = clock;
        if pressed {
            key.latched = true;
            if self.latched_key.is_none() {
                self.latched_key = Some(number);
            }
        } else if self.latched_key == Some(number) {
            self.latched_key = None;
        }
        log::trace!(
            "key row {row} col {col} {}",
            if pressed { "down" } else { "up" }
        );
        self.recount();
    }

    /// Drop latches of released keys that have been scanned since release
    /// and held for the minimum time.
    pub fn clear_released_latches(&mut self) {
        if self.active_keys == 0 {
            return;
        }
        let clock = self.clock;
        let mut changed = false;
        for key in self.keys.iter_mut().flatten() {
            if key.latched
                && !key.pressed
                && key.last_scan > key.last_change
                && clock - key.last_change >= MIN_HOLD_CYCLES
            {
                key.latched = false;
                changed = true;
            }
        }
        if changed {
            self.recount();
        }
    }

    /// Release every key and drop all latches.
    pub fn release_all_keys(&mut self) {
        let clock = self.clock;
        for key in self.keys.iter_mut().flatten() {
            if key.active() {
                key.last_change = clock;
            }
            key.pressed = false;
            key.latched = false;
        }
        self.latched_key = None;
        self.active_keys = 0;
    }

    /// Move the keyboard clock forward.
    pub fn advance(&mut self, cycles: u32) {
        self.clock += u64::from(cycles);
    }

    #[must_use]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Whether the keyboard should raise the system VIA's CA2 flag.
    ///
    /// Only fires with CA2 configured as a positive-edge input, with or
    /// without independent interrupt (PCR CA2 control `010` or `011`). In
    /// auto-scan mode rows 1-7 of the counter's column are checked; in
    /// manual mode the selected rows (except row 0) of the selected columns.
    #[must_use]
    pub fn kbd_int_check(&self, ic32: Ic32, pcr: u8) -> bool {
        if self.active_keys == 0 || pcr & 0x0C != 0x04 {
            return false;
        }

        if ic32.auto_scan() {
            let col = usize::from(self.scan_column);
            return self.keys[1..].iter().any(|row| row[col].active());
        }

        (1..ROWS)
            .filter(|&row| self.row_mask & (1 << row) != 0)
            .any(|row| {
                self.keys[row]
                    .iter()
                    .enumerate()
                    .any(|(col, key)| self.column_mask & (1 << col) != 0 && key.active())
            })
    }

    /// Number of the first key latched and not yet released.
    #[must_use]
    pub fn latched_key(&self) -> Option<u8> {
        self.latched_key
    }

    /// Whether any key is pressed or latched.
    #[must_use]
    pub fn any_active(&self) -> bool {
        self.active_keys != 0
    }

    fn key(&self, row: u8, col: u8) -> Option<&KeyState> {
        self.keys
            .get(usize::from(row))
            .and_then(|keys| keys.get(usize::from(col)))
    }

    fn recount(&mut self) {
        self.active_keys = self
            .keys
            .iter()
            .flatten()
            .filter(|key| key.active())
            .count() as u32;
    }
}

impl Default for KeyboardMatrix {
    fn default() -> Self {
        Self::new()
    }
}
