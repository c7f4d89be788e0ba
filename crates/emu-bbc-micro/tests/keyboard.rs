//! Keyboard matrix, scan and interrupt coupling through the whole machine.

use emu_bbc_micro::{Bbc, BbcConfig, KeyEvent, MIN_HOLD_CYCLES};
use proptest::prelude::*;

const CODE: u16 = 0xD000;
const HANDLER: u16 = 0xD100;

fn machine(code: &[u8], handler: &[u8]) -> Bbc {
    let mut rom = vec![0xEA; 0x4000];
    rom[0x1000..0x1000 + code.len()].copy_from_slice(code);
    rom[0x1100..0x1100 + handler.len()].copy_from_slice(handler);
    rom[0x3FFC..0x3FFE].copy_from_slice(&CODE.to_le_bytes());
    rom[0x3FFE..0x4000].copy_from_slice(&HANDLER.to_le_bytes());
    let mut config = BbcConfig::new(rom);
    config.cpu.throttle = false;
    Bbc::new(&config).expect("valid config")
}

fn idle() -> Bbc {
    machine(&[0x4C, 0x00, 0xD0], &[])
}

/// Auto-scan keyboard with the CA2 interrupt enabled, then `CLI; JMP *`.
const AUTO_SCAN_PROGRAM: &[u8] = &[
    0xA9, 0x0F, 0x8D, 0x42, 0xFE, // LDA #$0F; STA $FE42  (DDRB)
    0xA9, 0x0B, 0x8D, 0x40, 0xFE, // LDA #$0B; STA $FE40  (IC32 keyboard write enable high)
    0xA9, 0x04, 0x8D, 0x4C, 0xFE, // LDA #$04; STA $FE4C  (PCR: CA2 positive edge in)
    0xA9, 0x81, 0x8D, 0x4E, 0xFE, // LDA #$81; STA $FE4E  (IER: CA2)
    0x58, // CLI
    0x4C, 0x15, 0xD0, // JMP $D015
];

/// Acknowledge CA2 and count in $71.
const KEY_HANDLER: &[u8] = &[
    0xA9, 0x01, 0x8D, 0x4D, 0xFE, // LDA #$01; STA $FE4D
    0xE6, 0x71, // INC $71
    0x40, // RTI
];

#[test]
fn selected_row_reads_pressed_column_low() {
    let mut bbc = idle();
    bbc.press_key(2, 3);
    let keyboard = bbc.bus_mut().system_via.keyboard_mut();
    keyboard.set_row_mask(1 << 2);
    assert_eq!(keyboard.read_column_bits(), 0xFFF7);
}

#[test]
fn handle_from_another_thread_reaches_matrix_on_tick() {
    let mut bbc = idle();
    let handle = bbc.keyboard_handle();
    std::thread::spawn(move || handle.send(KeyEvent::press(5, 6)))
        .join()
        .expect("sender thread")
        .expect("machine alive");

    assert!(!bbc.bus().system_via.keyboard().is_key_active(5, 6));
    bbc.step();
    assert!(bbc.bus().system_via.keyboard().is_key_active(5, 6));
    assert_eq!(bbc.bus().system_via.keyboard().latched_key(), Some(0x56));
}

#[test]
fn key_press_raises_keyboard_interrupt() {
    let mut bbc = machine(AUTO_SCAN_PROGRAM, KEY_HANDLER);
    bbc.input_queue().enqueue_key(1, 0, 1, 100);

    bbc.run_frame();
    assert!(!bbc.irq_line().is_asserted());
    assert_eq!(bbc.read(0x71), 0);

    bbc.run_frame();
    assert!(bbc.irq_line().is_asserted());
    assert_eq!(bbc.cpu().regs.pc, HANDLER);

    bbc.run_frame();
    assert_eq!(bbc.read(0x71), 1);
}

#[test]
fn row_zero_keys_do_not_interrupt() {
    let mut bbc = machine(AUTO_SCAN_PROGRAM, KEY_HANDLER);
    bbc.press_key(0, 0); // SHIFT
    bbc.run_frame();
    bbc.run_frame();
    assert_eq!(bbc.read(0x71), 0);
    assert!(!bbc.irq_line().is_asserted());
}

#[test]
fn os_style_poll_sees_a_tapped_key() {
    // Manual scan: keyboard write enable low, select row 3 column 4 and
    // copy port A into $72 every pass.
    let program = [
        0xA9, 0x0F, 0x8D, 0x42, 0xFE, // LDA #$0F; STA $FE42
        0xA9, 0x03, 0x8D, 0x40, 0xFE, // LDA #$03; STA $FE40  (keyboard write enable low)
        0xA9, 0x7F, 0x8D, 0x43, 0xFE, // LDA #$7F; STA $FE43  (DDRA)
        0xA9, 0x34, 0x8D, 0x4F, 0xFE, // LDA #$34; STA $FE4F  (row 3, column 4)
        0xAD, 0x4F, 0xFE, // LDA $FE4F
        0x85, 0x72, // STA $72
        0x4C, 0x14, 0xD0, // JMP $D014
    ];
    let mut bbc = machine(&program, &[]);
    bbc.run_frame();
    assert_eq!(bbc.read(0x72) & 0x80, 0);

    // Press and release between two polls: the latch keeps it visible.
    bbc.press_key(3, 4);
    bbc.release_key(3, 4);
    // Four instructions cover one LDA/STA pair from anywhere in the loop.
    for _ in 0..4 {
        bbc.step();
    }
    assert_eq!(bbc.read(0x72) & 0x80, 0x80);

    // Scanned since release; the latch goes once the hold time passes.
    bbc.run_frame();
    bbc.run_frame();
    assert_eq!(bbc.read(0x72) & 0x80, 0);
    assert!(!bbc.bus().system_via.keyboard().is_key_active(3, 4));
}

#[test]
fn release_all_keys_clears_matrix() {
    let mut bbc = idle();
    bbc.press_key(1, 1);
    bbc.press_key(7, 9);
    bbc.release_all_keys();
    let keyboard = bbc.bus_mut().system_via.keyboard_mut();
    keyboard.set_row_mask(0xFF);
    assert_eq!(keyboard.read_column_bits(), 0xFFFF);
}

proptest! {
    #[test]
    fn single_key_clears_exactly_its_bit(row in 0u8..8, col in 0u8..16) {
        let mut bbc = idle();
        bbc.press_key(row, col);
        let keyboard = bbc.bus_mut().system_via.keyboard_mut();
        keyboard.set_row_mask(1 << row);
        prop_assert_eq!(keyboard.read_column_bits(), !(1u16 << col));
        keyboard.set_row_mask(!(1u8 << row));
        prop_assert_eq!(keyboard.read_column_bits(), 0xFFFF);
    }

    #[test]
    fn released_latch_survives_until_scanned(hold in 0u32..(2 * MIN_HOLD_CYCLES as u32)) {
        let mut bbc = idle();
        let keyboard = bbc.bus_mut().system_via.keyboard_mut();
        keyboard.set_key_state(4, 4, true);
        keyboard.set_key_state(4, 4, false);
        keyboard.advance(hold);
        keyboard.clear_released_latches();
        prop_assert!(keyboard.is_key_active(4, 4));
    }
}
