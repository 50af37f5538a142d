//! End-to-end tests driving hand-assembled ROMs through the public
//! `Machine` interface.
//!
//! Every program halts itself with `00FD` within a few instructions, so a
//! single frame (one sixtieth of a second of emulated time) is enough to
//! run it to completion.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use emu_core::{FrameStatus, Machine};
use machine_chip8::{Chip8, Chip8Config, FlagStore, Mode, PLANE_HEIGHT, PLANE_WIDTH};

/// Flag store shared between machine instances, standing in for the
/// file-backed store the runner uses.
#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<HashMap<String, [u8; 16]>>>);

impl FlagStore for SharedStore {
    fn load(&mut self, key: &str) -> io::Result<Option<[u8; 16]>> {
        Ok(self.0.borrow().get(key).copied())
    }

    fn save(&mut self, key: &str, flags: &[u8; 16]) -> io::Result<()> {
        self.0.borrow_mut().insert(key.to_owned(), *flags);
        Ok(())
    }
}

fn boot(rom: &[u8]) -> Chip8 {
    boot_with_store(rom, SharedStore::default())
}

fn boot_with_store(rom: &[u8], store: SharedStore) -> Chip8 {
    let mut machine = Chip8::with_flag_store(Chip8Config::default(), Box::new(store));
    machine.load_file("test.ch8", rom).unwrap();
    machine
}

fn render_rgba(machine: &mut Chip8) -> Vec<u8> {
    let mut buffer = vec![0u8; PLANE_WIDTH * PLANE_HEIGHT * 4];
    machine.render(&mut buffer);
    buffer
}

fn pixel_is_white(buffer: &[u8], x: usize, y: usize) -> bool {
    let offset = (y * PLANE_WIDTH + x) * 4;
    buffer[offset..offset + 3] == [0xFF, 0xFF, 0xFF]
}

#[test]
fn draws_the_zero_glyph() {
    // LD F, V0 / DRW V0, V0, 5 / EXIT
    let mut machine = boot(&[0xF0, 0x29, 0xD0, 0x05, 0x00, 0xFD]);
    assert_eq!(machine.run_frame().unwrap(), FrameStatus::Paused);

    let buffer = render_rgba(&mut machine);
    // glyph 0 row 0 is F0: logical pixels 0..4 lit, pixel-doubled to 8 wide
    assert!(pixel_is_white(&buffer, 0, 0));
    assert!(pixel_is_white(&buffer, 7, 0));
    assert!(!pixel_is_white(&buffer, 8, 0));
    // row 1 is 90: a hollow box
    assert!(pixel_is_white(&buffer, 0, 2));
    assert!(!pixel_is_white(&buffer, 2, 2));
}

#[test]
fn flags_survive_across_machines() {
    let store = SharedStore::default();

    // LD V0, 42 / SF V0 / EXIT
    let mut saver = boot_with_store(&[0x60, 0x42, 0xF0, 0x75, 0x00, 0xFD], store.clone());
    assert_eq!(saver.run_frame().unwrap(), FrameStatus::Paused);
    assert_eq!(store.0.borrow()["test"][0], 0x42);

    // LF V0 / SE V0, 42 / JP 208 / EXIT / <draw glyph, EXIT>
    // The failure path lights pixels before halting; a clean screen means
    // the reload produced V0 == 42 and the skip took the exit path.
    let rom = [
        0xF0, 0x85, // 200: LF V0
        0x30, 0x42, // 202: SE V0, 42
        0x12, 0x08, // 204: JP 208
        0x00, 0xFD, // 206: EXIT
        0xF0, 0x29, // 208: LD F, V0
        0xD0, 0x05, // 20A: DRW V0, V0, 5
        0x00, 0xFD, // 20C: EXIT
    ];
    let mut loader = boot_with_store(&rom, store);
    assert_eq!(loader.run_frame().unwrap(), FrameStatus::Paused);

    let buffer = render_rgba(&mut loader);
    assert!(!pixel_is_white(&buffer, 0, 0));
}

#[test]
fn sound_timer_enables_synthesis() {
    // LD V0, 3C / LD ST, V0 / EXIT
    let mut machine = boot(&[0x60, 0x3C, 0xF0, 0x18, 0x00, 0xFD]);
    machine.run_frame().unwrap();

    let mut samples = vec![0.0f32; 256];
    machine.generate_audio(&mut samples);
    assert!(samples.iter().any(|&s| s != 0.0));
}

#[test]
fn hires_opcode_promotes_the_mode() {
    // HIRES / EXIT
    let mut machine = boot(&[0x00, 0xFF, 0x00, 0xFD]);
    assert_eq!(machine.mode(), Mode::Unset);
    machine.run_frame().unwrap();
    assert_eq!(machine.mode(), Mode::SuperChip);
}

#[test]
fn tick_limit_exit_terminates_the_run() {
    // LD V0, 05 / JP 200
    let config = Chip8Config {
        tick_limit: Some(10),
        exit_at_tick_limit: true,
        ..Chip8Config::default()
    };
    let mut machine = Chip8::new(config);
    machine.load_file("loop.ch8", &[0x60, 0x05, 0x12, 0x00]).unwrap();

    let mut status = FrameStatus::Running;
    for _ in 0..10 {
        status = machine.run_frame().unwrap();
        if status != FrameStatus::Running {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(status, FrameStatus::Exited);
}

#[test]
fn bad_opcode_surfaces_as_an_error() {
    let mut machine = boot(&[0xFF, 0xFF]);
    assert!(machine.run_frame().is_err());
}
