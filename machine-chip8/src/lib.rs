//! CHIP-8 / SUPER-CHIP / XO-CHIP machine emulation.
//!
//! This crate provides emulation for the CHIP-8 instruction family across
//! its three hardware generations:
//! - CHIP-8 (COSMAC VIP, 64x32 monochrome)
//! - SUPER-CHIP (HP48, 128x64, scrolling, big sprites)
//! - XO-CHIP (Octo, two bit planes, pattern audio, 16-bit index loads)
//!
//! All three generations share one opcode space with incompatible edge-case
//! semantics; the active [`Mode`] resolves those quirks. The mode is either
//! forced at construction or auto-detected from the first generation-specific
//! opcode a program executes.
//!
//! # ROMs
//!
//! Load raw binary (.ch8) ROM files; they are placed at address `0x200`.

mod audio;
mod chip8;
mod cpu;
mod display;
mod error;
mod flags;
mod keypad;
mod memory;
mod quirks;
mod scheduler;
mod timer;

pub use audio::{PatternSynth, SAMPLES_PER_FRAME, SAMPLE_RATE};
pub use chip8::{Chip8, Chip8Config};
pub use cpu::{Cpu, Instruction};
pub use display::{Display, ScrollDirection, PLANE_HEIGHT, PLANE_WIDTH};
pub use error::Chip8Error;
pub use flags::{FlagStore, NullFlagStore};
pub use memory::Memory;
pub use quirks::Mode;
pub use timer::Timer;
