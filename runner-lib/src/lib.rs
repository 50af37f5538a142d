//! Shared runner infrastructure for emulated machines.
//!
//! This crate provides window management, audio output, and input handling
//! for any system implementing the `Machine` trait, plus a windowless loop
//! for diagnostics and CI.
//!
//! # Example
//!
//! ```ignore
//! use runner_lib::{run, RunnerConfig};
//! use machine_chip8::{Chip8, Chip8Config};
//!
//! fn main() {
//!     let mut machine = Chip8::new(Chip8Config::default());
//!     machine.load_file("pong.ch8", &rom_data).unwrap();
//!
//!     run(machine, RunnerConfig {
//!         title: "CHIP-8".into(),
//!         scale: 8,
//!     });
//! }
//! ```

mod audio;
mod headless;
mod runner;

pub use headless::run_headless;
pub use runner::{Runner, RunnerConfig, run};
