//! CHIP-8 / SUPER-CHIP / XO-CHIP emulator.
//!
//! Keypad layout (QWERTY on the left, COSMAC hex pad on the right):
//!
//! ```text
//! 1 2 3 4        1 2 3 C
//! Q W E R   ->   4 5 6 D
//! A S D F        7 8 9 E
//! Z X C V        A 0 B F
//! ```
//!
//! Space resets, P pauses, T single-steps while paused, Escape or M quits.

mod flag_file;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use emu_core::Machine;
use log::info;
use machine_chip8::{Chip8, Chip8Config, Mode};
use runner_lib::{RunnerConfig, run, run_headless};

use crate::flag_file::FileFlagStore;

#[derive(Parser, Debug)]
#[command(name = "chip8-runner")]
#[command(about = "CHIP-8 / SUPER-CHIP / XO-CHIP emulator", long_about = None)]
struct Args {
    /// Path to a .ch8 ROM image
    rom: PathBuf,

    /// Force a compatibility mode instead of auto-detecting
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Integer window scale factor
    #[arg(long, default_value_t = 8)]
    scale: u32,

    /// CPU speed multiplier (timers stay at 60 Hz)
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Pause after this many CPU ticks
    #[arg(long, conflicts_with = "exit_after")]
    pause_after: Option<u64>,

    /// Exit after this many CPU ticks
    #[arg(long)]
    exit_after: Option<u64>,

    /// Run without a window or audio device
    #[arg(long)]
    headless: bool,

    /// Byte poked into address 0x1FF for conformance-test ROMs
    #[arg(long)]
    test_flag: Option<u8>,

    /// Directory for persisted flag registers (FX75/FX85)
    #[arg(long)]
    flags_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    Chip8,
    Super,
    Xo,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Chip8 => Mode::Chip8,
            ModeArg::Super => Mode::SuperChip,
            ModeArg::Xo => Mode::XoChip,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    if let Err(err) = run_emulator(&args) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run_emulator(args: &Args) -> anyhow::Result<()> {
    if args.rom.extension().and_then(|ext| ext.to_str()) != Some("ch8") {
        bail!("expected a .ch8 ROM, got {}", args.rom.display());
    }
    let data = fs::read(&args.rom)
        .with_context(|| format!("failed to read {}", args.rom.display()))?;

    let config = Chip8Config {
        mode: args.mode.map(Mode::from),
        speed: args.speed,
        tick_limit: args.pause_after.or(args.exit_after),
        exit_at_tick_limit: args.exit_after.is_some(),
        test_flag: args.test_flag,
    };

    let flags = FileFlagStore::new(args.flags_dir.clone())
        .context("failed to open flag store")?;
    let mut machine = Chip8::with_flag_store(config, Box::new(flags));
    machine.load_file(&args.rom.to_string_lossy(), &data)?;
    info!("loaded {} ({} bytes)", args.rom.display(), data.len());

    if args.headless {
        run_headless(machine)?;
        return Ok(());
    }

    let title = args.rom.file_stem().map_or_else(
        || "CHIP-8".to_owned(),
        |stem| format!("CHIP-8 - {}", stem.to_string_lossy()),
    );
    run(machine, RunnerConfig { title, scale: args.scale });

    Ok(())
}
