//! The assembled machine: CPU, memory, display, timers, synthesizer, and
//! keypad wired together behind the [`Machine`] trait.

use std::path::Path;
use std::time::{Duration, Instant};

use emu_core::{AudioConfig, FrameStatus, KeyCode, Machine, VideoConfig};
use log::info;

use crate::audio::{PatternSynth, SAMPLES_PER_FRAME, SAMPLE_RATE};
use crate::cpu::{Cpu, Effect, Peripherals};
use crate::display::{Display, PLANE_HEIGHT, PLANE_WIDTH};
use crate::error::Chip8Error;
use crate::flags::{FlagStore, NullFlagStore};
use crate::keypad::Keypad;
use crate::memory::{INTERPRETER_END, Memory};
use crate::quirks::Mode;
use crate::scheduler::Scheduler;
use crate::timer::Timer;

const FRAME_RATE: f32 = 60.0;
const DEFAULT_FRAME: Duration = Duration::from_nanos(16_666_667);

/// RGBA palette for the four plane combinations: black, white, and two
/// greys for the XO-CHIP overlay colors.
const PALETTE: [[u8; 4]; 4] = [
    [0x00, 0x00, 0x00, 0xFF],
    [0xFF, 0xFF, 0xFF, 0xFF],
    [0x55, 0x55, 0x55, 0xFF],
    [0xAA, 0xAA, 0xAA, 0xFF],
];

/// Construction-time options.
#[derive(Debug, Clone)]
pub struct Chip8Config {
    /// Forced compatibility mode; `None` auto-detects.
    pub mode: Option<Mode>,
    /// Multiplier applied to the CPU instruction rate only.
    pub speed: f32,
    /// Stop after this many CPU ticks.
    pub tick_limit: Option<u64>,
    /// Exit instead of pausing when the tick limit is reached.
    pub exit_at_tick_limit: bool,
    /// Diagnostic byte poked into `0x1FF` for conformance-test ROMs.
    pub test_flag: Option<u8>,
}

impl Default for Chip8Config {
    fn default() -> Self {
        Self {
            mode: None,
            speed: 1.0,
            tick_limit: None,
            exit_at_tick_limit: false,
            test_flag: None,
        }
    }
}

/// A complete CHIP-8 family machine.
pub struct Chip8 {
    config: Chip8Config,
    cpu: Cpu,
    memory: Memory,
    display: Display,
    timer: Timer,
    synth: PatternSynth,
    keypad: Keypad,
    flags: Box<dyn FlagStore>,
    scheduler: Scheduler,
    rom: Vec<u8>,
    flag_key: String,
    ticks: u64,
    last_frame: Option<Instant>,
    paused: bool,
    framebuffer: Vec<u8>,
}

impl Chip8 {
    pub fn new(config: Chip8Config) -> Self {
        Self::with_flag_store(config, Box::new(NullFlagStore))
    }

    /// Build a machine with an injected flag store; the core never touches
    /// the filesystem itself.
    pub fn with_flag_store(config: Chip8Config, flags: Box<dyn FlagStore>) -> Self {
        Self {
            cpu: Cpu::new(config.mode),
            memory: Memory::new(),
            display: Display::new(),
            timer: Timer::new(),
            synth: PatternSynth::new(),
            keypad: Keypad::new(),
            flags,
            scheduler: Scheduler::new(config.speed),
            rom: Vec::new(),
            flag_key: String::new(),
            ticks: 0,
            last_frame: None,
            paused: false,
            framebuffer: vec![0; PLANE_WIDTH * PLANE_HEIGHT],
            config,
        }
    }

    /// The active compatibility mode (may have been promoted since load).
    pub fn mode(&self) -> Mode {
        self.cpu.mode()
    }

    fn step_cpu(&mut self) -> Result<Effect, Chip8Error> {
        let effect = self.cpu.step(&mut Peripherals {
            memory: &mut self.memory,
            display: &mut self.display,
            timer: &mut self.timer,
            synth: &mut self.synth,
            keypad: &self.keypad,
            flags: self.flags.as_mut(),
            flag_key: &self.flag_key,
        })?;
        self.ticks += 1;
        Ok(effect)
    }

    fn tick_limit_reached(&self) -> bool {
        self.config.tick_limit.is_some_and(|limit| self.ticks >= limit)
    }
}

impl Machine for Chip8 {
    type Error = Chip8Error;

    fn video_config(&self) -> VideoConfig {
        VideoConfig {
            width: PLANE_WIDTH as u32,
            height: PLANE_HEIGHT as u32,
            fps: FRAME_RATE,
        }
    }

    fn audio_config(&self) -> AudioConfig {
        AudioConfig { sample_rate: SAMPLE_RATE, samples_per_frame: SAMPLES_PER_FRAME }
    }

    fn run_frame(&mut self) -> Result<FrameStatus, Chip8Error> {
        let now = Instant::now();
        let elapsed = self.last_frame.map_or(DEFAULT_FRAME, |last| now.duration_since(last));
        self.last_frame = Some(now);

        if self.paused {
            return Ok(FrameStatus::Paused);
        }

        let owed = self.scheduler.advance(elapsed, self.cpu.mode());
        for _ in 0..owed.timer {
            self.timer.tick();
        }

        for _ in 0..owed.cpu {
            if self.tick_limit_reached() {
                if self.config.exit_at_tick_limit {
                    info!("tick limit reached after {} ticks, exiting", self.ticks);
                    return Ok(FrameStatus::Exited);
                }
                info!("tick limit reached after {} ticks, pausing", self.ticks);
                self.paused = true;
                return Ok(FrameStatus::Paused);
            }
            if self.step_cpu()? == Effect::Pause {
                self.paused = true;
                return Ok(FrameStatus::Paused);
            }
        }

        Ok(FrameStatus::Running)
    }

    fn render(&mut self, buffer: &mut [u8]) {
        self.display.composite(&mut self.framebuffer);
        for (index, rgba) in self.framebuffer.iter().zip(buffer.chunks_exact_mut(4)) {
            rgba.copy_from_slice(&PALETTE[usize::from(*index)]);
        }
    }

    fn generate_audio(&mut self, buffer: &mut [f32]) {
        if self.timer.sound_active() {
            self.synth.generate(buffer);
        } else {
            buffer.fill(0.0);
        }
    }

    fn key_down(&mut self, key: KeyCode) {
        if let Some(key) = Keypad::map(key) {
            self.keypad.press(key);
        }
    }

    fn key_up(&mut self, key: KeyCode) {
        if let Some(key) = Keypad::map(key) {
            self.keypad.release(key);
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        info!("{}", if self.paused { "paused" } else { "resumed" });
    }

    fn step_paused(&mut self) -> Result<(), Chip8Error> {
        if self.paused {
            self.step_cpu()?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Chip8Error> {
        self.cpu = Cpu::new(self.config.mode);
        self.memory = Memory::new();
        self.display.reset();
        self.timer.reset();
        self.synth.reset();
        self.keypad.reset();
        self.scheduler.reset();
        self.ticks = 0;
        self.paused = false;
        self.last_frame = None;

        if !self.rom.is_empty() {
            let rom = std::mem::take(&mut self.rom);
            self.memory.load(&rom)?;
            self.rom = rom;
        }
        if let Some(flag) = self.config.test_flag {
            self.memory.poke(INTERPRETER_END, flag)?;
        }

        Ok(())
    }

    fn load_file(&mut self, path: &str, data: &[u8]) -> Result<(), Chip8Error> {
        self.flag_key = Path::new(path)
            .file_stem()
            .map_or_else(|| "rom".to_owned(), |stem| stem.to_string_lossy().into_owned());
        self.rom = data.to_vec();
        self.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(config: Chip8Config, rom: &[u8]) -> Chip8 {
        let mut m = Chip8::new(config);
        m.load_file("test.ch8", rom).unwrap();
        m
    }

    // LD V0, 05 / ADD V0, 03 / JP 200
    const LOOP_ROM: [u8; 6] = [0x60, 0x05, 0x70, 0x03, 0x12, 0x00];

    #[test]
    fn frame_executes_instructions() {
        let mut m = machine(Chip8Config::default(), &LOOP_ROM);
        assert_eq!(m.run_frame().unwrap(), FrameStatus::Running);
        // the first frame covers 1/60 s at 500 ips, several instructions
        assert!(m.ticks > 0);
        assert_eq!(m.cpu.register(0), 0x08);
    }

    #[test]
    fn tick_limit_pauses() {
        let config = Chip8Config { tick_limit: Some(2), ..Chip8Config::default() };
        let mut m = machine(config, &LOOP_ROM);
        assert_eq!(m.run_frame().unwrap(), FrameStatus::Paused);
        assert_eq!(m.ticks, 2);
        assert_eq!(m.cpu.register(0), 0x08);
        // a paused machine makes no further progress
        assert_eq!(m.run_frame().unwrap(), FrameStatus::Paused);
        assert_eq!(m.ticks, 2);
    }

    #[test]
    fn tick_limit_can_exit() {
        let config = Chip8Config {
            tick_limit: Some(1),
            exit_at_tick_limit: true,
            ..Chip8Config::default()
        };
        let mut m = machine(config, &LOOP_ROM);
        assert_eq!(m.run_frame().unwrap(), FrameStatus::Exited);
    }

    #[test]
    fn exit_opcode_pauses() {
        let mut m = machine(Chip8Config::default(), &[0x00, 0xFD]);
        assert_eq!(m.run_frame().unwrap(), FrameStatus::Paused);
    }

    #[test]
    fn step_while_paused_advances_one_instruction() {
        let mut m = machine(Chip8Config::default(), &LOOP_ROM);
        m.toggle_pause();
        m.step_paused().unwrap();
        assert_eq!(m.ticks, 1);
        assert_eq!(m.cpu.register(0), 0x05);
    }

    #[test]
    fn reset_restores_power_on_state() {
        let mut m = machine(Chip8Config::default(), &LOOP_ROM);
        m.run_frame().unwrap();
        m.reset().unwrap();
        assert_eq!(m.ticks, 0);
        assert_eq!(m.cpu.register(0), 0);
        assert_eq!(m.cpu.pc(), 0x200);
        // the ROM survives the reset
        assert_eq!(m.memory.read(0x200).unwrap(), 0x60);
    }

    #[test]
    fn test_flag_is_poked_into_reserved_byte() {
        let config = Chip8Config { test_flag: Some(3), ..Chip8Config::default() };
        let m = machine(config, &LOOP_ROM);
        assert_eq!(m.memory.read_raw(INTERPRETER_END).unwrap(), 3);
    }

    #[test]
    fn silent_when_sound_timer_is_zero() {
        let mut m = machine(Chip8Config::default(), &LOOP_ROM);
        let mut buffer = vec![1.0; 64];
        m.generate_audio(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn render_maps_palette_to_rgba() {
        // DRW V0, V0, 1 with a sprite byte from the font area
        let mut m = machine(Chip8Config::default(), &[0xF0, 0x29, 0xD0, 0x01, 0x12, 0x04]);
        m.run_frame().unwrap();
        let mut buffer = vec![0; PLANE_WIDTH * PLANE_HEIGHT * 4];
        m.render(&mut buffer);
        // font glyph 0 starts with F0: the top-left pixel is lit white
        assert_eq!(&buffer[0..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
