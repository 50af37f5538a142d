//! Instruction engine.
//!
//! One [`Cpu::step`] call executes at most one instruction. The engine is a
//! two-state machine: `Running` fetches, decodes, and executes; `AwaitingKey`
//! (entered by `FX0A`) polls the keypad without advancing the program
//! counter until a pressed key is released.
//!
//! Decoding produces a closed [`Instruction`] value so the opcode table is
//! matched exhaustively; anything outside it is a fatal
//! [`Chip8Error::UnknownOpcode`].

use std::fmt;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::audio::PatternSynth;
use crate::display::{Display, ScrollDirection};
use crate::error::Chip8Error;
use crate::flags::FlagStore;
use crate::keypad::Keypad;
use crate::memory::{self, Memory};
use crate::quirks::Mode;
use crate::timer::Timer;

const STACK_DEPTH: usize = 16;

/// Everything an instruction can touch besides the CPU's own registers.
pub(crate) struct Peripherals<'a> {
    pub memory: &'a mut Memory,
    pub display: &'a mut Display,
    pub timer: &'a mut Timer,
    pub synth: &'a mut PatternSynth,
    pub keypad: &'a Keypad,
    pub flags: &'a mut dyn FlagStore,
    pub flag_key: &'a str,
}

/// Side effect of a step that the scheduler must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    None,
    /// `00FD` was executed; the machine should pause.
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    /// `FX0A`: holding the PC on the wait instruction. `captured` is the
    /// key seen pressed; it is written to `Vx` once released.
    AwaitingKey { x: u8, captured: Option<u8> },
}

/// A fully decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ClearScreen,
    Return,
    ScrollDown(u8),
    ScrollUp(u8),
    ScrollRight,
    ScrollLeft,
    Exit,
    LoRes,
    HiRes,
    Jump(u16),
    Call(u16),
    SkipEqImm(u8, u8),
    SkipNeImm(u8, u8),
    SkipEqReg(u8, u8),
    SkipNeReg(u8, u8),
    StoreRange(u8, u8),
    LoadRange(u8, u8),
    LoadImm(u8, u8),
    AddImm(u8, u8),
    Move(u8, u8),
    Or(u8, u8),
    And(u8, u8),
    Xor(u8, u8),
    Add(u8, u8),
    Sub(u8, u8),
    ShiftRight(u8, u8),
    SubNegate(u8, u8),
    ShiftLeft(u8, u8),
    LoadIndex(u16),
    JumpOffset(u8, u16),
    Random(u8, u8),
    Draw(u8, u8, u8),
    SkipKeyPressed(u8),
    SkipKeyReleased(u8),
    LoadLongIndex,
    SelectPlanes(u8),
    LoadAudioPattern,
    ReadDelay(u8),
    WaitKey(u8),
    SetDelay(u8),
    SetSound(u8),
    AddIndex(u8),
    FontChar(u8),
    BigFontChar(u8),
    StoreBcd(u8),
    SetPitch(u8),
    StoreRegisters(u8),
    LoadRegisters(u8),
    SaveFlags(u8),
    LoadFlags(u8),
}

impl Instruction {
    /// Decode one 16-bit opcode word.
    pub fn decode(word: u16) -> Result<Self, Chip8Error> {
        let x = ((word >> 8) & 0xF) as u8;
        let y = ((word >> 4) & 0xF) as u8;
        let n = (word & 0xF) as u8;
        let nn = (word & 0xFF) as u8;
        let nnn = word & 0xFFF;

        let inst = match word >> 12 {
            0x0 => match word {
                0x00E0 => Self::ClearScreen,
                0x00EE => Self::Return,
                0x00FB => Self::ScrollRight,
                0x00FC => Self::ScrollLeft,
                0x00FD => Self::Exit,
                0x00FE => Self::LoRes,
                0x00FF => Self::HiRes,
                _ if word & 0xFFF0 == 0x00C0 => Self::ScrollDown(n),
                _ if word & 0xFFF0 == 0x00D0 => Self::ScrollUp(n),
                _ => return Err(Chip8Error::UnknownOpcode(word)),
            },
            0x1 => Self::Jump(nnn),
            0x2 => Self::Call(nnn),
            0x3 => Self::SkipEqImm(x, nn),
            0x4 => Self::SkipNeImm(x, nn),
            0x5 => match n {
                0x0 => Self::SkipEqReg(x, y),
                0x2 => Self::StoreRange(x, y),
                0x3 => Self::LoadRange(x, y),
                _ => return Err(Chip8Error::UnknownOpcode(word)),
            },
            0x6 => Self::LoadImm(x, nn),
            0x7 => Self::AddImm(x, nn),
            0x8 => match n {
                0x0 => Self::Move(x, y),
                0x1 => Self::Or(x, y),
                0x2 => Self::And(x, y),
                0x3 => Self::Xor(x, y),
                0x4 => Self::Add(x, y),
                0x5 => Self::Sub(x, y),
                0x6 => Self::ShiftRight(x, y),
                0x7 => Self::SubNegate(x, y),
                0xE => Self::ShiftLeft(x, y),
                _ => return Err(Chip8Error::UnknownOpcode(word)),
            },
            0x9 if n == 0 => Self::SkipNeReg(x, y),
            0xA => Self::LoadIndex(nnn),
            0xB => Self::JumpOffset(x, nnn),
            0xC => Self::Random(x, nn),
            0xD => Self::Draw(x, y, n),
            0xE => match nn {
                0x9E => Self::SkipKeyPressed(x),
                0xA1 => Self::SkipKeyReleased(x),
                _ => return Err(Chip8Error::UnknownOpcode(word)),
            },
            0xF => match (x, nn) {
                (0x0, 0x00) => Self::LoadLongIndex,
                (_, 0x01) => Self::SelectPlanes(x),
                (_, 0x02) => Self::LoadAudioPattern,
                (_, 0x07) => Self::ReadDelay(x),
                (_, 0x0A) => Self::WaitKey(x),
                (_, 0x15) => Self::SetDelay(x),
                (_, 0x18) => Self::SetSound(x),
                (_, 0x1E) => Self::AddIndex(x),
                (_, 0x29) => Self::FontChar(x),
                (_, 0x30) => Self::BigFontChar(x),
                (_, 0x33) => Self::StoreBcd(x),
                (_, 0x3A) => Self::SetPitch(x),
                (_, 0x55) => Self::StoreRegisters(x),
                (_, 0x65) => Self::LoadRegisters(x),
                (_, 0x75) => Self::SaveFlags(x),
                (_, 0x85) => Self::LoadFlags(x),
                _ => return Err(Chip8Error::UnknownOpcode(word)),
            },
            _ => return Err(Chip8Error::UnknownOpcode(word)),
        };

        Ok(inst)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ClearScreen => write!(f, "CLS"),
            Self::Return => write!(f, "RET"),
            Self::ScrollDown(n) => write!(f, "SCD {n:X}"),
            Self::ScrollUp(n) => write!(f, "SCU {n:X}"),
            Self::ScrollRight => write!(f, "SCR 4"),
            Self::ScrollLeft => write!(f, "SCL 4"),
            Self::Exit => write!(f, "EXIT"),
            Self::LoRes => write!(f, "LORES"),
            Self::HiRes => write!(f, "HIRES"),
            Self::Jump(nnn) => write!(f, "JP {nnn:03X}"),
            Self::Call(nnn) => write!(f, "CALL {nnn:03X}"),
            Self::SkipEqImm(x, nn) => write!(f, "SE V{x:X}, {nn:02X}"),
            Self::SkipNeImm(x, nn) => write!(f, "SNE V{x:X}, {nn:02X}"),
            Self::SkipEqReg(x, y) => write!(f, "SE V{x:X}, V{y:X}"),
            Self::SkipNeReg(x, y) => write!(f, "SNE V{x:X}, V{y:X}"),
            Self::StoreRange(x, y) => write!(f, "SFM V{x:X}, V{y:X}"),
            Self::LoadRange(x, y) => write!(f, "LFM V{x:X}, V{y:X}"),
            Self::LoadImm(x, nn) => write!(f, "LD V{x:X}, {nn:02X}"),
            Self::AddImm(x, nn) => write!(f, "ADD V{x:X}, {nn:02X}"),
            Self::Move(x, y) => write!(f, "LD V{x:X}, V{y:X}"),
            Self::Or(x, y) => write!(f, "OR V{x:X}, V{y:X}"),
            Self::And(x, y) => write!(f, "AND V{x:X}, V{y:X}"),
            Self::Xor(x, y) => write!(f, "XOR V{x:X}, V{y:X}"),
            Self::Add(x, y) => write!(f, "ADD V{x:X}, V{y:X}"),
            Self::Sub(x, y) => write!(f, "SUB V{x:X}, V{y:X}"),
            Self::ShiftRight(x, y) => write!(f, "SHR V{x:X} {{, V{y:X}}}"),
            Self::SubNegate(x, y) => write!(f, "SUBN V{x:X}, V{y:X}"),
            Self::ShiftLeft(x, y) => write!(f, "SHL V{x:X} {{, V{y:X}}}"),
            Self::LoadIndex(nnn) => write!(f, "LD I, {nnn:03X}"),
            Self::JumpOffset(x, nnn) => write!(f, "JP V{x:X}, {nnn:03X}"),
            Self::Random(x, nn) => write!(f, "RND V{x:X}, {nn:02X}"),
            Self::Draw(x, y, n) => write!(f, "DRW V{x:X}, V{y:X}, {n:X}"),
            Self::SkipKeyPressed(x) => write!(f, "SKP V{x:X}"),
            Self::SkipKeyReleased(x) => write!(f, "SKNP V{x:X}"),
            Self::LoadLongIndex => write!(f, "LD I, LONG"),
            Self::SelectPlanes(m) => write!(f, "PLANE {m:X}"),
            Self::LoadAudioPattern => write!(f, "AUDIO"),
            Self::ReadDelay(x) => write!(f, "LD V{x:X}, DT"),
            Self::WaitKey(x) => write!(f, "LD V{x:X}, K"),
            Self::SetDelay(x) => write!(f, "LD DT, V{x:X}"),
            Self::SetSound(x) => write!(f, "LD ST, V{x:X}"),
            Self::AddIndex(x) => write!(f, "ADD I, V{x:X}"),
            Self::FontChar(x) => write!(f, "LD F, V{x:X}"),
            Self::BigFontChar(x) => write!(f, "LD HF, V{x:X}"),
            Self::StoreBcd(x) => write!(f, "LD B, V{x:X}"),
            Self::SetPitch(x) => write!(f, "PITCH V{x:X}"),
            Self::StoreRegisters(x) => write!(f, "LD [I], V{x:X}"),
            Self::LoadRegisters(x) => write!(f, "LD V{x:X}, [I]"),
            Self::SaveFlags(x) => write!(f, "SF V{x:X}"),
            Self::LoadFlags(x) => write!(f, "LF V{x:X}"),
        }
    }
}

/// Registers, stack, and execution state.
pub struct Cpu {
    v: [u8; 16],
    i: u16,
    pc: u16,
    stack: [u16; STACK_DEPTH],
    sp: usize,
    state: State,
    mode: Mode,
    forced: bool,
    ticks: u64,
    rng: SmallRng,
}

impl Cpu {
    /// `mode: Some(_)` forces a compatibility mode; `None` starts in
    /// [`Mode::Unset`] with auto-promotion enabled.
    pub fn new(mode: Option<Mode>) -> Self {
        Self {
            v: [0; 16],
            i: 0,
            pc: memory::PROGRAM_START,
            stack: [0; STACK_DEPTH],
            sp: 0,
            state: State::Running,
            mode: mode.unwrap_or(Mode::Unset),
            forced: mode.is_some(),
            ticks: 0,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn register(&self, x: u8) -> u8 {
        self.v[usize::from(x & 0xF)]
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    /// Execute one tick: either one instruction, or one key-wait poll.
    pub(crate) fn step(&mut self, p: &mut Peripherals<'_>) -> Result<Effect, Chip8Error> {
        if let State::AwaitingKey { x, captured } = self.state {
            self.poll_key_wait(x, captured, p.keypad);
            self.ticks += 1;
            return Ok(Effect::None);
        }

        if self.pc >= memory::PROGRAM_END {
            return Err(Chip8Error::ProgramCounterOutOfRange(self.pc));
        }

        let word = p.memory.fetch_word(self.pc)?;
        let inst = Instruction::decode(word)?;
        debug!("{:03X}: {inst:<14} I={:03X} SP={}", self.pc, self.i, self.sp);

        self.pc += 2;
        let effect = self.execute(inst, p)?;
        self.ticks += 1;

        Ok(effect)
    }

    fn poll_key_wait(&mut self, x: u8, captured: Option<u8>, keypad: &Keypad) {
        match captured {
            None => {
                if let Some(key) = keypad.first_pressed() {
                    self.state = State::AwaitingKey { x, captured: Some(key) };
                }
            }
            Some(key) => {
                // a press only counts once it is released again
                if !keypad.is_pressed(key) {
                    self.v[usize::from(x)] = key;
                    self.pc += 2;
                    self.state = State::Running;
                }
            }
        }
    }

    /// Promote the compatibility mode upward when a generation-specific
    /// opcode executes. Under a forced mode, promotion is disabled once
    /// any tick has elapsed.
    fn promote(&mut self, target: Mode) {
        if self.forced && self.ticks > 0 {
            return;
        }
        if target > self.mode {
            debug!("compatibility mode promoted to {target:?}");
            self.mode = target;
        }
    }

    fn push(&mut self, addr: u16) -> Result<(), Chip8Error> {
        if self.sp == STACK_DEPTH {
            return Err(Chip8Error::StackOverflow);
        }
        self.stack[self.sp] = addr;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// Advance past the next instruction, which is 4 bytes when it is the
    /// XO-CHIP long-index marker `F000`.
    fn skip_next(&mut self, memory: &Memory) -> Result<(), Chip8Error> {
        let next = memory.fetch_word(self.pc)?;
        self.pc += if next == 0xF000 { 4 } else { 2 };
        Ok(())
    }

    fn execute(&mut self, inst: Instruction, p: &mut Peripherals<'_>) -> Result<Effect, Chip8Error> {
        match inst {
            Instruction::ClearScreen => p.display.clear(),
            Instruction::Return => self.pc = self.pop()?,
            Instruction::ScrollDown(n) => {
                self.promote(Mode::SuperChip);
                p.display.scroll(ScrollDirection::Down, usize::from(n));
            }
            Instruction::ScrollUp(n) => {
                self.promote(Mode::XoChip);
                p.display.scroll(ScrollDirection::Up, usize::from(n));
            }
            Instruction::ScrollRight => {
                self.promote(Mode::SuperChip);
                p.display.scroll(ScrollDirection::Right, 4);
            }
            Instruction::ScrollLeft => {
                self.promote(Mode::SuperChip);
                p.display.scroll(ScrollDirection::Left, 4);
            }
            Instruction::Exit => {
                info!("program requested exit, pausing");
                return Ok(Effect::Pause);
            }
            Instruction::LoRes => {
                self.promote(Mode::SuperChip);
                p.display.set_hires(false);
            }
            Instruction::HiRes => {
                self.promote(Mode::SuperChip);
                p.display.set_hires(true);
            }
            Instruction::Jump(nnn) => self.pc = nnn,
            Instruction::Call(nnn) => {
                self.push(self.pc)?;
                self.pc = nnn;
            }
            Instruction::SkipEqImm(x, nn) => {
                if self.v[usize::from(x)] == nn {
                    self.skip_next(p.memory)?;
                }
            }
            Instruction::SkipNeImm(x, nn) => {
                if self.v[usize::from(x)] != nn {
                    self.skip_next(p.memory)?;
                }
            }
            Instruction::SkipEqReg(x, y) => {
                if self.v[usize::from(x)] == self.v[usize::from(y)] {
                    self.skip_next(p.memory)?;
                }
            }
            Instruction::SkipNeReg(x, y) => {
                if self.v[usize::from(x)] != self.v[usize::from(y)] {
                    self.skip_next(p.memory)?;
                }
            }
            Instruction::StoreRange(x, y) => {
                self.promote(Mode::XoChip);
                for (offset, reg) in register_range(x, y).enumerate() {
                    p.memory.write(self.i + offset as u16, self.v[usize::from(reg)])?;
                }
            }
            Instruction::LoadRange(x, y) => {
                self.promote(Mode::XoChip);
                for (offset, reg) in register_range(x, y).enumerate() {
                    self.v[usize::from(reg)] = p.memory.read(self.i + offset as u16)?;
                }
            }
            Instruction::LoadImm(x, nn) => self.v[usize::from(x)] = nn,
            Instruction::AddImm(x, nn) => {
                let x = usize::from(x);
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Instruction::Move(x, y) => self.v[usize::from(x)] = self.v[usize::from(y)],
            Instruction::Or(x, y) => {
                self.v[usize::from(x)] |= self.v[usize::from(y)];
                if self.mode.resets_flag_on_logic() {
                    self.v[0xF] = 0;
                }
            }
            Instruction::And(x, y) => {
                self.v[usize::from(x)] &= self.v[usize::from(y)];
                if self.mode.resets_flag_on_logic() {
                    self.v[0xF] = 0;
                }
            }
            Instruction::Xor(x, y) => {
                self.v[usize::from(x)] ^= self.v[usize::from(y)];
                if self.mode.resets_flag_on_logic() {
                    self.v[0xF] = 0;
                }
            }
            Instruction::Add(x, y) => {
                let sum = u16::from(self.v[usize::from(x)]) + u16::from(self.v[usize::from(y)]);
                self.v[usize::from(x)] = sum as u8;
                self.v[0xF] = u8::from(sum > 0xFF);
            }
            Instruction::Sub(x, y) => {
                let (a, b) = (self.v[usize::from(x)], self.v[usize::from(y)]);
                self.v[usize::from(x)] = a.wrapping_sub(b);
                self.v[0xF] = u8::from(a >= b);
            }
            Instruction::ShiftRight(x, y) => {
                let src = if self.mode.shifts_operand_y() {
                    self.v[usize::from(y)]
                } else {
                    self.v[usize::from(x)]
                };
                self.v[usize::from(x)] = src >> 1;
                self.v[0xF] = src & 1;
            }
            Instruction::SubNegate(x, y) => {
                let (a, b) = (self.v[usize::from(x)], self.v[usize::from(y)]);
                self.v[usize::from(x)] = b.wrapping_sub(a);
                self.v[0xF] = u8::from(b >= a);
            }
            Instruction::ShiftLeft(x, y) => {
                let src = if self.mode.shifts_operand_y() {
                    self.v[usize::from(y)]
                } else {
                    self.v[usize::from(x)]
                };
                self.v[usize::from(x)] = src << 1;
                self.v[0xF] = src >> 7;
            }
            Instruction::LoadIndex(nnn) => self.i = nnn,
            Instruction::JumpOffset(x, nnn) => {
                let reg = if self.mode.jump_offset_uses_v0() { 0 } else { usize::from(x) };
                self.pc = nnn + u16::from(self.v[reg]);
            }
            Instruction::Random(x, nn) => self.v[usize::from(x)] = self.rng.r#gen::<u8>() & nn,
            Instruction::Draw(x, y, n) => self.draw(x, y, n, p)?,
            Instruction::SkipKeyPressed(x) => {
                if p.keypad.is_pressed(self.v[usize::from(x)]) {
                    self.skip_next(p.memory)?;
                }
            }
            Instruction::SkipKeyReleased(x) => {
                if !p.keypad.is_pressed(self.v[usize::from(x)]) {
                    self.skip_next(p.memory)?;
                }
            }
            Instruction::LoadLongIndex => {
                self.promote(Mode::XoChip);
                self.i = p.memory.fetch_word(self.pc)?;
                self.pc += 2;
            }
            Instruction::SelectPlanes(mask) => {
                self.promote(Mode::XoChip);
                p.display.select_planes(mask);
            }
            Instruction::LoadAudioPattern => {
                self.promote(Mode::XoChip);
                let mut pattern = [0u8; 16];
                for (offset, byte) in pattern.iter_mut().enumerate() {
                    *byte = p.memory.read_raw(self.i + offset as u16)?;
                }
                p.synth.set_pattern(pattern);
            }
            Instruction::ReadDelay(x) => self.v[usize::from(x)] = p.timer.delay(),
            Instruction::WaitKey(x) => {
                // hold the PC on this instruction until a key is released
                self.pc -= 2;
                self.state = State::AwaitingKey { x, captured: p.keypad.first_pressed() };
            }
            Instruction::SetDelay(x) => p.timer.set_delay(self.v[usize::from(x)]),
            Instruction::SetSound(x) => p.timer.set_sound(self.v[usize::from(x)]),
            Instruction::AddIndex(x) => {
                self.i = self.i.wrapping_add(u16::from(self.v[usize::from(x)]));
            }
            Instruction::FontChar(x) => {
                self.i = memory::FONT_START + u16::from(self.v[usize::from(x)] & 0xF) * 5;
            }
            Instruction::BigFontChar(x) => {
                self.promote(Mode::SuperChip);
                self.i = memory::BIG_FONT_START + u16::from(self.v[usize::from(x)] & 0xF) * 10;
            }
            Instruction::StoreBcd(x) => {
                let value = self.v[usize::from(x)];
                p.memory.write(self.i, value / 100)?;
                p.memory.write(self.i + 1, value / 10 % 10)?;
                p.memory.write(self.i + 2, value % 10)?;
            }
            Instruction::SetPitch(x) => {
                self.promote(Mode::XoChip);
                p.synth.set_pitch(self.v[usize::from(x)]);
            }
            Instruction::StoreRegisters(x) => {
                for offset in 0..=u16::from(x) {
                    p.memory.write(self.i + offset, self.v[usize::from(offset)])?;
                }
                if self.mode.increments_index_on_block() {
                    self.i += u16::from(x) + 1;
                }
            }
            Instruction::LoadRegisters(x) => {
                for offset in 0..=u16::from(x) {
                    self.v[usize::from(offset)] = p.memory.read(self.i + offset)?;
                }
                if self.mode.increments_index_on_block() {
                    self.i += u16::from(x) + 1;
                }
            }
            Instruction::SaveFlags(_) => {
                self.promote(Mode::SuperChip);
                if let Err(err) = p.flags.save(p.flag_key, &self.v) {
                    warn!("failed to save flags: {err}");
                }
            }
            Instruction::LoadFlags(_) => {
                self.promote(Mode::SuperChip);
                match p.flags.load(p.flag_key) {
                    Ok(Some(flags)) => self.v = flags,
                    Ok(None) => {}
                    Err(err) => warn!("failed to load flags: {err}"),
                }
            }
        }

        Ok(Effect::None)
    }

    fn draw(&mut self, x: u8, y: u8, n: u8, p: &mut Peripherals<'_>) -> Result<(), Chip8Error> {
        let wide = n == 0;
        if wide {
            self.promote(Mode::SuperChip);
        }

        let plane_count = p.display.selected_plane_count();
        if plane_count == 0 {
            self.v[0xF] = 0;
            return Ok(());
        }

        let per_plane = if wide { 32 } else { usize::from(n) };
        let mut sprite = vec![0u8; per_plane * plane_count];
        for (offset, byte) in sprite.iter_mut().enumerate() {
            *byte = p.memory.read_raw(self.i + offset as u16)?;
        }

        let collision = p.display.draw_sprite(
            self.v[usize::from(x)],
            self.v[usize::from(y)],
            &sprite,
            wide,
            self.mode.clips_sprites(),
        );
        self.v[0xF] = u8::from(collision);

        Ok(())
    }
}

/// Registers `Vx..Vy` inclusive, walked toward `y` (descending when
/// `x > y`).
fn register_range(x: u8, y: u8) -> impl Iterator<Item = u8> {
    let count = x.abs_diff(y) + 1;
    (0..count).map(move |i| if x <= y { x + i } else { x - i })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::NullFlagStore;

    struct Rig {
        memory: Memory,
        display: Display,
        timer: Timer,
        synth: PatternSynth,
        keypad: Keypad,
        flags: NullFlagStore,
    }

    impl Rig {
        fn new(rom: &[u8]) -> Self {
            let mut memory = Memory::new();
            memory.load(rom).unwrap();
            Self {
                memory,
                display: Display::new(),
                timer: Timer::new(),
                synth: PatternSynth::new(),
                keypad: Keypad::new(),
                flags: NullFlagStore,
            }
        }

        fn step(&mut self, cpu: &mut Cpu) -> Result<Effect, Chip8Error> {
            cpu.step(&mut Peripherals {
                memory: &mut self.memory,
                display: &mut self.display,
                timer: &mut self.timer,
                synth: &mut self.synth,
                keypad: &self.keypad,
                flags: &mut self.flags,
                flag_key: "test-rom",
            })
        }
    }

    fn run(rom: &[u8], steps: usize) -> (Cpu, Rig) {
        let mut rig = Rig::new(rom);
        let mut cpu = Cpu::new(None);
        for _ in 0..steps {
            rig.step(&mut cpu).unwrap();
        }
        (cpu, rig)
    }

    #[test]
    fn load_add_and_loop() {
        // LD V0, 05 / ADD V0, 03 / JP 200
        let rom = [0x60, 0x05, 0x70, 0x03, 0x12, 0x00];
        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(None);

        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(0), 0x05);
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(0), 0x08);
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.pc(), 0x200);
    }

    #[test]
    fn add_register_carry() {
        let (cpu, _) = run(&[0x60, 0xFF, 0x61, 0x01, 0x80, 0x14], 3);
        assert_eq!(cpu.register(0), 0x00);
        assert_eq!(cpu.register(0xF), 1);

        let (cpu, _) = run(&[0x60, 0x01, 0x61, 0x01, 0x80, 0x14], 3);
        assert_eq!(cpu.register(0), 0x02);
        assert_eq!(cpu.register(0xF), 0);
    }

    #[test]
    fn sub_borrow_flag() {
        let (cpu, _) = run(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x15], 3);
        assert_eq!(cpu.register(0), 0x02);
        assert_eq!(cpu.register(0xF), 1);

        let (cpu, _) = run(&[0x60, 0x03, 0x61, 0x05, 0x80, 0x15], 3);
        assert_eq!(cpu.register(0), 0xFE);
        assert_eq!(cpu.register(0xF), 0);
    }

    #[test]
    fn subn_is_reversed_operands() {
        let (cpu, _) = run(&[0x60, 0x03, 0x61, 0x05, 0x80, 0x17], 3);
        assert_eq!(cpu.register(0), 0x02);
        assert_eq!(cpu.register(0xF), 1);
    }

    #[test]
    fn jump_sets_pc_exactly() {
        let (cpu, _) = run(&[0x13, 0x00], 1);
        assert_eq!(cpu.pc(), 0x300);
    }

    #[test]
    fn call_and_return() {
        // CALL 206 / (skipped) / (skipped) / RET
        let rom = [0x22, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE];
        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(None);

        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.pc(), 0x206);
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.pc(), 0x202);
    }

    #[test]
    fn seventeenth_call_overflows_stack() {
        // CALL 200 forever: each step pushes a return address
        let rom = [0x22, 0x00];
        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(None);

        for _ in 0..16 {
            rig.step(&mut cpu).unwrap();
        }
        assert_eq!(rig.step(&mut cpu), Err(Chip8Error::StackOverflow));
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut rig = Rig::new(&[0x00, 0xEE]);
        let mut cpu = Cpu::new(None);
        assert_eq!(rig.step(&mut cpu), Err(Chip8Error::StackUnderflow));
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let mut rig = Rig::new(&[0xFF, 0xFF]);
        let mut cpu = Cpu::new(None);
        assert_eq!(rig.step(&mut cpu), Err(Chip8Error::UnknownOpcode(0xFFFF)));
    }

    #[test]
    fn skip_steps_over_long_index_load() {
        // SE V0, 00 (taken) skips the 4-byte F000 1234, landing on LD V1, 42
        let rom = [0x30, 0x00, 0xF0, 0x00, 0x12, 0x34, 0x61, 0x42];
        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(None);

        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.pc(), 0x206);
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(1), 0x42);
    }

    #[test]
    fn long_index_load() {
        let (cpu, _) = run(&[0xF0, 0x00, 0x12, 0x34], 1);
        assert_eq!(cpu.index(), 0x1234);
        assert_eq!(cpu.pc(), 0x204);
        assert_eq!(cpu.mode(), Mode::XoChip);
    }

    #[test]
    fn wait_key_holds_pc_until_release() {
        let rom = [0xF5, 0x0A];
        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(None);

        // no key: PC stays on the wait instruction
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.pc(), 0x200);

        // key held: still waiting for the release edge
        rig.keypad.press(0x7);
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.pc(), 0x200);

        rig.keypad.release(0x7);
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(5), 0x7);
        assert_eq!(cpu.pc(), 0x202);
    }

    #[test]
    fn shift_source_depends_on_mode() {
        let rom = [0x61, 0x08, 0x80, 0x16];

        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(Some(Mode::Chip8));
        rig.step(&mut cpu).unwrap();
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(0), 0x04);

        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(Some(Mode::SuperChip));
        rig.step(&mut cpu).unwrap();
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(0), 0x00);
    }

    #[test]
    fn logic_resets_flag_on_classic_only() {
        let rom = [0x6F, 0x05, 0x80, 0x11];

        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(Some(Mode::Chip8));
        rig.step(&mut cpu).unwrap();
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(0xF), 0);

        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(Some(Mode::SuperChip));
        rig.step(&mut cpu).unwrap();
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(0xF), 0x05);
    }

    #[test]
    fn register_block_index_increment_quirk() {
        // LD I, 300 / LD V0, 11 / LD V1, 22 / LD [I], V1
        let rom = [0xA3, 0x00, 0x60, 0x11, 0x61, 0x22, 0xF1, 0x55];

        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(Some(Mode::Chip8));
        for _ in 0..4 {
            rig.step(&mut cpu).unwrap();
        }
        assert_eq!(rig.memory.read(0x300).unwrap(), 0x11);
        assert_eq!(rig.memory.read(0x301).unwrap(), 0x22);
        assert_eq!(cpu.index(), 0x302);

        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(Some(Mode::SuperChip));
        for _ in 0..4 {
            rig.step(&mut cpu).unwrap();
        }
        assert_eq!(cpu.index(), 0x300);
    }

    #[test]
    fn register_range_store_descending() {
        // LD I, 300 / LD V3, AA / LD V1, BB / SFM V3, V1
        let rom = [0xA3, 0x00, 0x63, 0xAA, 0x61, 0xBB, 0x53, 0x12];
        let (cpu, rig) = run(&rom, 4);
        assert_eq!(rig.memory.read(0x300).unwrap(), 0xAA);
        assert_eq!(rig.memory.read(0x302).unwrap(), 0xBB);
        assert_eq!(cpu.mode(), Mode::XoChip);
        // range operations do not move I
        assert_eq!(cpu.index(), 0x300);
    }

    #[test]
    fn register_range_ascending_roundtrip() {
        // LD I, 300 / LD V1..V3 / SFM V1, V3 / LFM V5, V7
        let rom = [
            0xA3, 0x00, 0x61, 0x11, 0x62, 0x22, 0x63, 0x33, 0x51, 0x32, 0x55, 0x73,
        ];
        let (cpu, rig) = run(&rom, 6);
        assert_eq!(rig.memory.read(0x300).unwrap(), 0x11);
        assert_eq!(rig.memory.read(0x301).unwrap(), 0x22);
        assert_eq!(rig.memory.read(0x302).unwrap(), 0x33);
        assert_eq!(cpu.register(5), 0x11);
        assert_eq!(cpu.register(6), 0x22);
        assert_eq!(cpu.register(7), 0x33);
        assert_eq!(cpu.index(), 0x300);
    }

    #[test]
    fn auto_mode_promotes_on_hires() {
        let (cpu, rig) = run(&[0x00, 0xFF], 1);
        assert_eq!(cpu.mode(), Mode::SuperChip);
        assert!(rig.display.hires());
    }

    #[test]
    fn forced_mode_blocks_promotion_after_first_tick() {
        let rom = [0x60, 0x00, 0x00, 0xFF];
        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(Some(Mode::Chip8));
        rig.step(&mut cpu).unwrap();
        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.mode(), Mode::Chip8);
    }

    #[test]
    fn bcd_digits() {
        let rom = [0x60, 0xFE, 0xA3, 0x00, 0xF0, 0x33];
        let (_, rig) = run(&rom, 3);
        assert_eq!(rig.memory.read(0x300).unwrap(), 2);
        assert_eq!(rig.memory.read(0x301).unwrap(), 5);
        assert_eq!(rig.memory.read(0x302).unwrap(), 4);
    }

    #[test]
    fn font_addresses() {
        let (cpu, _) = run(&[0x60, 0x07, 0xF0, 0x29], 2);
        assert_eq!(cpu.index(), 7 * 5);

        let (cpu, _) = run(&[0x61, 0x02, 0xF1, 0x30], 2);
        assert_eq!(cpu.index(), 0x50 + 2 * 10);
    }

    #[test]
    fn draw_reports_collision_in_vf() {
        // LD V0, 00 / LD I, 20A / DRW V0, V0, 1 / DRW V0, V0, 1 / data FF
        let rom = [0x60, 0x00, 0xA2, 0x0A, 0xD0, 0x01, 0xD0, 0x01, 0x00, 0x00, 0xFF];
        let mut rig = Rig::new(&rom);
        let mut cpu = Cpu::new(None);

        for _ in 0..3 {
            rig.step(&mut cpu).unwrap();
        }
        assert_eq!(cpu.register(0xF), 0);

        rig.step(&mut cpu).unwrap();
        assert_eq!(cpu.register(0xF), 1);
        assert_eq!(rig.display.pixel(0, 0, 0), 0);
    }

    #[test]
    fn exit_requests_pause() {
        let mut rig = Rig::new(&[0x00, 0xFD]);
        let mut cpu = Cpu::new(None);
        assert_eq!(rig.step(&mut cpu).unwrap(), Effect::Pause);
    }

    #[test]
    fn random_respects_mask() {
        let (cpu, _) = run(&[0xC0, 0x0F], 1);
        assert_eq!(cpu.register(0) & 0xF0, 0);
    }

    #[test]
    fn audio_pattern_and_pitch() {
        // LD I, 300 / AUDIO / LD V0, 44 / PITCH V0
        let rom = [0xA3, 0x00, 0xF0, 0x02, 0x60, 0x44, 0xF0, 0x3A];
        let mut rig = Rig::new(&rom);
        rig.memory.write(0x300, 0xAA).unwrap();
        let mut cpu = Cpu::new(None);
        for _ in 0..4 {
            rig.step(&mut cpu).unwrap();
        }
        assert_eq!(cpu.mode(), Mode::XoChip);
        // pitch 0x44 is one octave above the 4 kHz base
        assert!((rig.synth.playback_rate() - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn timer_roundtrip_through_registers() {
        let rom = [0x60, 0x0A, 0xF0, 0x15, 0xF1, 0x07];
        let (cpu, rig) = run(&rom, 3);
        assert_eq!(rig.timer.delay(), 10);
        assert_eq!(cpu.register(1), 10);
    }

    #[test]
    fn mnemonics_render() {
        assert_eq!(Instruction::decode(0x00E0).unwrap().to_string(), "CLS");
        assert_eq!(Instruction::decode(0x1234).unwrap().to_string(), "JP 234");
        assert_eq!(Instruction::decode(0x8125).unwrap().to_string(), "SUB V1, V2");
        assert_eq!(Instruction::decode(0xF855).unwrap().to_string(), "LD [I], V8");
    }
}
