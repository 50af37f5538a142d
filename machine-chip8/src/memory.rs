//! CHIP-8 memory bus.
//!
//! Memory map:
//! - `0x000-0x1FF`: reserved interpreter region (font data)
//! - `0x200-0xFFF`: program space
//!
//! Programs may only touch the program space; the checked [`Memory::read`]
//! and [`Memory::write`] paths enforce that. Interpreter-initiated accesses
//! (opcode fetch, font sprites, the diagnostic poke) use the raw accessors,
//! which only enforce the 4 KiB bound.

use crate::error::Chip8Error;

/// Total addressable memory.
pub const RAM_SIZE: usize = 4096;

/// Last address of the reserved interpreter region.
pub const INTERPRETER_END: u16 = 0x1FF;

/// Where programs are loaded and execution starts.
pub const PROGRAM_START: u16 = 0x200;

/// Last valid program address. Reads and writes accept it; as an opcode
/// spans two bytes, instruction fetch stops short of it.
pub const PROGRAM_END: u16 = 0xFFF;

/// Low-res hex font, 5 bytes per digit, at address 0x000.
pub(crate) const FONT_START: u16 = 0x000;

/// High-res digit font, 10 bytes per digit, at address 0x050.
pub(crate) const BIG_FONT_START: u16 = 0x050;

const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

const BIG_FONT: [u8; 100] = [
    0x3C, 0x7E, 0xE7, 0xC3, 0xC3, 0xC3, 0xC3, 0xE7, 0x7E, 0x3C, // 0
    0x18, 0x38, 0x58, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, // 1
    0x3E, 0x7F, 0xC3, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFF, 0xFF, // 2
    0x3C, 0x7E, 0xC3, 0x03, 0x0E, 0x0E, 0x03, 0xC3, 0x7E, 0x3C, // 3
    0x06, 0x0E, 0x1E, 0x36, 0x66, 0xC6, 0xFF, 0xFF, 0x06, 0x06, // 4
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFE, 0x03, 0xC3, 0x7E, 0x3C, // 5
    0x3E, 0x7C, 0xE0, 0xC0, 0xFC, 0xFE, 0xC3, 0xC3, 0x7E, 0x3C, // 6
    0xFF, 0xFF, 0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x60, 0x60, // 7
    0x3C, 0x7E, 0xC3, 0xC3, 0x7E, 0x7E, 0xC3, 0xC3, 0x7E, 0x3C, // 8
    0x3C, 0x7E, 0xC3, 0xC3, 0x7F, 0x3F, 0x03, 0x07, 0x7E, 0x3C, // 9
];

/// Flat 4 KiB byte store with a reserved interpreter region.
pub struct Memory {
    ram: [u8; RAM_SIZE],
}

impl Memory {
    /// Create memory with the font data baked into the reserved region.
    pub fn new() -> Self {
        let mut ram = [0; RAM_SIZE];
        ram[FONT_START as usize..FONT_START as usize + FONT.len()].copy_from_slice(&FONT);
        ram[BIG_FONT_START as usize..BIG_FONT_START as usize + BIG_FONT.len()]
            .copy_from_slice(&BIG_FONT);
        Self { ram }
    }

    fn check_program_addr(addr: u16) -> Result<(), Chip8Error> {
        if addr as usize >= RAM_SIZE {
            return Err(Chip8Error::AddressOutOfRange(addr));
        }
        if addr <= INTERPRETER_END {
            return Err(Chip8Error::ReservedRegion(addr));
        }
        Ok(())
    }

    /// Program-initiated read; rejects the reserved region.
    pub fn read(&self, addr: u16) -> Result<u8, Chip8Error> {
        Self::check_program_addr(addr)?;
        Ok(self.ram[addr as usize])
    }

    /// Program-initiated write; rejects the reserved region.
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), Chip8Error> {
        Self::check_program_addr(addr)?;
        self.ram[addr as usize] = value;
        Ok(())
    }

    /// Copy a ROM image into program space.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let capacity = (PROGRAM_END - PROGRAM_START) as usize;
        if rom.len() > capacity {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                capacity,
            });
        }
        let start = PROGRAM_START as usize;
        self.ram[start..start + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    /// Interpreter-initiated read, allowed to touch the reserved region.
    pub(crate) fn read_raw(&self, addr: u16) -> Result<u8, Chip8Error> {
        self.ram
            .get(addr as usize)
            .copied()
            .ok_or(Chip8Error::AddressOutOfRange(addr))
    }

    /// Fetch a big-endian 16-bit word (opcode or long-index operand).
    pub(crate) fn fetch_word(&self, addr: u16) -> Result<u16, Chip8Error> {
        let hi = self.read_raw(addr)?;
        let lo = self.read_raw(addr.wrapping_add(1))?;
        Ok(u16::from(hi) << 8 | u16::from(lo))
    }

    /// Interpreter-initiated write, allowed to touch the reserved region.
    /// Used for the diagnostic byte poked into `0x1FF`.
    pub(crate) fn poke(&mut self, addr: u16, value: u8) -> Result<(), Chip8Error> {
        if addr as usize >= RAM_SIZE {
            return Err(Chip8Error::AddressOutOfRange(addr));
        }
        self.ram[addr as usize] = value;
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
