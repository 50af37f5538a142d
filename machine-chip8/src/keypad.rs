//! Hex keypad state.
//!
//! The COSMAC VIP keypad has 16 keys labelled 0-F. The physical map follows
//! the conventional layout:
//!
//! ```text
//! 1 2 3 4        1 2 3 C
//! Q W E R   ->   4 5 6 D
//! A S D F        7 8 9 E
//! Z X C V        A 0 B F
//! ```

use emu_core::KeyCode;

/// 16 boolean key states addressed 0x0-0xF.
#[derive(Debug, Default)]
pub struct Keypad {
    keys: [bool; 16],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a physical key to its keypad value.
    pub fn map(key: KeyCode) -> Option<u8> {
        match key {
            KeyCode::Digit1 => Some(0x1),
            KeyCode::Digit2 => Some(0x2),
            KeyCode::Digit3 => Some(0x3),
            KeyCode::Digit4 => Some(0xC),
            KeyCode::KeyQ => Some(0x4),
            KeyCode::KeyW => Some(0x5),
            KeyCode::KeyE => Some(0x6),
            KeyCode::KeyR => Some(0xD),
            KeyCode::KeyA => Some(0x7),
            KeyCode::KeyS => Some(0x8),
            KeyCode::KeyD => Some(0x9),
            KeyCode::KeyF => Some(0xE),
            KeyCode::KeyZ => Some(0xA),
            KeyCode::KeyX => Some(0x0),
            KeyCode::KeyC => Some(0xB),
            KeyCode::KeyV => Some(0xF),
            _ => None,
        }
    }

    pub fn press(&mut self, key: u8) {
        if let Some(state) = self.keys.get_mut(key as usize) {
            *state = true;
        }
    }

    pub fn release(&mut self, key: u8) {
        if let Some(state) = self.keys.get_mut(key as usize) {
            *state = false;
        }
    }

    /// Whether a keypad key is down. Values above 0xF are never pressed.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    /// Lowest-numbered key currently down, if any.
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|k| k as u8)
    }

    pub fn reset(&mut self) {
        self.keys = [false; 16];
    }
}
