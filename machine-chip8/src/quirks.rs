//! Compatibility modes and quirk resolution.
//!
//! Three hardware generations share one opcode space with incompatible
//! edge-case semantics. The active mode resolves each quirk as a pure
//! lookup. `Unset` is the power-on state before any generation-specific
//! opcode has been seen; its quirk answers match the original interpreter's
//! defaults (SUPER-CHIP-like shifts and jumps, no flag reset).

/// Hardware-generation emulation profile, ordered by capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mode {
    Unset,
    Chip8,
    SuperChip,
    XoChip,
}

impl Mode {
    /// OR/AND/XOR reset VF to zero (classic CHIP-8 only).
    pub fn resets_flag_on_logic(self) -> bool {
        self == Mode::Chip8
    }

    /// 8XY6/8XYE shift VY into VX; SUPER-CHIP shifts VX in place.
    pub fn shifts_operand_y(self) -> bool {
        matches!(self, Mode::Chip8 | Mode::XoChip)
    }

    /// BNNN adds V0; SUPER-CHIP reads the register named by the high nibble.
    pub fn jump_offset_uses_v0(self) -> bool {
        matches!(self, Mode::Chip8 | Mode::XoChip)
    }

    /// FX55/FX65 leave I past the copied block; SUPER-CHIP leaves it alone.
    pub fn increments_index_on_block(self) -> bool {
        matches!(self, Mode::Chip8 | Mode::XoChip)
    }

    /// Sprite rows and columns past the edge are discarded instead of
    /// wrapping; only XO-CHIP wraps.
    pub fn clips_sprites(self) -> bool {
        self != Mode::XoChip
    }

    /// Target instruction rate in instructions per second.
    /// `None` means unbounded (XO-CHIP).
    pub fn target_ips(self) -> Option<u32> {
        match self {
            Mode::Unset | Mode::Chip8 => Some(500),
            Mode::SuperChip => Some(700),
            Mode::XoChip => None,
        }
    }
}
