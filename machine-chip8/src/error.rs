//! Fatal machine errors.

use thiserror::Error;

/// Errors that terminate the emulated machine.
///
/// Every variant here desynchronizes deterministic state if execution were
/// to continue, so the runner treats all of them as fatal. Recoverable
/// platform failures (audio or display I/O) are logged by the runner and
/// never surface as a `Chip8Error`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Chip8Error {
    /// Memory access past the 4 KiB address space.
    #[error("address out of range: {0:#05X}")]
    AddressOutOfRange(u16),

    /// Program-initiated access to the reserved interpreter region.
    #[error("illegal access to interpreter ram section: {0:#05X}")]
    ReservedRegion(u16),

    /// Program counter left the program region.
    #[error("illegal program counter position: {0:#05X}")]
    ProgramCounterOutOfRange(u16),

    /// More than 16 nested calls.
    #[error("stack overflow")]
    StackOverflow,

    /// Return without a matching call.
    #[error("stack underflow")]
    StackUnderflow,

    /// Opcode outside the decode table of every supported generation.
    #[error("unimplemented instruction: {0:#06X}")]
    UnknownOpcode(u16),

    /// ROM image larger than program memory.
    #[error("rom size {size} is bigger than program ram {capacity}")]
    RomTooLarge { size: usize, capacity: usize },
}
