//! Persistent flag registers (SUPER-CHIP `FX75`/`FX85`).
//!
//! The store is injected at construction so the core never touches a
//! filesystem; the runner provides a file-backed implementation keyed by
//! ROM identity.

use std::io;

/// Key-value store for the 16 flag registers of one ROM.
pub trait FlagStore {
    /// Load the flags saved under `key`, if any.
    fn load(&mut self, key: &str) -> io::Result<Option<[u8; 16]>>;

    /// Persist the flags under `key`.
    fn save(&mut self, key: &str, flags: &[u8; 16]) -> io::Result<()>;
}

/// Store that persists nothing; used headless and in tests.
#[derive(Debug, Default)]
pub struct NullFlagStore;

impl FlagStore for NullFlagStore {
    fn load(&mut self, _key: &str) -> io::Result<Option<[u8; 16]>> {
        Ok(None)
    }

    fn save(&mut self, _key: &str, _flags: &[u8; 16]) -> io::Result<()> {
        Ok(())
    }
}
