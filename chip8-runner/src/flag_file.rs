//! File-backed flag persistence (`FX75`/`FX85`).
//!
//! Flags are stored as one JSON file per ROM under the data directory,
//! `~/.local/share/chip8-rs` unless overridden with `--flags-dir`.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::debug;
use machine_chip8::FlagStore;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct StoredFlags {
    registers: [u8; 16],
}

pub struct FileFlagStore {
    dir: PathBuf,
}

impl FileFlagStore {
    pub fn new(dir: Option<PathBuf>) -> io::Result<Self> {
        let dir = match dir {
            Some(dir) => dir,
            None => default_dir()?,
        };
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}-flags.json"))
    }
}

fn default_dir() -> io::Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "HOME is not set"))?;
    Ok(PathBuf::from(home).join(".local/share/chip8-rs"))
}

impl FlagStore for FileFlagStore {
    fn load(&mut self, key: &str) -> io::Result<Option<[u8; 16]>> {
        let path = self.path_for(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let stored: StoredFlags = serde_json::from_slice(&data)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        debug!("loaded flags from {}", path.display());
        Ok(Some(stored.registers))
    }

    fn save(&mut self, key: &str, flags: &[u8; 16]) -> io::Result<()> {
        let path = self.path_for(key);
        let stored = StoredFlags { registers: *flags };
        let data = serde_json::to_vec_pretty(&stored)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(&path, data)?;
        debug!("saved flags to {}", path.display());
        Ok(())
    }
}
