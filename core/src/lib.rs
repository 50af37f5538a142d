//! Core traits for retro computer emulation.

mod machine;

pub use machine::{AudioConfig, FrameStatus, KeyCode, Machine, VideoConfig};
