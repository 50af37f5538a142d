//! Machine abstraction for emulated systems.
//!
//! This module defines the `Machine` trait which provides a common interface
//! for an emulated system to work with the shared runner infrastructure.

/// Video output configuration for a machine.
#[derive(Debug, Clone, Copy)]
pub struct VideoConfig {
    /// Native display width in pixels.
    pub width: u32,
    /// Native display height in pixels.
    pub height: u32,
    /// Frame rate in frames per second.
    pub fps: f32,
}

/// Audio output configuration for a machine.
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Number of audio samples per frame.
    pub samples_per_frame: usize,
}

/// Outcome of advancing a machine by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The machine is executing normally.
    Running,
    /// Execution is paused; the display still presents.
    Paused,
    /// The machine requested termination (clean shutdown, not an error).
    Exited,
}

/// Key codes supported by the runner.
///
/// This is a subset of winit's KeyCode to avoid exposing winit in the core
/// crate. Machines handle mapping these to their native keyboard format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    KeyA,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyM,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyV,
    KeyW,
    KeyX,
    KeyZ,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Space,
    Escape,
}

/// Trait for emulated machines.
///
/// Provides a common interface for the runner to interact with an emulated
/// system without knowing its specific implementation details.
pub trait Machine {
    /// Fatal machine error. Recoverable platform failures never surface here.
    type Error: std::error::Error + 'static;

    /// Get the video output configuration.
    fn video_config(&self) -> VideoConfig;

    /// Get the audio output configuration.
    fn audio_config(&self) -> AudioConfig;

    /// Execute one frame of emulation.
    ///
    /// Called at the presentation cadence. The machine is responsible for
    /// pacing its internal subsystems against wall-clock time.
    fn run_frame(&mut self) -> Result<FrameStatus, Self::Error>;

    /// Render the current display to an RGBA pixel buffer.
    ///
    /// The buffer size should be `width * height * 4` bytes.
    fn render(&mut self, buffer: &mut [u8]);

    /// Generate audio samples for the current frame.
    ///
    /// The buffer size should match `audio_config().samples_per_frame`.
    fn generate_audio(&mut self, buffer: &mut [f32]);

    /// Handle a key press event.
    fn key_down(&mut self, key: KeyCode);

    /// Handle a key release event.
    fn key_up(&mut self, key: KeyCode);

    /// Toggle the paused state.
    fn toggle_pause(&mut self) {}

    /// Advance by a single instruction while paused.
    fn step_paused(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Load a file into the machine.
    fn load_file(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error>;
}
