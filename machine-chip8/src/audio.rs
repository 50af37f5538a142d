//! XO-CHIP pattern audio synthesis.
//!
//! The synthesizer walks a 128-bit waveform pattern with a phase accumulator
//! and emits a high or low amplitude sample per output sample. The playback
//! rate is derived from the XO-CHIP pitch register; changing the pattern or
//! pitch never resets the phase, so a playing tone glides rather than clicks.

/// Audio sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of audio samples per 60 Hz frame.
pub const SAMPLES_PER_FRAME: usize = (SAMPLE_RATE / 60) as usize;

/// Bits in the waveform pattern.
const PATTERN_BITS: usize = 128;

/// Output amplitude for a set pattern bit (cleared bits emit the negative).
const AMPLITUDE: f32 = 0.25;

/// Default pattern: a sparse pulse train that sounds like the classic beep.
const DEFAULT_PATTERN: [u8; 16] = [
    0xF0, 0x00, 0x00, 0x00, 0xF0, 0x00, 0x00, 0x00, 0xF0, 0x00, 0x00, 0x00, 0xF0, 0x00, 0x00, 0x00,
];

/// Default playback rate in pattern bits per second (pitch register 64).
const DEFAULT_RATE: f64 = 4000.0;

/// Pattern-based audio synthesizer.
pub struct PatternSynth {
    pattern: [u8; 16],
    rate: f64,
    phase: f64,
}

impl PatternSynth {
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_PATTERN,
            rate: DEFAULT_RATE,
            phase: 0.0,
        }
    }

    /// Replace the 128-bit waveform pattern. Phase is preserved.
    pub fn set_pattern(&mut self, pattern: [u8; 16]) {
        self.pattern = pattern;
    }

    /// Derive the playback rate from the pitch register:
    /// `rate = 4000 * 2^((pitch - 64) / 4)`. Phase is preserved.
    pub fn set_pitch(&mut self, pitch: u8) {
        self.rate = 4000.0 * 2f64.powf((f64::from(pitch) - 64.0) / 4.0);
    }

    /// Current playback rate in pattern bits per second.
    pub fn playback_rate(&self) -> f64 {
        self.rate
    }

    /// Fill `out` with samples, advancing the phase accumulator.
    pub fn generate(&mut self, out: &mut [f32]) {
        let step = self.rate / f64::from(SAMPLE_RATE);
        for sample in out.iter_mut() {
            let idx = self.phase as usize % PATTERN_BITS;
            let bit = (self.pattern[idx / 8] >> (7 - idx % 8)) & 1;
            *sample = if bit == 1 { AMPLITUDE } else { -AMPLITUDE };
            self.phase += step;
        }
        self.phase %= PATTERN_BITS as f64;
    }

    pub fn reset(&mut self) {
        self.pattern = DEFAULT_PATTERN;
        self.rate = DEFAULT_RATE;
        self.phase = 0.0;
    }
}

impl Default for PatternSynth {
    fn default() -> Self {
        Self::new()
    }
}
