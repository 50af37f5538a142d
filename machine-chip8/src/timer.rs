//! Delay and sound countdown timers.

/// Two independent 8-bit countdown counters decremented at 60 Hz.
///
/// The fixed cadence is enforced by the scheduler, not here. Counters floor
/// at zero and never wrap.
#[derive(Debug, Default)]
pub struct Timer {
    delay: u8,
    sound: u8,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(&self) -> u8 {
        self.delay
    }

    pub fn set_delay(&mut self, value: u8) {
        self.delay = value;
    }

    pub fn set_sound(&mut self, value: u8) {
        self.sound = value;
    }

    /// A nonzero sound counter is the sole signal that gates audio output.
    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }

    /// Decrement both counters; called once per 60 Hz timer tick.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.delay = 0;
        self.sound = 0;
    }
}
