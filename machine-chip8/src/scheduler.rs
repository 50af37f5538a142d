//! Multi-rate tick scheduler.
//!
//! Wall-clock elapsed time is converted into whole CPU instruction ticks
//! and 60 Hz timer ticks through fractional accumulators, so no tick is
//! lost across frame boundaries regardless of the host frame cadence.

use std::time::Duration;

use crate::quirks::Mode;

/// Timer and audio-pattern decrement rate, fixed for every variant.
pub const TIMER_HZ: f64 = 60.0;

/// Effective rate when the variant places no instruction budget.
const UNCAPPED_IPS: u32 = 1_000_000;

/// Elapsed time past this is discarded so a host stall (debugger pause,
/// laptop suspend) does not produce a catch-up burst.
const MAX_ELAPSED: Duration = Duration::from_millis(250);

/// Converts elapsed wall time into CPU and timer tick counts.
pub struct Scheduler {
    speed: f32,
    cpu_accum: f64,
    timer_accum: f64,
}

/// Whole ticks owed since the previous call to [`Scheduler::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticks {
    pub cpu: u32,
    pub timer: u32,
}

impl Scheduler {
    pub fn new(speed: f32) -> Self {
        Self { speed, cpu_accum: 0.0, timer_accum: 0.0 }
    }

    /// Consume elapsed time and report the ticks it covers.
    ///
    /// The speed multiplier scales only the CPU cadence; timers always
    /// run at 60 Hz so delay-loop pacing survives a speed change.
    pub fn advance(&mut self, elapsed: Duration, mode: Mode) -> Ticks {
        let secs = elapsed.min(MAX_ELAPSED).as_secs_f64();
        let ips = f64::from(mode.target_ips().unwrap_or(UNCAPPED_IPS)) * f64::from(self.speed);

        self.cpu_accum += secs * ips;
        self.timer_accum += secs * TIMER_HZ;

        let cpu = self.cpu_accum.floor() as u32;
        let timer = self.timer_accum.floor() as u32;
        self.cpu_accum -= f64::from(cpu);
        self.timer_accum -= f64::from(timer);

        Ticks { cpu, timer }
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn reset(&mut self) {
        self.cpu_accum = 0.0;
        self.timer_accum = 0.0;
    }
}
