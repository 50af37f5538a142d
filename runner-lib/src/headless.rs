//! Windowless run loop for diagnostics and CI.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use emu_core::{FrameStatus, Machine};
use log::{info, warn};

/// Drive a machine at its frame cadence without a window or audio device.
///
/// Returns when the machine exits or pauses (nothing can unpause a
/// headless run) or on ctrl-c, checked at the top of each iteration;
/// fatal emulation errors propagate to the caller.
pub fn run_headless<M: Machine>(mut machine: M) -> Result<(), M::Error> {
    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        if let Err(err) = ctrlc::set_handler(move || cancelled.store(true, Ordering::SeqCst)) {
            warn!("failed to install interrupt handler: {err}");
        }
    }

    let frame = Duration::from_secs_f64(1.0 / f64::from(machine.video_config().fps));

    loop {
        if cancelled.load(Ordering::SeqCst) {
            info!("interrupted, ending headless run");
            return Ok(());
        }

        let start = Instant::now();

        match machine.run_frame()? {
            FrameStatus::Running => {}
            FrameStatus::Paused => {
                info!("machine paused, ending headless run");
                return Ok(());
            }
            FrameStatus::Exited => {
                info!("machine exited");
                return Ok(());
            }
        }

        if let Some(rest) = frame.checked_sub(start.elapsed()) {
            thread::sleep(rest);
        }
    }
}
