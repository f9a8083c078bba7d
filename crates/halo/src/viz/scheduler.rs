//! Frame scheduler
//!
//! Drives the render tick on a dedicated thread at a fixed interval. Each
//! tick runs to completion before the next one is armed, so a slow frame
//! delays the schedule instead of overlapping it. Cancelling stops the loop
//! and joins the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::warn;

use crate::config::timing::FRAME_INTERVAL_MS;

/// Handle to a running render loop
#[derive(Debug)]
pub struct FrameScheduler {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FrameScheduler {
    /// Start a render loop at the default frame interval (~60 fps)
    pub fn start<F>(tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::with_interval(Duration::from_millis(FRAME_INTERVAL_MS), tick)
    }

    /// Start a render loop with an explicit frame interval
    pub fn with_interval<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let builder = thread::Builder::new().name("halo-render".into());
        let thread = match builder.spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                tick();
                thread::sleep(interval);
            }
        }) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Render thread failed to spawn: {}", e);
                cancelled.store(true, Ordering::Relaxed);
                None
            }
        };

        Self { cancelled, thread }
    }

    /// True until the loop has been cancelled
    pub fn is_running(&self) -> bool {
        !self.cancelled.load(Ordering::Relaxed)
    }

    /// Stop the loop and wait for the render thread to exit.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Render thread panicked");
            }
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
