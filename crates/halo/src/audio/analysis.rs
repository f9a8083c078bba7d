//! Analysis context lifecycle
//!
//! Owns the analyzer pair fed by the sample tap and gates its creation on a
//! user gesture. Output contexts created outside a gesture start suspended on
//! most platforms, so programmatic play attempts before the first gesture are
//! dropped instead of wedging the pipeline in a half-open state.

use log::{debug, warn};

use crate::audio::tap::{new_shared_analyzer, SharedAnalyzer};
use crate::config::analysis::{STRIPE_WINDOW, WAVE_SMOOTHING, WAVE_WINDOW};
use crate::error::{HaloError, Result};

/// Who asked for the state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrigin {
    /// Direct user interaction; allowed to create the output context
    UserGesture,
    /// Timer, autoplay, or other code path with no gesture behind it
    Programmatic,
}

/// Lifecycle of the shared output context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextState {
    /// No context yet; waiting for the first user gesture
    #[default]
    Uninitialized,
    /// Context open, analyzers wired
    Running,
    /// Open attempt failed; playback continues degraded without visuals
    Unavailable,
}

/// Lazily-initialized home of the analyzer pair
///
/// Both analyzers read from the same tap but keep independent windows: a wide
/// time-domain window for the waveform and a short frequency window for the
/// stripe ring.
pub struct AnalysisContext {
    state: ContextState,
    stripe_smoothing: f32,
    wave: Option<SharedAnalyzer>,
    stripe: Option<SharedAnalyzer>,
}

impl AnalysisContext {
    pub fn new(stripe_smoothing: f32) -> Self {
        Self {
            state: ContextState::Uninitialized,
            stripe_smoothing,
            wave: None,
            stripe: None,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ContextState::Running
    }

    /// Waveform analyzer handle, present once the context has opened
    pub fn wave(&self) -> Option<&SharedAnalyzer> {
        self.wave.as_ref()
    }

    /// Stripe analyzer handle, present once the context has opened
    pub fn stripe(&self) -> Option<&SharedAnalyzer> {
        self.stripe.as_ref()
    }

    /// Open the context if needed, creating the analyzer pair on first use.
    ///
    /// `open_output` receives handles to both analyzers so the caller can
    /// wire them into the sample path; it runs only when an open attempt is
    /// actually made. Returns `Ok(true)` when the context is running after
    /// the call and `Ok(false)` when a programmatic request was dropped by
    /// the gesture gate. Repeated calls on a running context never re-create
    /// the analyzers.
    pub fn ensure_initialized<F>(&mut self, origin: ActionOrigin, open_output: F) -> Result<bool>
    where
        F: FnOnce(&SharedAnalyzer, &SharedAnalyzer) -> std::result::Result<(), String>,
    {
        match self.state {
            ContextState::Running => return Ok(true),
            ContextState::Uninitialized if origin == ActionOrigin::Programmatic => {
                debug!("Dropping programmatic init request before first user gesture");
                return Ok(false);
            }
            _ => {}
        }

        let (wave, stripe) = self.wire_analyzers();
        match open_output(&wave, &stripe) {
            Ok(()) => {
                self.state = ContextState::Running;
                debug!("Analysis context running");
                Ok(true)
            }
            Err(reason) => {
                warn!("Output context open failed: {reason}");
                self.state = ContextState::Unavailable;
                Err(HaloError::ContextUnavailable(reason))
            }
        }
    }

    /// Re-attempt the open after a failure or a platform suspend.
    ///
    /// Keeps any previously-created analyzers so their smoothing history
    /// survives the recovery.
    pub fn resume<F>(&mut self, open_output: F) -> Result<()>
    where
        F: FnOnce(&SharedAnalyzer, &SharedAnalyzer) -> std::result::Result<(), String>,
    {
        if self.state == ContextState::Running {
            return Ok(());
        }
        let (wave, stripe) = self.wire_analyzers();
        match open_output(&wave, &stripe) {
            Ok(()) => {
                self.state = ContextState::Running;
                debug!("Analysis context resumed");
                Ok(())
            }
            Err(reason) => {
                warn!("Output context resume failed: {reason}");
                self.state = ContextState::Unavailable;
                Err(HaloError::ContextUnavailable(reason))
            }
        }
    }

    fn wire_analyzers(&mut self) -> (SharedAnalyzer, SharedAnalyzer) {
        let stripe_smoothing = self.stripe_smoothing;
        let wave = self
            .wave
            .get_or_insert_with(|| new_shared_analyzer(WAVE_WINDOW, WAVE_SMOOTHING))
            .clone();
        let stripe = self
            .stripe
            .get_or_insert_with(|| new_shared_analyzer(STRIPE_WINDOW, stripe_smoothing))
            .clone();
        (wave, stripe)
    }
}
