//! Error types for halo
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for the halo pipeline
#[derive(Error, Debug)]
pub enum HaloError {
    /// The platform denied a playback start request.
    ///
    /// Retried once after resuming the sample context; if it still fails,
    /// playback stays paused and the error is logged, never fatal.
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// No audio output context could be created.
    ///
    /// The visualization pipeline degrades to a no-op render loop; the rest
    /// of the process keeps running.
    #[error("Audio context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// Drawing surface queried before layout settled (zero-sized backing).
    #[error("Surface not ready for drawing")]
    SurfaceNotReady,

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for halo
pub type Result<T> = std::result::Result<T, HaloError>;
