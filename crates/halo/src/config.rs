//! Configuration constants for the halo pipeline

/// Analyzer configuration
pub mod analysis {
    /// Time-domain window size for the waveform analyzer (samples)
    pub const WAVE_WINDOW: usize = 2048;

    /// FFT window size for the stripe analyzer (samples)
    pub const STRIPE_WINDOW: usize = 128;

    /// Frequency bins produced by the stripe analyzer
    pub const STRIPE_BINS: usize = STRIPE_WINDOW / 2;

    /// Temporal smoothing for the waveform analyzer's frequency path
    /// (0.0-1.0, higher = smoother; kept low for visual crispness)
    pub const WAVE_SMOOTHING: f32 = 0.2;

    /// Default temporal smoothing for the stripe analyzer (0.0-1.0)
    pub const STRIPE_SMOOTHING: f32 = 0.4;

    /// Magnitude floor of the dB range mapped to byte value 0
    pub const MIN_DECIBELS: f32 = -100.0;

    /// Magnitude ceiling of the dB range mapped to byte value 255
    pub const MAX_DECIBELS: f32 = -30.0;
}

/// Waveform drawing defaults
pub mod wave {
    /// Vertical exaggeration factor (values above 1.0 overshoot the surface)
    pub const AMPLITUDE: f32 = 1.2;

    /// Horizontal stretch factor (the path overruns the surface and is clipped)
    pub const HORIZONTAL_SCALE: f32 = 5.0;

    /// Stroke width in logical pixels
    pub const LINE_WIDTH: f32 = 5.0;

    /// Shadow blur radius for the glowing-mode stroke
    pub const GLOW_BLUR: f32 = 15.0;

    /// Fraction of surface height covered by the bottom glow band
    pub const GLOW_BAND_FRACTION: f32 = 0.2;

    /// Buffer stride between glowing-mode vertical bars
    pub const BAR_STRIDE: usize = 4;
}

/// Stripe ring defaults
pub mod ring {
    /// Number of stripe slots around the ring
    pub const STRIPE_COUNT: usize = 64;

    /// Stripe width in logical pixels
    pub const STRIPE_THICKNESS: f32 = 5.0;

    /// Reactive height span in logical pixels
    pub const HEIGHT_RANGE: f32 = 80.0;

    /// Height floor so stripes stay visible through silence
    pub const MIN_HEIGHT: f32 = 10.0;

    /// Distance from ring center to stripe base
    pub const RADIUS: f32 = 90.0;

    /// Opacity floor so stripes never vanish entirely
    pub const MIN_OPACITY: f32 = 0.5;
}

/// Playback defaults
pub mod playback {
    /// Initial output volume (0.0-1.0)
    pub const DEFAULT_VOLUME: f32 = 0.5;

    /// Restart the signal from the top when it ends
    pub const LOOP_ENABLED: bool = true;
}

/// Timing configuration
pub mod timing {
    /// Render scheduler frame interval in milliseconds (~60 fps)
    pub const FRAME_INTERVAL_MS: u64 = 16;

    /// Debounce window for the background-video recovery nudge
    pub const VIDEO_NUDGE_DEBOUNCE_MS: u64 = 100;

    /// Engine loop wake interval while idle (milliseconds)
    pub const ENGINE_TICK_MS: u64 = 500;

    /// Cadence of position events emitted by the engine (milliseconds)
    pub const POSITION_EVENT_MS: u64 = 250;
}
