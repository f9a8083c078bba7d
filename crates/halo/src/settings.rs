//! Render parameter settings
//!
//! Tunable visualization parameters, constant after construction. Resolution
//! is explicitly two-tier: an optional user settings file layered over
//! compiled-in defaults. A failed load falls back to the defaults and raises
//! the `degraded` flag instead of failing the pipeline.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{analysis, ring, wave};
use crate::error::{HaloError, Result};

/// Settings file format version for migrations
const SETTINGS_VERSION: u32 = 1;

/// Visualization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderParameters {
    /// File format version
    #[serde(default = "default_version")]
    pub version: u32,

    // === Waveform ===
    /// Vertical exaggeration factor
    #[serde(default = "default_wave_amplitude")]
    pub wave_amplitude: f32,

    /// Horizontal stretch factor
    #[serde(default = "default_horizontal_scale")]
    pub horizontal_scale: f32,

    /// Stroke width in logical pixels
    #[serde(default = "default_line_thickness")]
    pub line_thickness: f32,

    // === Stripe ring ===
    /// Number of stripe slots around the ring
    #[serde(default = "default_stripe_count")]
    pub stripe_count: usize,

    /// Stripe width in logical pixels
    #[serde(default = "default_stripe_thickness")]
    pub stripe_thickness: f32,

    /// Reactive height span in logical pixels
    #[serde(default = "default_stripe_height_range")]
    pub stripe_height_range: f32,

    /// Temporal smoothing for the stripe analyzer (0.0-1.0)
    #[serde(default = "default_stripe_smoothing")]
    pub stripe_smoothing: f32,

    /// Set when the user settings file could not be loaded and the
    /// compiled-in defaults are in effect instead. Never persisted.
    #[serde(skip)]
    pub degraded: bool,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_wave_amplitude() -> f32 {
    wave::AMPLITUDE
}

fn default_horizontal_scale() -> f32 {
    wave::HORIZONTAL_SCALE
}

fn default_line_thickness() -> f32 {
    wave::LINE_WIDTH
}

fn default_stripe_count() -> usize {
    ring::STRIPE_COUNT
}

fn default_stripe_thickness() -> f32 {
    ring::STRIPE_THICKNESS
}

fn default_stripe_height_range() -> f32 {
    ring::HEIGHT_RANGE
}

fn default_stripe_smoothing() -> f32 {
    analysis::STRIPE_SMOOTHING
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            wave_amplitude: default_wave_amplitude(),
            horizontal_scale: default_horizontal_scale(),
            line_thickness: default_line_thickness(),
            stripe_count: default_stripe_count(),
            stripe_thickness: default_stripe_thickness(),
            stripe_height_range: default_stripe_height_range(),
            stripe_smoothing: default_stripe_smoothing(),
            degraded: false,
        }
    }
}

impl RenderParameters {
    /// Resolve parameters: user settings file over compiled-in defaults.
    ///
    /// `None` means no file was configured and the defaults apply cleanly.
    /// A file that cannot be read or parsed falls back to the defaults with
    /// the `degraded` flag raised.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load_from(path) {
            Ok(params) => params,
            Err(e) => {
                warn!("Settings load failed, using defaults: {}", e);
                Self {
                    degraded: true,
                    ..Self::default()
                }
            }
        }
    }

    /// Load parameters from a settings file.
    ///
    /// An empty file resolves to the defaults; malformed JSON is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let params: Self = serde_json::from_str(&content).map_err(|e| {
            HaloError::Settings(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(params.sanitized())
    }

    /// Save parameters to a settings file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| HaloError::Settings(format!("Failed to serialize settings: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Clamp loaded values into their valid ranges
    fn sanitized(mut self) -> Self {
        self.stripe_smoothing = self.stripe_smoothing.clamp(0.0, 1.0);
        self.stripe_count = self.stripe_count.max(1);
        self
    }
}
