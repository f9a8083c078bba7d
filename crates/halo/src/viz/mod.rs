//! Visualization subsystem
//!
//! Rasterizes the live signal onto a 2D surface (waveform) and a radial
//! stripe arena (ring), paced by a fixed-interval frame scheduler.

pub mod canvas;
pub mod ring;
pub mod scheduler;
pub mod waveform;

pub use canvas::{CanvasSurface, PaintSpec, PixmapSurface, Rgba};
pub use ring::{StripeElement, StripeRing};
pub use scheduler::FrameScheduler;
pub use waveform::{VisualizationMode, WaveformRenderer};
