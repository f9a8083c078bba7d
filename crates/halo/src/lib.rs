//! Halo — audio-reactive visualization pipeline
//!
//! Decodes a local audio file, taps the sample stream once on its way to the
//! output sink, fans the tap out to a time-domain waveform analyzer and a
//! frequency-domain stripe analyzer, and drives a 2D waveform surface plus a
//! radial stripe ring from the live signal.
//!
//! ## Quick start
//!
//! ```no_run
//! use halo::controller::{ActionOrigin, PlaybackController};
//! use halo::settings::RenderParameters;
//!
//! let params = RenderParameters::load_or_default(None);
//! let mut controller = PlaybackController::new("music/track.ogg", params.clone())?;
//! controller.toggle_play(ActionOrigin::UserGesture);
//! # Ok::<(), halo::error::HaloError>(())
//! ```

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod settings;
pub mod viz;
