//! Audio subsystem
//!
//! Decodes the signal file, taps the sample stream on its way to the output
//! sink, and fans the tap out to the waveform and stripe analyzers.

pub mod analysis;
pub mod engine;
pub mod source;
pub mod tap;
pub mod types;

pub use analysis::{ActionOrigin, AnalysisContext, ContextState};
pub use engine::PlaybackEngine;
pub use source::{PlaybackProgress, SeekRequest, SignalSource};
pub use tap::{new_shared_analyzer, Analyzer, AnalyzerTap, SharedAnalyzer};
pub use types::{
    format_time, FrequencyBuffer, PlayState, PlayerCommand, PlayerEvent, SignalInfo,
    TimeDomainBuffer,
};
