//! Shared audio types
//!
//! Pure data types used across the audio subsystem.

use std::fmt;

use crate::audio::tap::SharedAnalyzer;
use crate::config::analysis::{STRIPE_BINS, WAVE_WINDOW};

/// Current playback state of the signal source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Paused,
    Playing,
    Ended,
    Errored,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Paused => write!(f, "Paused"),
            PlayState::Playing => write!(f, "Playing"),
            PlayState::Ended => write!(f, "Ended"),
            PlayState::Errored => write!(f, "Errored"),
        }
    }
}

/// Decoded signal description, known once the format probe finishes
#[derive(Debug, Clone)]
pub struct SignalInfo {
    pub codec_name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub duration_secs: Option<f64>,
}

impl fmt::Display for SignalInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel_str = if self.channels == 1 { "Mono" } else { "Stereo" };
        write!(f, "{}", self.codec_name)?;
        write!(f, " · {} Hz", self.sample_rate)?;
        write!(f, " · {}", channel_str)?;
        if let Some(d) = self.duration_secs {
            write!(f, " · {}", format_time(d))?;
        }
        Ok(())
    }
}

/// Format a position in seconds as `m:ss` for transport displays
pub fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Commands sent to the playback engine
pub enum PlayerCommand {
    /// Open the output context and wire the analyzer pair into the sample
    /// path (idempotent); replies on the handshake channel
    OpenContext {
        wave: SharedAnalyzer,
        stripe: SharedAnalyzer,
        reply: crossbeam_channel::Sender<std::result::Result<(), String>>,
    },
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Seek to an absolute position in seconds
    Seek(f64),
    /// Set output volume (0.0..=1.0)
    SetVolume(f32),
    /// Enable or disable looping at end of signal
    SetLoop(bool),
    /// Shut down the engine thread
    Shutdown,
}

impl fmt::Debug for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerCommand::OpenContext { .. } => f.write_str("OpenContext"),
            PlayerCommand::Play => f.write_str("Play"),
            PlayerCommand::Pause => f.write_str("Pause"),
            PlayerCommand::Seek(secs) => f.debug_tuple("Seek").field(secs).finish(),
            PlayerCommand::SetVolume(vol) => f.debug_tuple("SetVolume").field(vol).finish(),
            PlayerCommand::SetLoop(on) => f.debug_tuple("SetLoop").field(on).finish(),
            PlayerCommand::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Events emitted by the playback engine
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// Signal chain ready; codec and duration known
    MetadataReady(SignalInfo),
    /// Playback started or resumed
    Playing,
    /// Playback paused
    Paused,
    /// Signal reached its end with looping disabled
    Ended,
    /// Periodic playback position in seconds
    Position(f64),
    /// Start request denied by the output context
    Rejected(String),
    /// Decoder failure; playback state is forced to Errored
    DecodeError(String),
}

/// Time-domain sample buffer for the waveform path
///
/// Byte amplitudes centered at 128; silence reads as all-128.
#[derive(Clone)]
pub struct TimeDomainBuffer {
    pub samples: Vec<u8>,
    /// Total samples observed by the tap, for liveness checks
    pub sample_count: u64,
}

impl Default for TimeDomainBuffer {
    fn default() -> Self {
        Self {
            samples: vec![128; WAVE_WINDOW],
            sample_count: 0,
        }
    }
}

impl TimeDomainBuffer {
    /// Reset to the silence baseline
    pub fn reset(&mut self) {
        self.samples.fill(128);
        self.sample_count = 0;
    }
}

/// Frequency-domain bin buffer for the stripe path
#[derive(Clone)]
pub struct FrequencyBuffer {
    pub bins: Vec<u8>,
    /// Total samples observed by the tap, for liveness checks
    pub sample_count: u64,
}

impl Default for FrequencyBuffer {
    fn default() -> Self {
        Self {
            bins: vec![0; STRIPE_BINS],
            sample_count: 0,
        }
    }
}

impl FrequencyBuffer {
    /// Reset all bins to zero energy
    pub fn reset(&mut self) {
        self.bins.fill(0);
        self.sample_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- PlayState ---

    #[test]
    fn play_state_default_is_paused() {
        assert_eq!(PlayState::default(), PlayState::Paused);
    }

    #[test]
    fn play_state_display() {
        assert_eq!(PlayState::Paused.to_string(), "Paused");
        assert_eq!(PlayState::Playing.to_string(), "Playing");
        assert_eq!(PlayState::Ended.to_string(), "Ended");
        assert_eq!(PlayState::Errored.to_string(), "Errored");
    }

    #[test]
    fn play_state_equality() {
        assert_eq!(PlayState::Playing, PlayState::Playing);
        assert_ne!(PlayState::Playing, PlayState::Paused);
        assert_ne!(PlayState::Ended, PlayState::Errored);
    }

    // --- SignalInfo ---

    #[test]
    fn signal_info_display_stereo() {
        let info = SignalInfo {
            codec_name: "Vorbis".to_string(),
            channels: 2,
            sample_rate: 44100,
            duration_secs: None,
        };
        assert_eq!(info.to_string(), "Vorbis · 44100 Hz · Stereo");
    }

    #[test]
    fn signal_info_display_mono_with_duration() {
        let info = SignalInfo {
            codec_name: "MP3".to_string(),
            channels: 1,
            sample_rate: 22050,
            duration_secs: Some(125.0),
        };
        assert_eq!(info.to_string(), "MP3 · 22050 Hz · Mono · 2:05");
    }

    #[test]
    fn signal_info_display_multichannel_shows_stereo() {
        // Any channel count > 1 displays as "Stereo" (current behavior)
        for ch in [2, 4, 6] {
            let info = SignalInfo {
                codec_name: "PCM".to_string(),
                channels: ch,
                sample_rate: 48000,
                duration_secs: None,
            };
            assert!(
                info.to_string().contains("Stereo"),
                "channels={} should display as Stereo",
                ch
            );
        }
    }

    // --- format_time ---

    #[test]
    fn format_time_zero() {
        assert_eq!(format_time(0.0), "0:00");
    }

    #[test]
    fn format_time_pads_seconds() {
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(9.9), "0:09");
    }

    #[test]
    fn format_time_long_track() {
        assert_eq!(format_time(3600.0), "60:00");
    }

    #[test]
    fn format_time_negative_clamps_to_zero() {
        assert_eq!(format_time(-5.0), "0:00");
    }

    // --- PlayerCommand / PlayerEvent ---

    #[test]
    fn player_command_debug() {
        assert_eq!(format!("{:?}", PlayerCommand::Play), "Play");
        assert_eq!(format!("{:?}", PlayerCommand::Pause), "Pause");
        assert_eq!(format!("{:?}", PlayerCommand::Seek(12.5)), "Seek(12.5)");
        assert_eq!(
            format!("{:?}", PlayerCommand::SetVolume(0.5)),
            "SetVolume(0.5)"
        );
        assert_eq!(format!("{:?}", PlayerCommand::Shutdown), "Shutdown");
    }

    #[test]
    fn player_event_clone() {
        let evt = PlayerEvent::DecodeError("bad packet".to_string());
        let cloned = evt.clone();
        if let PlayerEvent::DecodeError(msg) = cloned {
            assert_eq!(msg, "bad packet");
        } else {
            panic!("Expected DecodeError variant after clone");
        }
    }

    #[test]
    fn player_event_position_debug() {
        let evt = PlayerEvent::Position(3.25);
        assert!(format!("{:?}", evt).contains("3.25"));
    }

    // --- Buffers ---

    #[test]
    fn time_domain_buffer_defaults_to_silence_baseline() {
        let buf = TimeDomainBuffer::default();
        assert_eq!(buf.samples.len(), WAVE_WINDOW);
        assert!(buf.samples.iter().all(|&s| s == 128));
        assert_eq!(buf.sample_count, 0);
    }

    #[test]
    fn time_domain_buffer_reset_restores_baseline() {
        let mut buf = TimeDomainBuffer::default();
        buf.samples.fill(255);
        buf.sample_count = 42;
        buf.reset();
        assert!(buf.samples.iter().all(|&s| s == 128));
        assert_eq!(buf.sample_count, 0);
    }

    #[test]
    fn frequency_buffer_defaults_to_zero_energy() {
        let buf = FrequencyBuffer::default();
        assert_eq!(buf.bins.len(), STRIPE_BINS);
        assert!(buf.bins.iter().all(|&b| b == 0));
        assert_eq!(buf.sample_count, 0);
    }

    #[test]
    fn frequency_buffer_reset() {
        let mut buf = FrequencyBuffer::default();
        buf.bins.fill(200);
        buf.sample_count = 7;
        buf.reset();
        assert!(buf.bins.iter().all(|&b| b == 0));
        assert_eq!(buf.sample_count, 0);
    }

    #[test]
    fn frequency_buffer_is_half_the_stripe_window() {
        assert_eq!(STRIPE_BINS, crate::config::analysis::STRIPE_WINDOW / 2);
    }
}
