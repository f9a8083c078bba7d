//! Signal source backed by Symphonia
//!
//! `SignalSource` decodes a local audio file into f32 samples and exposes it
//! as a `rodio::Source`, with position tracking, looping, and seek support.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::Source;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::{FormatOptions, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};

use crate::error::{HaloError, Result};

use super::types::SignalInfo;

/// Convert a symphonia codec type to a human-readable name
pub fn codec_type_to_name(codec: symphonia::core::codecs::CodecType) -> String {
    use symphonia::core::codecs::*;
    match codec {
        CODEC_TYPE_AAC => "AAC".to_string(),
        CODEC_TYPE_FLAC => "FLAC".to_string(),
        CODEC_TYPE_MP3 => "MP3".to_string(),
        CODEC_TYPE_OPUS => "Opus".to_string(),
        CODEC_TYPE_VORBIS => "Vorbis".to_string(),
        CODEC_TYPE_PCM_U8 => "PCM 8-bit".to_string(),
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM 16-bit".to_string(),
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM 24-bit".to_string(),
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => "PCM 32-bit".to_string(),
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM 32-bit Float".to_string(),
        CODEC_TYPE_PCM_F64LE | CODEC_TYPE_PCM_F64BE => "PCM 64-bit Float".to_string(),
        CODEC_TYPE_ALAC => "ALAC".to_string(),
        _ => "Audio".to_string(),
    }
}

/// Shared playback-position handle, readable from any thread
#[derive(Clone)]
pub struct PlaybackProgress {
    samples: Arc<AtomicU64>,
    samples_per_sec: f64,
}

impl PlaybackProgress {
    /// Current playback position in seconds
    pub fn position_secs(&self) -> f64 {
        self.samples.load(Ordering::Relaxed) as f64 / self.samples_per_sec
    }
}

/// Pending absolute seek target in seconds, applied at the next packet boundary
pub type SeekRequest = Arc<Mutex<Option<f64>>>;

/// A symphonia-based audio source for local files
pub struct SignalSource {
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    format: Box<dyn symphonia::core::formats::FormatReader>,
    track_id: u32,
    time_base: Option<TimeBase>,
    sample_buf: Option<SampleBuffer<f32>>,
    sample_idx: usize,
    channels: u16,
    sample_rate: u32,
    codec_name: String,
    duration_secs: Option<f64>,
    /// Interleaved samples emitted so far; shared with `PlaybackProgress`
    samples_played: Arc<AtomicU64>,
    loop_enabled: Arc<AtomicBool>,
    pending_seek: SeekRequest,
    /// Stores the last non-EOF error for the engine to check after the signal ends
    last_error: Arc<Mutex<Option<String>>>,
}

impl SignalSource {
    /// Open a local file, using its extension as a format hint
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let hint = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_string());
        Self::from_media_source(Box::new(file), hint.as_deref())
    }

    /// Create a source from any seekable media source (files, in-memory buffers)
    pub fn from_media_source(
        source: Box<dyn MediaSource>,
        format_hint: Option<&str>,
    ) -> Result<Self> {
        let mss = MediaSourceStream::new(source, Default::default());

        let format_opts = FormatOptions::default();
        let metadata_opts = MetadataOptions::default();
        let mut hint = Hint::new();
        if let Some(ext) = format_hint {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| HaloError::Decode(format!("Probe error: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
            .ok_or_else(|| HaloError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| HaloError::Decode(format!("Decoder creation error: {}", e)))?;

        let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);
        let sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let codec_name = codec_type_to_name(codec_params.codec);
        let time_base = codec_params.time_base;
        let duration_secs = match (codec_params.n_frames, time_base) {
            (Some(frames), Some(tb)) => {
                let t = tb.calc_time(frames);
                Some(t.seconds as f64 + t.frac)
            }
            (Some(frames), None) => Some(frames as f64 / sample_rate as f64),
            _ => None,
        };

        let mut source = Self {
            decoder,
            format,
            track_id,
            time_base,
            sample_buf: None,
            sample_idx: 0,
            channels,
            sample_rate,
            codec_name,
            duration_secs,
            samples_played: Arc::new(AtomicU64::new(0)),
            loop_enabled: Arc::new(AtomicBool::new(false)),
            pending_seek: Arc::new(Mutex::new(None)),
            last_error: Arc::new(Mutex::new(None)),
        };

        // Pre-decode the first frame so the reported sample rate and channel
        // count reflect actual decoder output before the sink configures its
        // resampler.
        source.decode_next_packet();

        Ok(source)
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    /// Total signal duration in seconds, if the container declares it
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Get full signal description as a `SignalInfo` struct
    pub fn info(&self) -> SignalInfo {
        SignalInfo {
            codec_name: self.codec_name.clone(),
            channels: self.channels,
            sample_rate: self.sample_rate,
            duration_secs: self.duration_secs,
        }
    }

    /// Shared position handle for reading playback progress from other threads
    pub fn progress(&self) -> PlaybackProgress {
        PlaybackProgress {
            samples: self.samples_played.clone(),
            samples_per_sec: self.sample_rate as f64 * self.channels as f64,
        }
    }

    /// Shared loop flag; flipping it takes effect at the next end of signal
    pub fn loop_handle(&self) -> Arc<AtomicBool> {
        self.loop_enabled.clone()
    }

    /// Shared seek slot; writes are applied at the next packet boundary
    pub fn seek_handle(&self) -> SeekRequest {
        self.pending_seek.clone()
    }

    /// Get the error slot for checking after the signal ends.
    ///
    /// If iteration stopped due to an IO or decode error (not clean EOF),
    /// the slot will contain the error message.
    pub fn error_slot(&self) -> Arc<Mutex<Option<String>>> {
        self.last_error.clone()
    }

    /// Seek to an absolute position in seconds; returns the position actually
    /// reached (container seeks land on packet boundaries).
    pub fn seek_to(&mut self, secs: f64) -> Result<f64> {
        let target = secs.max(0.0);
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::new(target.trunc() as u64, target.fract()),
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| HaloError::Decode(format!("Seek error: {}", e)))?;

        self.decoder.reset();
        self.sample_buf = None;
        self.sample_idx = 0;

        let actual = match self.time_base {
            Some(tb) => {
                let t = tb.calc_time(seeked.actual_ts);
                t.seconds as f64 + t.frac
            }
            None => target,
        };
        let samples = (actual * self.sample_rate as f64 * self.channels as f64) as u64;
        self.samples_played.store(samples, Ordering::Relaxed);
        Ok(actual)
    }

    fn take_pending_seek(&self) -> Option<f64> {
        self.pending_seek.lock().ok().and_then(|mut slot| slot.take())
    }

    fn decode_next_packet(&mut self) -> bool {
        loop {
            match self.format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != self.track_id {
                        continue;
                    }

                    match self.decoder.decode(&packet) {
                        Ok(decoded) => {
                            let spec = *decoded.spec();
                            let duration = decoded.capacity() as u64;

                            // Decoder output is authoritative for rate/channels
                            self.sample_rate = spec.rate;
                            self.channels = spec.channels.count() as u16;

                            if self.sample_buf.is_none()
                                || self.sample_buf.as_ref().unwrap().capacity() < duration as usize
                            {
                                self.sample_buf = Some(SampleBuffer::new(duration, spec));
                            }

                            if let Some(ref mut buf) = self.sample_buf {
                                buf.copy_interleaved_ref(decoded);
                                self.sample_idx = 0;
                                return true;
                            }
                        }
                        Err(symphonia::core::errors::Error::DecodeError(_)) => {
                            // Skip malformed packets, keep the signal alive
                            continue;
                        }
                        Err(e) => {
                            if let Ok(mut err) = self.last_error.lock() {
                                *err = Some(format!("{}", e));
                            }
                            return false;
                        }
                    }
                }
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    // Clean EOF, no error stored
                    return false;
                }
                Err(e) => {
                    if let Ok(mut err) = self.last_error.lock() {
                        *err = Some(format!("{}", e));
                    }
                    return false;
                }
            }
        }
    }

    fn ended_with_error(&self) -> bool {
        self.last_error
            .lock()
            .map(|e| e.is_some())
            .unwrap_or(false)
    }
}

impl Iterator for SignalSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ref buf) = self.sample_buf {
                if self.sample_idx < buf.samples().len() {
                    let sample = buf.samples()[self.sample_idx];
                    self.sample_idx += 1;
                    self.samples_played.fetch_add(1, Ordering::Relaxed);
                    return Some(sample);
                }
            }

            // Packet boundary: apply any pending seek before refilling
            if let Some(target) = self.take_pending_seek() {
                let _ = self.seek_to(target);
            }

            if !self.decode_next_packet() {
                if !self.ended_with_error()
                    && self.loop_enabled.load(Ordering::Relaxed)
                    && self.seek_to(0.0).is_ok()
                    && self.decode_next_packet()
                {
                    continue;
                }
                return None;
            }
        }
    }
}

impl Source for SignalSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs_f64)
    }
}
