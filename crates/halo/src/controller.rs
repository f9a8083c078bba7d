//! Playback controller
//!
//! Orchestrates transport, the analysis context, and both visual layers.
//! Owns the engine handle and the only `AnalysisContext` in the process;
//! everything else reads through it. Playback state moves on engine events,
//! except pause, which is applied optimistically.

use std::path::Path;
use std::time::{Duration, Instant};

use log::{error, warn};

use crate::audio::{
    AnalysisContext, FrequencyBuffer, PlayState, PlaybackEngine, PlayerEvent, SignalInfo,
    TimeDomainBuffer,
};
use crate::config::playback::DEFAULT_VOLUME;
use crate::config::timing::VIDEO_NUDGE_DEBOUNCE_MS;
use crate::error::Result;
use crate::settings::RenderParameters;
use crate::viz::canvas::CanvasSurface;
use crate::viz::ring::StripeRing;
use crate::viz::waveform::{VisualizationMode, WaveformRenderer};

pub use crate::audio::analysis::{ActionOrigin, ContextState};

type NudgeCallback = Box<dyn FnMut() + Send>;

/// Transport and visualization orchestrator for one signal file
pub struct PlaybackController {
    engine: PlaybackEngine,
    context: AnalysisContext,
    waveform: WaveformRenderer,
    ring: StripeRing,
    mode: VisualizationMode,

    play_state: PlayState,
    position: f64,
    duration: Option<f64>,
    volume: f32,
    seeking: bool,
    retried_start: bool,
    avatar_reacting: bool,

    video_nudge: Option<NudgeCallback>,
    last_nudge: Option<Instant>,

    wave_buf: TimeDomainBuffer,
    freq_buf: FrequencyBuffer,
}

impl PlaybackController {
    /// Spawn the engine for a signal file and set up the visual layers.
    ///
    /// Blocks until metadata is probed. The output device stays closed until
    /// the first user gesture.
    pub fn new(path: impl AsRef<Path>, params: RenderParameters) -> Result<Self> {
        let engine = PlaybackEngine::new(path)?;
        let duration = engine.info().duration_secs;

        Ok(Self {
            engine,
            context: AnalysisContext::new(params.stripe_smoothing),
            waveform: WaveformRenderer::new(params.clone()),
            ring: StripeRing::new(&params),
            mode: VisualizationMode::default(),
            play_state: PlayState::Paused,
            position: 0.0,
            duration,
            volume: DEFAULT_VOLUME,
            seeking: false,
            retried_start: false,
            avatar_reacting: false,
            video_nudge: None,
            last_nudge: None,
            wave_buf: TimeDomainBuffer::default(),
            freq_buf: FrequencyBuffer::default(),
        })
    }

    /// Probed signal metadata
    pub fn info(&self) -> &SignalInfo {
        self.engine.info()
    }

    /// Register the background-video recovery callback
    pub fn set_video_nudge<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.video_nudge = Some(Box::new(callback));
    }

    /// Toggle between playing and paused.
    ///
    /// A programmatic request before the first user gesture is dropped
    /// silently. The first gesture opens the output context and wires the
    /// analyzers; start rejections are retried once via `pump_events`.
    pub fn toggle_play(&mut self, origin: ActionOrigin) {
        if self.play_state == PlayState::Playing {
            self.engine.pause();
            self.play_state = PlayState::Paused;
            self.avatar_reacting = false;
            self.nudge_video();
            return;
        }

        let engine = &self.engine;
        let initialized = self.context.ensure_initialized(origin, |wave, stripe| {
            engine
                .open_context(wave.clone(), stripe.clone())
                .map_err(|e| e.to_string())
        });
        match initialized {
            Ok(true) => {}
            // Gated programmatic request, or an open failure already logged
            // by the context. Playback cannot start either way.
            Ok(false) | Err(_) => return,
        }

        self.retried_start = false;
        self.engine.play();
        self.avatar_reacting = true;
        self.nudge_video();
    }

    /// Drain pending engine events into controller state.
    ///
    /// Call this at least once per frame; position updates arrive here, not
    /// on the render tick.
    pub fn pump_events(&mut self) {
        while let Some(event) = self.engine.try_recv_event() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::MetadataReady(info) => {
                self.duration = info.duration_secs;
            }
            PlayerEvent::Playing => {
                self.play_state = PlayState::Playing;
                self.retried_start = false;
                self.avatar_reacting = true;
            }
            PlayerEvent::Paused => {
                self.play_state = PlayState::Paused;
                self.avatar_reacting = false;
            }
            PlayerEvent::Ended => {
                self.play_state = PlayState::Ended;
                self.avatar_reacting = false;
                if let Some(duration) = self.duration {
                    self.position = duration;
                }
            }
            PlayerEvent::Position(secs) => {
                if !self.seeking {
                    self.position = secs;
                }
            }
            PlayerEvent::Rejected(reason) => {
                if self.retried_start {
                    warn!("Start rejected again, staying paused: {}", reason);
                    self.play_state = PlayState::Paused;
                    self.avatar_reacting = false;
                    return;
                }
                self.retried_start = true;
                let engine = &self.engine;
                let resumed = self.context.resume(|wave, stripe| {
                    engine
                        .open_context(wave.clone(), stripe.clone())
                        .map_err(|e| e.to_string())
                });
                match resumed {
                    Ok(()) => self.engine.play(),
                    Err(_) => {
                        self.play_state = PlayState::Paused;
                        self.avatar_reacting = false;
                    }
                }
            }
            PlayerEvent::DecodeError(msg) => {
                error!("Decode failed: {}", msg);
                self.play_state = PlayState::Errored;
                self.avatar_reacting = false;
            }
        }
    }

    /// Seek to a fraction of the signal duration.
    ///
    /// The display position updates immediately; the decoder catches up
    /// asynchronously. A no-op while duration is unknown.
    pub fn seek(&mut self, fraction: f64) {
        let Some(duration) = self.duration else {
            return;
        };
        let target = fraction.clamp(0.0, 1.0) * duration;
        self.position = target;
        if self.play_state == PlayState::Ended {
            self.play_state = PlayState::Paused;
        }
        self.engine.seek(target);
    }

    /// Mark the start of a seek drag; position events are suppressed until
    /// `end_seek`.
    pub fn begin_seek(&mut self) {
        self.seeking = true;
    }

    /// End a seek drag and let position events drive the display again
    pub fn end_seek(&mut self) {
        self.seeking = false;
    }

    /// Set output volume, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.engine.set_volume(self.volume);
    }

    /// Enable or disable looping at end of signal
    pub fn set_loop(&mut self, enabled: bool) {
        self.engine.set_loop(enabled);
    }

    /// Flip the waveform between Default and Glowing; takes effect on the
    /// next render tick.
    pub fn toggle_visualization_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    /// Render one frame onto the surface.
    ///
    /// Skips entirely while the analysis context is not running. The
    /// waveform draws before the stripe arena updates; a busy analyzer lock
    /// reuses the previous buffer instead of blocking the frame.
    pub fn render_tick(&mut self, surface: &mut dyn CanvasSurface) {
        if !self.context.is_running() {
            return;
        }

        if let Some(wave) = self.context.wave().cloned() {
            if let Ok(analyzer) = wave.try_lock() {
                analyzer.time_domain_bytes(&mut self.wave_buf.samples);
                self.wave_buf.sample_count = analyzer.sample_count();
            }
        }
        if self.waveform.draw(surface, &self.wave_buf, self.mode).is_err() {
            // Zero-dimension surface mid-layout; drop the whole frame.
            return;
        }

        if let Some(stripe) = self.context.stripe().cloned() {
            if let Ok(mut analyzer) = stripe.try_lock() {
                analyzer.frequency_bytes(&mut self.freq_buf.bins);
                self.freq_buf.sample_count = analyzer.sample_count();
            }
        }
        self.ring.update(&self.freq_buf.bins);
    }

    /// Invoke the background-video recovery callback, coalescing bursts to
    /// one attempt per debounce window.
    pub fn nudge_video(&mut self) {
        let window = Duration::from_millis(VIDEO_NUDGE_DEBOUNCE_MS);
        let due = self
            .last_nudge
            .map_or(true, |last| last.elapsed() >= window);
        if !due {
            return;
        }
        self.last_nudge = Some(Instant::now());
        if let Some(callback) = self.video_nudge.as_mut() {
            callback();
        }
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }

    /// Current playback position in seconds
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Signal duration in seconds, if known
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Playback progress as a fraction of the duration, for progress bars
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(d) if d > 0.0 => (self.position / d).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn visualization_mode(&self) -> VisualizationMode {
        self.mode
    }

    pub fn context_state(&self) -> ContextState {
        self.context.state()
    }

    /// True while playback animates the avatar
    pub fn avatar_reacting(&self) -> bool {
        self.avatar_reacting
    }

    /// Stripe arena, for frontends that rasterize the ring themselves
    pub fn ring(&self) -> &StripeRing {
        &self.ring
    }

    /// Stop the engine thread and release the output device
    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}
