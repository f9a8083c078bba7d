//! Playback engine
//!
//! Runs decode and output on a dedicated thread, accepting commands via
//! crossbeam channels and emitting events back. The output device is opened
//! lazily on `OpenContext` so the engine can probe metadata and sit idle
//! before the first user gesture arrives.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, warn};
use rodio::{OutputStream, Sink};

use crate::config::playback::{DEFAULT_VOLUME, LOOP_ENABLED};
use crate::config::timing::{ENGINE_TICK_MS, POSITION_EVENT_MS};
use crate::error::{HaloError, Result};

use super::source::{PlaybackProgress, SeekRequest, SignalSource};
use super::tap::{AnalyzerTap, SharedAnalyzer};
use super::types::{PlayState, PlayerCommand, PlayerEvent, SignalInfo};

/// Output device state, created on the engine thread because cpal streams
/// may be `!Send`.
///
/// Field order matters: the sink must drop before the stream it plays into.
struct OutputContext {
    sink: Sink,
    _stream: OutputStream,
}

fn open_output() -> std::result::Result<OutputContext, String> {
    let (stream, handle) =
        OutputStream::try_default().map_err(|e| format!("Failed to open audio output: {}", e))?;
    let sink = Sink::try_new(&handle).map_err(|e| format!("Failed to create sink: {}", e))?;
    Ok(OutputContext {
        sink,
        _stream: stream,
    })
}

/// Shared handles into the live decode chain
struct SourceHandles {
    progress: PlaybackProgress,
    seek: SeekRequest,
    loop_flag: Arc<AtomicBool>,
    errors: Arc<Mutex<Option<String>>>,
}

impl SourceHandles {
    fn from_source(source: &SignalSource) -> Self {
        Self {
            progress: source.progress(),
            seek: source.seek_handle(),
            loop_flag: source.loop_handle(),
            errors: source.error_slot(),
        }
    }

    fn take_error(&self) -> Option<String> {
        self.errors.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Playback engine that manages decode and output on a dedicated thread
pub struct PlaybackEngine {
    cmd_tx: Sender<PlayerCommand>,
    event_rx: Receiver<PlayerEvent>,
    info: SignalInfo,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Spawn the engine thread for a signal file.
    ///
    /// Blocks until the format probe finishes so codec and duration are
    /// known up front. The output device is not touched yet.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (cmd_tx, cmd_rx) = bounded::<PlayerCommand>(16);
        let (event_tx, event_rx) = bounded::<PlayerEvent>(64);
        let (init_tx, init_rx) = bounded::<std::result::Result<SignalInfo, String>>(1);

        let thread = thread::Builder::new()
            .name("halo-engine".to_string())
            .spawn(move || {
                Self::run(path, cmd_rx, event_tx, init_tx);
            })
            .map_err(|e| HaloError::Audio(format!("Failed to spawn engine thread: {}", e)))?;

        let info = init_rx
            .recv()
            .map_err(|_| HaloError::Audio("Engine thread terminated during init".to_string()))?
            .map_err(HaloError::Decode)?;

        Ok(Self {
            cmd_tx,
            event_rx,
            info,
            thread: Some(thread),
        })
    }

    /// Probed signal metadata
    pub fn info(&self) -> &SignalInfo {
        &self.info
    }

    /// Send a command to the engine
    pub fn send(&self, cmd: PlayerCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    /// Open the output context and wire the analyzer pair into the sample
    /// path. Idempotent; blocks until the engine replies.
    pub fn open_context(&self, wave: SharedAnalyzer, stripe: SharedAnalyzer) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(PlayerCommand::OpenContext {
            wave,
            stripe,
            reply: reply_tx,
        });
        reply_rx
            .recv()
            .map_err(|_| {
                HaloError::Audio("Engine thread terminated during context open".to_string())
            })?
            .map_err(HaloError::ContextUnavailable)
    }

    /// Start or resume playback
    pub fn play(&self) {
        self.send(PlayerCommand::Play);
    }

    /// Pause playback
    pub fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    /// Seek to an absolute position in seconds
    pub fn seek(&self, secs: f64) {
        self.send(PlayerCommand::Seek(secs));
    }

    /// Set output volume (clamped to 0.0..=1.0)
    pub fn set_volume(&self, volume: f32) {
        self.send(PlayerCommand::SetVolume(volume));
    }

    /// Enable or disable looping at end of signal
    pub fn set_loop(&self, enabled: bool) {
        self.send(PlayerCommand::SetLoop(enabled));
    }

    /// Non-blocking poll for the next event
    pub fn try_recv_event(&self) -> Option<PlayerEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Event receiver, for use with `select!` or blocking waits
    pub fn event_receiver(&self) -> &Receiver<PlayerEvent> {
        &self.event_rx
    }

    /// Graceful shutdown (consumes self)
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let _ = self.cmd_tx.send(PlayerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// The engine's main loop, running on the dedicated thread
    fn run(
        path: PathBuf,
        cmd_rx: Receiver<PlayerCommand>,
        event_tx: Sender<PlayerEvent>,
        init_tx: Sender<std::result::Result<SignalInfo, String>>,
    ) {
        let mut source = match SignalSource::open(&path) {
            Ok(s) => s,
            Err(e) => {
                let _ = init_tx.send(Err(e.to_string()));
                return;
            }
        };
        source.loop_handle().store(LOOP_ENABLED, Ordering::Relaxed);

        let info = source.info();
        let duration = source.duration_secs();
        let mut handles = SourceHandles::from_source(&source);
        let mut pending_source = Some(source);

        let _ = init_tx.send(Ok(info.clone()));
        let _ = event_tx.send(PlayerEvent::MetadataReady(info));

        let mut output: Option<OutputContext> = None;
        let mut analyzers: Option<(SharedAnalyzer, SharedAnalyzer)> = None;
        let mut state = PlayState::Paused;
        let mut volume: f32 = DEFAULT_VOLUME;
        let mut loop_on = LOOP_ENABLED;

        loop {
            let tick = if state == PlayState::Playing {
                Duration::from_millis(POSITION_EVENT_MS)
            } else {
                Duration::from_millis(ENGINE_TICK_MS)
            };

            match cmd_rx.recv_timeout(tick) {
                Ok(cmd) => match cmd {
                    PlayerCommand::OpenContext {
                        wave,
                        stripe,
                        reply,
                    } => {
                        if output.is_some() {
                            let _ = reply.send(Ok(()));
                            continue;
                        }
                        match open_output() {
                            Ok(ctx) => {
                                ctx.sink.pause();
                                ctx.sink.set_volume(volume);
                                if let Some(src) = pending_source.take() {
                                    ctx.sink.append(AnalyzerTap::new(
                                        src,
                                        wave.clone(),
                                        stripe.clone(),
                                    ));
                                }
                                analyzers = Some((wave, stripe));
                                output = Some(ctx);
                                debug!("Output context open");
                                let _ = reply.send(Ok(()));
                            }
                            Err(msg) => {
                                warn!("Output context open failed: {}", msg);
                                let _ = reply.send(Err(msg));
                            }
                        }
                    }
                    PlayerCommand::Play => {
                        let Some(ref ctx) = output else {
                            let _ = event_tx.send(PlayerEvent::Rejected(
                                "Output context is not open".to_string(),
                            ));
                            continue;
                        };
                        if state == PlayState::Errored {
                            warn!("Ignoring play request after decode failure");
                            continue;
                        }
                        if state == PlayState::Ended {
                            // The sink drained; rebuild the decode chain from
                            // the top of the signal.
                            match SignalSource::open(&path) {
                                Ok(src) => {
                                    src.loop_handle().store(loop_on, Ordering::Relaxed);
                                    handles = SourceHandles::from_source(&src);
                                    if let Some((ref wave, ref stripe)) = analyzers {
                                        ctx.sink.append(AnalyzerTap::new(
                                            src,
                                            wave.clone(),
                                            stripe.clone(),
                                        ));
                                    }
                                }
                                Err(e) => {
                                    state = PlayState::Errored;
                                    let _ =
                                        event_tx.send(PlayerEvent::DecodeError(e.to_string()));
                                    continue;
                                }
                            }
                        }
                        ctx.sink.play();
                        state = PlayState::Playing;
                        let _ = event_tx.send(PlayerEvent::Playing);
                    }
                    PlayerCommand::Pause => {
                        if state == PlayState::Playing {
                            if let Some(ref ctx) = output {
                                ctx.sink.pause();
                            }
                            state = PlayState::Paused;
                            let _ = event_tx.send(PlayerEvent::Paused);
                        }
                    }
                    PlayerCommand::Seek(secs) => {
                        let target = match duration {
                            Some(d) => secs.clamp(0.0, d),
                            None => secs.max(0.0),
                        };
                        if let Ok(mut slot) = handles.seek.lock() {
                            *slot = Some(target);
                        }
                    }
                    PlayerCommand::SetVolume(vol) => {
                        volume = vol.clamp(0.0, 1.0);
                        if let Some(ref ctx) = output {
                            ctx.sink.set_volume(volume);
                        }
                    }
                    PlayerCommand::SetLoop(enabled) => {
                        loop_on = enabled;
                        handles.loop_flag.store(enabled, Ordering::Relaxed);
                    }
                    PlayerCommand::Shutdown => {
                        if let Some(ref ctx) = output {
                            ctx.sink.stop();
                        }
                        break;
                    }
                },
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    if let Some(msg) = handles.take_error() {
                        state = PlayState::Errored;
                        let _ = event_tx.send(PlayerEvent::DecodeError(msg));
                        continue;
                    }
                    if state != PlayState::Playing {
                        continue;
                    }
                    match output {
                        Some(ref ctx) if ctx.sink.empty() => {
                            state = PlayState::Ended;
                            let _ = event_tx.send(PlayerEvent::Ended);
                        }
                        Some(_) => {
                            let _ = event_tx
                                .send(PlayerEvent::Position(handles.progress.position_secs()));
                        }
                        None => {}
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::{Duration, Instant};

    use super::*;

    /// Build a minimal valid WAV file in memory
    fn make_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
        let block_align = channels * (bits_per_sample / 8);
        let data_size = (samples.len() * 2) as u32;
        let file_size = 36 + data_size;

        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        buf
    }

    fn wav_file(sample_rate: u32, channels: u16, samples: &[i16]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .unwrap();
        file.write_all(&make_wav(sample_rate, channels, samples))
            .unwrap();
        file.flush().unwrap();
        file
    }

    /// Wait for an event matching the predicate, skipping others
    fn wait_for<F>(engine: &PlaybackEngine, timeout: Duration, mut pred: F) -> Option<PlayerEvent>
    where
        F: FnMut(&PlayerEvent) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match engine.event_receiver().recv_timeout(remaining) {
                Ok(evt) if pred(&evt) => return Some(evt),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    #[test]
    fn probes_metadata_before_returning() {
        let samples: Vec<i16> = vec![0; 22050];
        let file = wav_file(22050, 1, &samples);
        let engine = PlaybackEngine::new(file.path()).unwrap();

        let info = engine.info();
        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.channels, 1);
        let duration = info.duration_secs.unwrap();
        assert!((duration - 1.0).abs() < 0.05, "duration was {}", duration);

        engine.shutdown();
    }

    #[test]
    fn emits_metadata_ready_event() {
        let file = wav_file(44100, 2, &vec![0i16; 2000]);
        let engine = PlaybackEngine::new(file.path()).unwrap();

        let evt = wait_for(&engine, Duration::from_secs(1), |e| {
            matches!(e, PlayerEvent::MetadataReady(_))
        });
        match evt {
            Some(PlayerEvent::MetadataReady(info)) => {
                assert_eq!(info.channels, 2);
                assert_eq!(info.sample_rate, 44100);
            }
            other => panic!("Expected MetadataReady, got {:?}", other),
        }

        engine.shutdown();
    }

    #[test]
    fn play_without_output_context_is_rejected() {
        let file = wav_file(44100, 1, &vec![0i16; 1000]);
        let engine = PlaybackEngine::new(file.path()).unwrap();

        engine.play();
        let evt = wait_for(&engine, Duration::from_secs(1), |e| {
            matches!(e, PlayerEvent::Rejected(_))
        });
        assert!(evt.is_some(), "play with no output must be rejected");

        engine.shutdown();
    }

    #[test]
    fn pause_before_playing_emits_nothing() {
        let file = wav_file(44100, 1, &vec![0i16; 1000]);
        let engine = PlaybackEngine::new(file.path()).unwrap();

        // Drain the metadata event, then verify pause stays silent.
        let _ = wait_for(&engine, Duration::from_secs(1), |e| {
            matches!(e, PlayerEvent::MetadataReady(_))
        });
        engine.pause();
        let evt = engine
            .event_receiver()
            .recv_timeout(Duration::from_millis(300));
        assert!(evt.is_err(), "unexpected event: {:?}", evt);

        engine.shutdown();
    }

    #[test]
    fn commands_before_open_are_accepted() {
        let file = wav_file(44100, 1, &vec![0i16; 1000]);
        let engine = PlaybackEngine::new(file.path()).unwrap();

        engine.seek(0.5);
        engine.set_volume(0.8);
        engine.set_loop(false);

        engine.shutdown();
    }

    #[test]
    fn missing_file_fails_fast() {
        let result = PlaybackEngine::new("/nonexistent/path/track.ogg");
        assert!(result.is_err());
    }

    #[test]
    fn garbage_data_fails_probe() {
        let mut file = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .unwrap();
        file.write_all(b"this is not an audio file at all").unwrap();
        file.flush().unwrap();

        let result = PlaybackEngine::new(file.path());
        assert!(matches!(result, Err(HaloError::Decode(_))));
    }

    #[test]
    fn shutdown_joins_the_engine_thread() {
        let file = wav_file(44100, 1, &vec![0i16; 1000]);
        let engine = PlaybackEngine::new(file.path()).unwrap();
        engine.shutdown();
    }

    #[test]
    fn drop_shuts_down_cleanly() {
        let file = wav_file(44100, 1, &vec![0i16; 1000]);
        let engine = PlaybackEngine::new(file.path()).unwrap();
        drop(engine);
    }
}
