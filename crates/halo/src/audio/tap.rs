//! Signal tap and analyzers
//!
//! `AnalyzerTap` wraps any `rodio::Source<Item = f32>` on its way to the
//! output sink and feeds a downmixed copy of the signal to two independent
//! `Analyzer`s (fan-out). The tap never alters the audible samples.
//!
//! Each `Analyzer` keeps a rolling window of the most recent samples.
//! Time-domain reads convert the window to byte amplitudes centered at 128;
//! frequency-domain reads run a Hann-windowed FFT over the window, apply
//! temporal smoothing, and map magnitudes in dB onto the 0-255 byte range.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::Source;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::analysis::{MAX_DECIBELS, MIN_DECIBELS};

/// Mono samples accumulated locally before flushing to the shared analyzers
const TAP_FLUSH: usize = 256;

/// Rolling-window analyzer over a live signal tap
pub struct Analyzer {
    window_size: usize,
    smoothing: f32,
    ring: Vec<f32>,
    write_idx: usize,
    smoothed: Vec<f32>,
    sample_count: u64,
    fft: Arc<dyn Fft<f32>>,
}

/// Analyzer shared between the playback path (writer) and renderers (readers)
pub type SharedAnalyzer = Arc<Mutex<Analyzer>>;

/// Create a new shared analyzer instance
pub fn new_shared_analyzer(window_size: usize, smoothing: f32) -> SharedAnalyzer {
    Arc::new(Mutex::new(Analyzer::new(window_size, smoothing)))
}

impl Analyzer {
    /// Create an analyzer with the given window size (a power of two) and
    /// temporal smoothing coefficient in [0, 1]
    pub fn new(window_size: usize, smoothing: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);
        Self {
            window_size,
            smoothing: smoothing.clamp(0.0, 1.0),
            ring: vec![0.0; window_size],
            write_idx: 0,
            smoothed: vec![0.0; window_size / 2],
            sample_count: 0,
            fft,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Total mono samples observed since creation or reset
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Push one downmixed sample into the rolling window
    pub fn push(&mut self, sample: f32) {
        self.ring[self.write_idx] = sample;
        self.write_idx = (self.write_idx + 1) % self.window_size;
        self.sample_count += 1;
    }

    /// Push a slice of downmixed samples
    pub fn extend(&mut self, samples: &[f32]) {
        for &s in samples {
            self.push(s);
        }
    }

    /// Fill `out` with the current window as byte amplitudes centered at 128,
    /// ordered oldest to newest. `out.len()` must equal the window size.
    pub fn time_domain_bytes(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.window_size);
        for (i, slot) in out.iter_mut().enumerate() {
            let s = self.ring[(self.write_idx + i) % self.window_size];
            *slot = (128.0 + s * 128.0).clamp(0.0, 255.0) as u8;
        }
    }

    /// Fill `out` with frequency bin energies as bytes, updating the
    /// temporal-smoothing state. `out.len()` must equal window size / 2.
    pub fn frequency_bytes(&mut self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.window_size / 2);

        let n = self.window_size;
        let mut fft_input: Vec<Complex<f32>> = (0..n)
            .map(|i| {
                let s = self.ring[(self.write_idx + i) % n];
                // Hann window
                let window =
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos());
                Complex::new(s * window, 0.0)
            })
            .collect();

        self.fft.process(&mut fft_input);

        let fft_norm = 1.0 / n as f32;
        let tau = self.smoothing;
        for (k, slot) in out.iter_mut().enumerate() {
            let mag = fft_input[k].norm() * fft_norm;
            let smoothed = self.smoothed[k] * tau + mag * (1.0 - tau);
            self.smoothed[k] = smoothed;

            let db = if smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS) * 255.0;
            *slot = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    /// Clear the window and smoothing state
    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.write_idx = 0;
        self.smoothed.fill(0.0);
        self.sample_count = 0;
    }
}

/// Passthrough wrapper feeding two analyzers from one signal
pub struct AnalyzerTap<S> {
    inner: S,
    wave: SharedAnalyzer,
    stripe: SharedAnalyzer,
    channels: u16,
    sample_rate: u32,
    frame_accum: f32,
    frame_fill: u16,
    pending: Vec<f32>,
}

impl<S> AnalyzerTap<S>
where
    S: Source<Item = f32>,
{
    /// Create a new tap around the given source
    pub fn new(source: S, wave: SharedAnalyzer, stripe: SharedAnalyzer) -> Self {
        let channels = source.channels();
        let sample_rate = source.sample_rate();
        Self {
            inner: source,
            wave,
            stripe,
            channels,
            sample_rate,
            frame_accum: 0.0,
            frame_fill: 0,
            pending: Vec::with_capacity(TAP_FLUSH),
        }
    }

    fn flush_pending(&mut self) {
        if let Ok(mut wave) = self.wave.lock() {
            wave.extend(&self.pending);
        }
        if let Ok(mut stripe) = self.stripe.lock() {
            stripe.extend(&self.pending);
        }
        self.pending.clear();
    }
}

impl<S> Iterator for AnalyzerTap<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = match self.inner.next() {
            Some(s) => s,
            None => {
                // Signal ended; hand the tail to the analyzers
                if !self.pending.is_empty() {
                    self.flush_pending();
                }
                return None;
            }
        };

        self.frame_accum += sample;
        self.frame_fill += 1;
        if self.frame_fill == self.channels {
            self.pending
                .push(self.frame_accum / self.channels as f32);
            self.frame_accum = 0.0;
            self.frame_fill = 0;

            if self.pending.len() >= TAP_FLUSH {
                self.flush_pending();
            }
        }

        Some(sample)
    }
}

impl<S> Source for AnalyzerTap<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
