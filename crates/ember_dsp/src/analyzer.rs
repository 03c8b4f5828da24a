//! Per-voice spectrum analysis
//!
//! Computes a short-time magnitude spectrum of a voice's rendered signal
//! without touching the audio render path with locks or allocation.
//!
//! # Architecture
//!
//! [`SpectrumAnalyzer::channel`] hands back two halves of one tap:
//! the [`SpectrumTap`] producer is moved into the render callback and pushes
//! mono samples into a lock-free SPSC ring; the [`SpectrumAnalyzer`] consumer
//! is polled from a control thread, drains the ring one block at a time, and
//! keeps the most recent magnitude vector (overwrite, not accumulate).

use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::DspError;

/// Default FFT block size (must be a power of 2).
/// 1024 samples at 44.1kHz = ~23ms window, ~43Hz resolution.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Ring capacity in blocks. If the analyzer lags further behind than this,
/// the render path drops samples rather than ever waiting.
const RING_BLOCKS: usize = 4;

/// Hann window coefficient for position `n` of `size`.
/// Hann suppresses the spectral leakage a raw block edge would introduce.
fn hann(n: usize, size: usize) -> f32 {
    0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32).cos())
}

/// Pre-computed Hann window lookup table
struct HannWindow {
    coeffs: Vec<f32>,
}

impl HannWindow {
    fn new(size: usize) -> Self {
        let coeffs = (0..size).map(|i| hann(i, size)).collect();
        Self { coeffs }
    }

    #[inline]
    fn apply(&self, sample: f32, index: usize) -> f32 {
        sample * self.coeffs[index]
    }
}

/// Producer half of a spectral tap.
///
/// # Real-time Safety
/// `push` is wait-free: no allocations, no locks, O(1). When the ring is
/// full the sample is dropped; the analyzer simply skips that block.
pub struct SpectrumTap {
    producer: Producer<f32>,
}

impl SpectrumTap {
    /// Push one rendered mono sample.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        let _ = self.producer.push(sample);
    }

    /// Push a slice of rendered mono samples.
    pub fn push_slice(&mut self, samples: &[f32]) {
        for &sample in samples {
            let _ = self.producer.push(sample);
        }
    }
}

/// Consumer half of a spectral tap: drains buffered samples and caches the
/// latest magnitude spectrum (`block_size / 2` bins).
pub struct SpectrumAnalyzer {
    block_size: usize,
    consumer: Consumer<f32>,
    window: HannWindow,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// Create a connected tap/analyzer pair for one voice.
    ///
    /// `block_size` must be a power of two >= 2.
    pub fn channel(block_size: usize) -> Result<(SpectrumTap, SpectrumAnalyzer), DspError> {
        if block_size < 2 || !block_size.is_power_of_two() {
            return Err(DspError::InvalidBlockSize(block_size));
        }

        let (producer, consumer) = RingBuffer::new(block_size * RING_BLOCKS);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(block_size);

        let analyzer = SpectrumAnalyzer {
            block_size,
            consumer,
            window: HannWindow::new(block_size),
            fft,
            scratch: vec![Complex::new(0.0, 0.0); block_size],
            magnitudes: vec![0.0; block_size / 2],
        };
        Ok((SpectrumTap { producer }, analyzer))
    }

    /// Drain buffered samples, recomputing the spectrum for every complete
    /// block. Returns true if the magnitude vector was updated.
    ///
    /// Underrun policy: a partial block stays in the ring for the next call
    /// and the previous magnitude vector remains in place. Padding with
    /// silence instead would inject an artificial edge into the spectrum.
    pub fn process(&mut self) -> bool {
        let mut updated = false;

        while self.consumer.slots() >= self.block_size {
            let Ok(chunk) = self.consumer.read_chunk(self.block_size) else {
                break;
            };
            let (first, second) = chunk.as_slices();
            for (i, &sample) in first.iter().chain(second.iter()).enumerate() {
                self.scratch[i] = Complex::new(self.window.apply(sample, i), 0.0);
            }
            chunk.commit_all();

            self.fft.process(&mut self.scratch);

            // First half of the FFT output: bin 0 (DC) through Nyquist - 1,
            // standard real-input layout.
            for (bin, mag) in self.scratch[..self.block_size / 2]
                .iter()
                .zip(self.magnitudes.iter_mut())
            {
                *mag = bin.norm();
            }
            updated = true;
        }

        updated
    }

    /// Latest magnitude spectrum: `block_size / 2` non-negative bins.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// The configured FFT block size in samples.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Zero the cached spectrum (used when a voice is torn down).
    pub fn reset(&mut self) {
        self.magnitudes.fill(0.0);
    }
}
