//! Ember DSP - Signal Processing Module
//!
//! This crate provides the pure signal-processing pieces of Ember:
//! - Asymmetric fade easing curves for click-free volume ramps
//! - Windowed FFT spectrum analysis with a lock-free render-thread tap
//! - Perceptual band reduction for driving a visualizer
//!
//! # Architecture
//!
//! Nothing in here knows about voices, cells, or scheduling; the engine
//! crate composes these pieces. The only concession to concurrency is the
//! tap/analyzer split: the producer half is wait-free so it can live inside
//! an audio render callback.

mod analyzer;
mod bands;
mod easing;
mod error;

pub use analyzer::{SpectrumAnalyzer, SpectrumTap, DEFAULT_BLOCK_SIZE};
pub use bands::{reduce_bands, BandConfig};
pub use easing::ease;
pub use error::DspError;
