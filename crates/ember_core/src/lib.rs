//! Ember Core - Soundboard Engine
//!
//! This crate provides the audio engine behind a grid-of-cells soundboard:
//! - Concurrent looping voices with crossfade-based start/stop
//! - A solo operation that isolates one cell
//! - Per-voice FFT band energies published for a visualizer
//! - Pull-based snapshot state for any display layer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Input / gesture layer                   │
//! │     activate(cell) / deactivate(cell) / toggle / solo       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ synchronous Result
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Soundboard ── fade driver (10ms) ── publish driver (~30ms) │
//! │     │ SourceLoader (WAV/memory)                             │
//! │     └ PlaybackSink (cpal / null)                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ rtrb sample rings
//!                              ▼
//!          ember_dsp: Hann window + FFT + band reduction
//! ```
//!
//! The display layer never gets callbacks; it polls [`Soundboard::band_energies`]
//! and [`Soundboard::volumes`] at its own rate and always sees complete
//! snapshots.

mod config;
mod engine;
mod envelope;
mod error;
mod loader;
mod scheduler;
mod sink;
mod stream;
mod voice;

pub use config::BoardConfig;
pub use engine::Soundboard;
pub use envelope::{Envelope, EnvelopeSample};
pub use error::{EngineError, EngineResult};
pub use loader::{AudioSource, MemoryLoader, SourceLoader, WavLoader};
pub use sink::{NullSink, PlaybackHandle, PlaybackSink};
pub use stream::CpalSink;
pub use voice::{CellId, SharedVolume, VoiceState};

// Re-export DSP types for convenience
pub use ember_dsp::{ease, reduce_bands, BandConfig, DspError, SpectrumAnalyzer, SpectrumTap};
