//! Playback sink abstraction
//!
//! The engine drives playback through a narrow contract so the audio
//! backend stays swappable: cpal in production ([`crate::stream::CpalSink`]),
//! a headless null sink for tests, benches, and machines with no output
//! device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ember_dsp::SpectrumTap;
use tracing::debug;

use crate::error::EngineResult;
use crate::loader::AudioSource;
use crate::voice::SharedVolume;

/// Control surface for one playing voice.
pub trait PlaybackHandle: Send {
    /// Gain applied to the rendered signal, 0.0 - 1.0.
    fn set_volume(&self, volume: f32);

    /// Stop playback and release the voice's slot in the sink. Idempotent.
    fn stop(&self);
}

/// Starts playback of decoded sources.
pub trait PlaybackSink: Send + Sync {
    /// Begin playback at volume 0. The tap receives the voice's rendered
    /// mono samples - pre-gain, so the band reducer can apply the envelope
    /// volume exactly once - for as long as the voice plays.
    fn play(
        &self,
        source: AudioSource,
        tap: SpectrumTap,
        looping: bool,
    ) -> EngineResult<Box<dyn PlaybackHandle>>;
}

/// Headless sink: honors the handle contract without an audio device.
#[derive(Debug, Default)]
pub struct NullSink;

struct NullHandle {
    volume: Arc<SharedVolume>,
    stopped: Arc<AtomicBool>,
}

impl PlaybackHandle for NullHandle {
    fn set_volume(&self, volume: f32) {
        self.volume.set(volume.clamp(0.0, 1.0));
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::Relaxed) {
            debug!("null sink voice stopped");
        }
    }
}

impl PlaybackSink for NullSink {
    fn play(
        &self,
        _source: AudioSource,
        _tap: SpectrumTap,
        _looping: bool,
    ) -> EngineResult<Box<dyn PlaybackHandle>> {
        Ok(Box::new(NullHandle {
            volume: SharedVolume::new(0.0),
            stopped: Arc::new(AtomicBool::new(false)),
        }))
    }
}
