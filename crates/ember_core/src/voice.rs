//! Voice aggregate and cell identifiers
//!
//! One `Voice` per live cell, owning its envelope, its half of the spectral
//! tap, and its playback handle. Keeping these as fields of a single
//! aggregate (rather than parallel maps keyed by the same identifier) makes
//! teardown a single `remove` and leaves nothing to fall out of sync.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ember_dsp::SpectrumAnalyzer;
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::sink::PlaybackHandle;

/// Opaque, stable identifier for one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle state of one voice.
///
/// `Inactive` has no variant here: an inactive cell simply has no `Voice`
/// in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Playing, fade-in still running
    Starting,
    /// Playing at (or fading toward) full volume
    Active,
    /// Fading to silence; torn down when the fade completes
    FadingOut,
}

/// Volume shared between the fade driver (sole writer) and readers on the
/// render and publish threads.
///
/// Stored as f32 bits in an atomic - AtomicF32 doesn't exist, so we
/// bit-cast. Relaxed ordering is fine for an isolated value like this.
#[derive(Debug)]
pub struct SharedVolume(AtomicU32);

impl SharedVolume {
    pub fn new(volume: f32) -> Arc<Self> {
        Arc::new(Self(AtomicU32::new(volume.to_bits())))
    }

    pub fn set(&self, volume: f32) {
        self.0.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// One active (or fading-out) looped playback instance.
pub(crate) struct Voice {
    pub(crate) state: VoiceState,
    /// In-flight fade, if any. Replacing this field is how a fade gets
    /// cancelled; a replaced envelope can never complete.
    pub(crate) envelope: Option<Envelope>,
    pub(crate) volume: Arc<SharedVolume>,
    /// Consumer half of the spectral tap; the producer half lives inside
    /// the sink's render path and dies with the playback handle.
    pub(crate) analyzer: SpectrumAnalyzer,
    pub(crate) playback: Box<dyn PlaybackHandle>,
}
