//! Audio source loading
//!
//! The engine plays decoded PCM; where it comes from is a collaborator
//! concern behind [`SourceLoader`]. [`WavLoader`] covers the common case of
//! a directory of WAV assets; [`MemoryLoader`] serves preloaded buffers in
//! tests and embedded setups.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hound::SampleFormat;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::voice::CellId;

/// Decoded, loopable mono PCM.
///
/// Cheap to clone: the sample data is shared. Multi-channel material is
/// reduced to mono at load time - analysis and playback both operate on the
/// mono signal.
#[derive(Debug, Clone)]
pub struct AudioSource {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioSource {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of one loop iteration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Resolves a cell identifier to decoded PCM.
pub trait SourceLoader: Send + Sync {
    fn load(&self, cell: &CellId) -> EngineResult<AudioSource>;
}

/// Loads `<root>/<cell>.wav` on demand.
pub struct WavLoader {
    root: PathBuf,
}

impl WavLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn decode(path: &Path, cell: &CellId) -> EngineResult<AudioSource> {
        let mut reader = hound::WavReader::open(path).map_err(|err| match err {
            hound::Error::IoError(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                EngineError::ResourceNotFound(cell.to_string())
            }
            other => EngineError::DecodeFailed {
                name: cell.to_string(),
                reason: other.to_string(),
            },
        })?;

        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let decode_failed = |reason: String| EngineError::DecodeFailed {
            name: cell.to_string(),
            reason,
        };

        // Pull every sample out as f32, whatever the container stores
        let raw: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| decode_failed(e.to_string()))?,
            SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| decode_failed(e.to_string()))?
            }
        };

        let mono: Vec<f32> = if channels == 1 {
            raw
        } else {
            raw.chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        if mono.is_empty() {
            return Err(decode_failed("no audio frames".into()));
        }

        debug!(
            cell = %cell,
            frames = mono.len(),
            sample_rate = spec.sample_rate,
            channels,
            "decoded audio asset"
        );
        Ok(AudioSource::new(mono, spec.sample_rate))
    }
}

impl SourceLoader for WavLoader {
    fn load(&self, cell: &CellId) -> EngineResult<AudioSource> {
        let path = self.root.join(format!("{}.wav", cell.as_str()));
        if !path.exists() {
            return Err(EngineError::ResourceNotFound(cell.to_string()));
        }
        Self::decode(&path, cell)
    }
}

/// Serves sources preloaded into memory.
#[derive(Default)]
pub struct MemoryLoader {
    sources: HashMap<CellId, AudioSource>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: impl Into<CellId>, source: AudioSource) {
        self.sources.insert(cell.into(), source);
    }

    /// Builder-style insertion.
    pub fn with(mut self, cell: impl Into<CellId>, source: AudioSource) -> Self {
        self.insert(cell, source);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, cell: &CellId) -> EngineResult<AudioSource> {
        self.sources
            .get(cell)
            .cloned()
            .ok_or_else(|| EngineError::ResourceNotFound(cell.to_string()))
    }
}
