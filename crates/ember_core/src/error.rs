//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the soundboard engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No audio asset found for cell: {0}")]
    ResourceNotFound(String),

    #[error("Failed to decode audio asset {name}: {reason}")]
    DecodeFailed { name: String, reason: String },

    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to play audio stream: {0}")]
    StreamPlayError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Playback sink rejected voice: {0}")]
    SinkRejected(String),

    #[error("Failed to spawn driver thread: {0}")]
    DriverSpawnError(String),

    #[error("DSP error: {0}")]
    DspError(#[from] ember_dsp::DspError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
