//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug)]
pub enum DspError {
    #[error("FFT block size must be a power of two >= 2, got {0}")]
    InvalidBlockSize(usize),
}
