//! Board and driver configuration

use std::time::Duration;

use ember_dsp::BandConfig;
use serde::{Deserialize, Serialize};

/// Soundboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Fade-in duration applied on `activate`
    pub fade_in: Duration,

    /// Fade-out duration applied on `deactivate`
    pub fade_out: Duration,

    /// Number of perceptual bands published per voice
    pub band_count: usize,

    /// FFT block size in samples (must be a power of two)
    pub fft_block_size: usize,

    /// Geometric growth of the per-band bin group size
    pub band_growth_ratio: f32,

    /// Fixed visual gain applied to band values
    pub band_gain: f32,

    /// Volume update period of the fade driver. Kept well under one display
    /// frame so fades look continuous at any refresh rate.
    pub fade_tick: Duration,

    /// Band-energy publish period (independent of the fade tick and of the
    /// render-path block cadence)
    pub publish_tick: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            fade_in: Duration::from_secs(4),
            fade_out: Duration::from_secs(4),
            band_count: 16,
            fft_block_size: 1024,
            band_growth_ratio: 1.39366,
            band_gain: 10.0,
            fade_tick: Duration::from_millis(10),
            publish_tick: Duration::from_millis(30),
        }
    }
}

impl BoardConfig {
    /// Long, scene-setting crossfades (the default tuning).
    pub fn ambient() -> Self {
        Self::default()
    }

    /// Short fades and a faster publish rate for snappy toggling.
    pub fn snappy() -> Self {
        Self {
            fade_in: Duration::from_millis(300),
            fade_out: Duration::from_millis(500),
            publish_tick: Duration::from_millis(16),
            ..Self::default()
        }
    }

    /// The band-reduction tuning derived from this configuration.
    pub fn band_config(&self) -> BandConfig {
        BandConfig {
            band_count: self.band_count,
            growth_ratio: self.band_growth_ratio,
            gain: self.band_gain,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fft_block_size < 2 || !self.fft_block_size.is_power_of_two() {
            return Err(format!(
                "Invalid FFT block size: {} (must be a power of two >= 2)",
                self.fft_block_size
            ));
        }
        if self.band_count == 0 || self.band_count > self.fft_block_size / 2 {
            return Err(format!(
                "Invalid band count: {} (must be 1..={})",
                self.band_count,
                self.fft_block_size / 2
            ));
        }
        if !self.band_growth_ratio.is_finite() || self.band_growth_ratio < 1.0 {
            return Err(format!(
                "Invalid band growth ratio: {}",
                self.band_growth_ratio
            ));
        }
        if !self.band_gain.is_finite() || self.band_gain <= 0.0 {
            return Err(format!("Invalid band gain: {}", self.band_gain));
        }
        if self.fade_tick.is_zero() || self.publish_tick.is_zero() {
            return Err("Driver tick periods must be non-zero".into());
        }
        Ok(())
    }
}
