//! Perceptual band reduction
//!
//! Collapses a linear-frequency magnitude spectrum into a small number of
//! bands whose bin groups grow geometrically: low bands stay narrow (high
//! resolution), high bands go wide, mirroring the ear's roughly logarithmic
//! frequency sensitivity. Within a group, later bins are weighted more
//! heavily to counter the natural energy roll-off at higher frequencies.

/// Tuning for [`reduce_bands`].
#[derive(Debug, Clone)]
pub struct BandConfig {
    /// Number of output bands.
    pub band_count: usize,
    /// Geometric growth of the per-band bin group size. The default covers
    /// 512 magnitude bins with 16 bands.
    pub growth_ratio: f32,
    /// Fixed amplification applied after normalization, tuned so typical
    /// program material produces legible bar heights.
    pub gain: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            band_count: 16,
            growth_ratio: 1.39366,
            gain: 10.0,
        }
    }
}

/// Reduce a magnitude spectrum to `config.band_count` band energies, scaled
/// by `scaler` (the voice's current envelope volume, so the display fades in
/// lockstep with the audio).
///
/// Pure and stateless: identical inputs always produce identical output.
/// Degenerate input never panics and never yields NaN or negative values -
/// an empty spectrum, a zero band count, or a group that runs off the end of
/// the vector all collapse to zeros.
pub fn reduce_bands(magnitudes: &[f32], scaler: f32, config: &BandConfig) -> Vec<f32> {
    let mut bands = vec![0.0_f32; config.band_count];
    if magnitudes.is_empty() {
        return bands;
    }

    // Global bin cursor; doubles as the running count of bins consumed.
    let mut bin = 0_usize;
    let mut group_size = 1.0_f32;

    for band in bands.iter_mut() {
        if bin >= magnitudes.len() {
            break; // remaining bands stay zero
        }
        let want = (group_size as usize).max(1);
        let take = want.min(magnitudes.len() - bin);

        let mut sum = 0.0_f32;
        for _ in 0..take {
            // Weight by the 1-based global bin index: the higher bins of a
            // group count for more than its lower bins.
            sum += magnitudes[bin] * (bin + 1) as f32;
            bin += 1;
        }

        // Normalize by the running total of bins consumed so far, not the
        // group width alone.
        let average = sum / bin as f32;
        let value = average * scaler * config.gain;
        *band = if value.is_finite() { value.max(0.0) } else { 0.0 };

        group_size *= config.growth_ratio;
    }

    bands
}
