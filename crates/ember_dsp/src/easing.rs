//! Fade easing curves
//!
//! Maps a normalized time fraction to a perceptually smooth fade value.
//! The two directions use different curves: a fade-in should creep in and
//! then swell, while a fade-out should duck quickly and trail off.

/// Eases `t` in `[0, 1]` along the fade curve for the given direction.
///
/// Fade-in: `t^3.6 * (2.8 - 1.8*t^2)` - slow start, steep rise, settling
/// toward 1 without overshoot.
///
/// Fade-out: `t^2.5 * (3 - 2*t^1.25)` - drops faster than linear at first,
/// smooth tail.
///
/// Both curves hit 0 at `t = 0` and exactly 1 at `t = 1` (the constant pairs
/// `2.8 - 1.8` and `3 - 2` cancel to 1.0 in f32), so a completed fade lands
/// on its target without an audible snap. Out-of-range `t` is the caller's
/// responsibility to clamp.
#[inline]
pub fn ease(t: f32, fading_in: bool) -> f32 {
    if fading_in {
        t.powf(3.6) * (2.8 - 1.8 * t * t)
    } else {
        t.powf(2.5) * (3.0 - 2.0 * t.powf(1.25))
    }
}
