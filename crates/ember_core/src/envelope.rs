//! Volume envelopes
//!
//! A fade is a value: captured start and target volumes, a start instant,
//! and a duration. The fade driver samples every live envelope against the
//! wall clock at a fixed period; replacing a voice's envelope mid-flight is
//! the cancellation mechanism - the superseded value is simply dropped, so
//! it can never fire a completion.

use std::time::{Duration, Instant};

use ember_dsp::ease;

/// One fade from a start volume to a target volume.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    from: f32,
    to: f32,
    duration: Duration,
    started_at: Instant,
}

/// One observation of an envelope at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSample {
    pub volume: f32,
    pub done: bool,
}

impl Envelope {
    /// Start a fade at `started_at`. `from` should be the voice's *live*
    /// volume so a retriggered fade continues without a discontinuity.
    pub fn new(from: f32, to: f32, duration: Duration, started_at: Instant) -> Self {
        Self {
            from,
            to,
            duration,
            started_at,
        }
    }

    /// The volume this envelope is heading for.
    pub fn target(&self) -> f32 {
        self.to
    }

    fn fading_in(&self) -> bool {
        self.to >= self.from
    }

    /// Sample the envelope at `now`.
    ///
    /// Once the configured duration has elapsed the volume snaps exactly to
    /// the target (no residual floating-point drift) and the envelope
    /// reports itself done. A zero duration completes immediately.
    pub fn sample(&self, now: Instant) -> EnvelopeSample {
        let elapsed = now.saturating_duration_since(self.started_at);
        if self.duration.is_zero() || elapsed >= self.duration {
            return EnvelopeSample {
                volume: self.to,
                done: true,
            };
        }

        let tfrac = (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0);
        let eased = ease(tfrac, self.fading_in());
        EnvelopeSample {
            volume: self.from + (self.to - self.from) * eased,
            done: false,
        }
    }
}
