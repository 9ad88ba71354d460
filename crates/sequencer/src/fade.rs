use std::time::{Duration, Instant};

use stageconfig::CurveSetting;

/// Easing applied to opacity while two streams overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeCurve {
    Linear,
    #[default]
    Smoothstep,
    EaseInOut,
}

impl From<CurveSetting> for FadeCurve {
    fn from(value: CurveSetting) -> Self {
        match value {
            CurveSetting::Linear => FadeCurve::Linear,
            CurveSetting::Smoothstep => FadeCurve::Smoothstep,
            CurveSetting::EaseInOut => FadeCurve::EaseInOut,
        }
    }
}

impl FadeCurve {
    /// Maps linear progress in `[0, 1]` to the incoming stream's opacity.
    pub fn ease(self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => p,
            FadeCurve::Smoothstep => p * p * (3.0 - 2.0 * p),
            FadeCurve::EaseInOut if p < 0.5 => 2.0 * p * p,
            FadeCurve::EaseInOut => {
                let rest = 1.0 - p;
                1.0 - 2.0 * rest * rest
            }
        }
    }
}

/// Opacities of the outgoing and incoming stream at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mix {
    pub outgoing: f32,
    pub incoming: f32,
    pub finished: bool,
}

impl Mix {
    pub const CUT: Mix = Mix {
        outgoing: 0.0,
        incoming: 1.0,
        finished: true,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct FadeEnvelope {
    started_at: Instant,
    length: Duration,
    curve: FadeCurve,
}

impl FadeEnvelope {
    /// `None` for a zero-length fade.
    pub fn new(length: Duration, curve: FadeCurve, started_at: Instant) -> Option<Self> {
        (!length.is_zero()).then_some(Self {
            started_at,
            length,
            curve,
        })
    }

    pub fn ends_at(&self) -> Instant {
        self.started_at + self.length
    }

    pub fn mix(&self, now: Instant) -> Mix {
        let elapsed = now.saturating_duration_since(self.started_at);
        let progress = elapsed.as_secs_f32() / self.length.as_secs_f32();
        let incoming = self.curve.ease(progress);
        Mix {
            outgoing: 1.0 - incoming,
            incoming,
            finished: now >= self.ends_at(),
        }
    }
}

/// Like [`FadeEnvelope::mix`], but a zero-length fade is an immediate cut.
pub fn mix_at(length: Duration, curve: FadeCurve, started_at: Instant, now: Instant) -> Mix {
    FadeEnvelope::new(length, curve, started_at).map_or(Mix::CUT, |envelope| envelope.mix(now))
}
