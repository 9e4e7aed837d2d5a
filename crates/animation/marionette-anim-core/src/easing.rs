//! Closed-form easing curves for cross-fade weights.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EasingCurve {
    #[default]
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
}

impl EasingCurve {
    pub const ALL: [EasingCurve; 10] = [
        EasingCurve::Linear,
        EasingCurve::EaseInSine,
        EasingCurve::EaseOutSine,
        EasingCurve::EaseInOutSine,
        EasingCurve::EaseInQuad,
        EasingCurve::EaseOutQuad,
        EasingCurve::EaseInOutQuad,
        EasingCurve::EaseInCubic,
        EasingCurve::EaseOutCubic,
        EasingCurve::EaseInOutCubic,
    ];

    /// Map `t` (clamped to [0,1]) through the curve.
    pub fn evaluate(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            EasingCurve::Linear => t,
            EasingCurve::EaseInSine => 1.0 - (t * PI * 0.5).cos(),
            EasingCurve::EaseOutSine => (t * PI * 0.5).sin(),
            EasingCurve::EaseInOutSine => -((PI * t).cos() - 1.0) * 0.5,
            EasingCurve::EaseInQuad => t * t,
            EasingCurve::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            EasingCurve::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            EasingCurve::EaseInCubic => t * t * t,
            EasingCurve::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            EasingCurve::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
        }
    }
}
