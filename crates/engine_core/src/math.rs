//! Scalar helpers and response curves shared by path generation and gameplay.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Clamp a value into `[0, 1]`.
#[inline]
pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Linear interpolation, unclamped.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Where `v` sits between `a` and `b`, clamped to `[0, 1]`.
/// A degenerate range (`a == b`) returns 0 below or at `a`, 1 above it.
pub fn inverse_lerp(a: f64, b: f64, v: f64) -> f64 {
    let span = b - a;
    if span.abs() < f64::EPSILON {
        return if v > a { 1.0 } else { 0.0 };
    }
    clamp01((v - a) / span)
}

/// Step `current` toward `target` by at most `max_delta`. Never overshoots.
pub fn move_towards(current: f64, target: f64, max_delta: f64) -> f64 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + diff.signum() * max_delta
    }
}

/// Spherical interpolation between two unit vectors.
///
/// Nearly parallel inputs fall back to a normalized lerp; exactly opposite
/// inputs have no unique arc, so the lerp result is used as-is there too.
pub fn slerp_unit(a: DVec3, b: DVec3, t: f64) -> DVec3 {
    let dot = a.dot(b).clamp(-1.0, 1.0);
    if dot > 0.9995 || dot < -0.9995 {
        return a.lerp(b, t).try_normalize().unwrap_or(a);
    }
    let theta = dot.acos();
    let sin_theta = theta.sin();
    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;
    (a * wa + b * wb).try_normalize().unwrap_or(a)
}

/// One keyframe of a piecewise-linear [`ResponseCurve::Keys`] curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f64,
    pub value: f64,
}

impl CurveKey {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Maps a normalized input in `[0, 1]` to an output, used wherever a tuning
/// curve shapes a parameter (path smoothing, difficulty ramp, passenger
/// protection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ResponseCurve {
    #[default]
    Linear,
    SmoothStep,
    EaseIn,
    EaseOut,
    Constant(f64),
    /// Piecewise-linear keyframes, sorted by time. Held flat outside the first/last key.
    Keys(Vec<CurveKey>),
}

impl ResponseCurve {
    /// Evaluate at `t` (clamped to `[0, 1]` for the analytic shapes).
    pub fn evaluate(&self, t: f64) -> f64 {
        let x = clamp01(t);
        match self {
            ResponseCurve::Linear => x,
            ResponseCurve::SmoothStep => x * x * (3.0 - 2.0 * x),
            ResponseCurve::EaseIn => x * x,
            ResponseCurve::EaseOut => 1.0 - (1.0 - x) * (1.0 - x),
            ResponseCurve::Constant(v) => *v,
            ResponseCurve::Keys(keys) => evaluate_keys(keys, t),
        }
    }
}

fn evaluate_keys(keys: &[CurveKey], t: f64) -> f64 {
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return 0.0,
    };
    if t <= first.time {
        return first.value;
    }
    if t >= last.time {
        return last.value;
    }
    let hi = keys.partition_point(|k| k.time < t);
    let (k0, k1) = (keys[hi - 1], keys[hi]);
    lerp(k0.value, k1.value, inverse_lerp(k0.time, k1.time, t))
}
