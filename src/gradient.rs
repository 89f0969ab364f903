//! Response curves and their baked lookup tables.
//!
//! A curve maps a normalized input in [0, 1] to a response in [0, 1]. The
//! blending pass evaluates one curve per neighbor per sample point, so curves
//! are baked once into a 256-entry table and looked up by rounded index.

use serde::{Deserialize, Serialize};

/// Number of entries in a baked table.
pub const GRADIENT_SIZE: usize = 256;

/// One stop of a piecewise-linear gradient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient (0.0-1.0)
    pub offset: f32,
    /// Response at this position
    pub value: f32,
}

impl GradientStop {
    pub fn new(offset: f32, value: f32) -> Self {
        Self { offset, value }
    }
}

/// A monotonic response curve from [0, 1] to [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseCurve {
    /// Straight line from `from` (at 0) to `to` (at 1)
    Linear { from: f32, to: f32 },
    /// Hermite smoothstep from `from` (at 0) to `to` (at 1)
    SmoothStep { from: f32, to: f32 },
    /// Piecewise-linear gradient through the given stops
    Stops { stops: Vec<GradientStop> },
}

impl ResponseCurve {
    /// Full influence at a boundary, none at the edge of the blend band.
    pub fn falloff() -> Self {
        ResponseCurve::Linear { from: 1.0, to: 0.0 }
    }

    pub fn identity() -> Self {
        ResponseCurve::Linear { from: 0.0, to: 1.0 }
    }

    /// Evaluate the curve. `t` is clamped to [0, 1].
    pub fn sample(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            ResponseCurve::Linear { from, to } => from + (to - from) * t,
            ResponseCurve::SmoothStep { from, to } => {
                let s = t * t * (3.0 - 2.0 * t);
                from + (to - from) * s
            }
            ResponseCurve::Stops { stops } => sample_stops(stops, t),
        }
    }
}

/// Sample a stop list the way an editor colour gradient does: constant before
/// the first stop and after the last, linear in between.
fn sample_stops(stops: &[GradientStop], t: f32) -> f32 {
    let Some(first) = stops.first() else {
        return 0.0;
    };
    if t <= first.offset {
        return first.value;
    }

    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= f32::EPSILON {
                return b.value;
            }
            let f = (t - a.offset) / span;
            return a.value + (b.value - a.value) * f;
        }
    }

    stops.last().map(|s| s.value).unwrap_or(0.0)
}

/// A response curve precomputed at 256 evenly spaced inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct BakedGradient {
    table: [f32; GRADIENT_SIZE],
}

impl BakedGradient {
    /// `table[i] = curve(i / 255)`
    pub fn bake(curve: &ResponseCurve) -> Self {
        let mut table = [0.0f32; GRADIENT_SIZE];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = curve.sample(i as f32 / (GRADIENT_SIZE - 1) as f32);
        }
        Self { table }
    }

    /// Look up the response for a normalized input. Out-of-range input is
    /// clamped to the table ends.
    #[inline]
    pub fn lookup(&self, t: f32) -> f32 {
        self.table[Self::index(t)]
    }

    #[inline]
    pub fn index(t: f32) -> usize {
        let scaled = (t.clamp(0.0, 1.0) * (GRADIENT_SIZE - 1) as f32).round();
        scaled as usize
    }

    pub fn get(&self, index: usize) -> f32 {
        self.table[index.min(GRADIENT_SIZE - 1)]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bake_matches_curve_at_every_entry() {
        let curve = ResponseCurve::SmoothStep { from: 0.0, to: 1.0 };
        let baked = BakedGradient::bake(&curve);
        for i in 0..GRADIENT_SIZE {
            let expected = curve.sample(i as f32 / 255.0);
            assert_eq!(baked.get(i), expected);
        }
    }

    #[test]
    fn test_falloff_endpoints() {
        let baked = BakedGradient::bake(&ResponseCurve::falloff());
        assert_eq!(baked.lookup(0.0), 1.0);
        assert_eq!(baked.lookup(1.0), 0.0);
        assert!((baked.lookup(0.5) - 0.5).abs() < 1.0 / 255.0);
    }

    #[test]
    fn test_lookup_clamps_out_of_range() {
        let baked = BakedGradient::bake(&ResponseCurve::identity());
        assert_eq!(baked.lookup(-3.0), 0.0);
        assert_eq!(baked.lookup(7.0), 1.0);
    }

    #[test]
    fn test_stops_interpolate_linearly() {
        let curve = ResponseCurve::Stops {
            stops: vec![
                GradientStop::new(0.0, 1.0),
                GradientStop::new(0.5, 0.8),
                GradientStop::new(1.0, 0.0),
            ],
        };
        assert!((curve.sample(0.25) - 0.9).abs() < 1e-6);
        assert!((curve.sample(0.75) - 0.4).abs() < 1e-6);
        assert_eq!(curve.sample(1.0), 0.0);
    }

    #[test]
    fn test_stops_hold_outside_range() {
        let curve = ResponseCurve::Stops {
            stops: vec![GradientStop::new(0.2, 0.3), GradientStop::new(0.6, 0.9)],
        };
        assert_eq!(curve.sample(0.0), 0.3);
        assert_eq!(curve.sample(1.0), 0.9);
    }

    #[test]
    fn test_curve_deserializes_from_json() {
        let curve: ResponseCurve =
            serde_json::from_str(r#"{"kind":"smooth_step","from":1.0,"to":0.0}"#).unwrap();
        assert_eq!(curve, ResponseCurve::SmoothStep { from: 1.0, to: 0.0 });
    }
}
