//! Arc-length parameterized polyline holding the resident part of the road.
//!
//! Points are stored as parallel arrays. Distances are local to the resident
//! window; absolute distance along the whole road is `removed_length + local`.

use engine_core::{slerp_unit, DVec3, WORLD_FORWARD, WORLD_UP};

/// Points closer than this to their predecessor are dropped.
const MIN_STEP: f64 = 1e-9;

/// One resident sample of the road.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub position: DVec3,
    /// Unit tangent.
    pub direction: DVec3,
    /// Unit vector, `normalize(up × direction)`.
    pub right: DVec3,
    /// Cumulative distance from the first resident point.
    pub distance: f64,
}

/// Interpolated frame at some distance along the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub position: DVec3,
    pub direction: DVec3,
    pub right: DVec3,
}

impl Default for CurveSample {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            direction: WORLD_FORWARD,
            right: WORLD_UP.cross(WORLD_FORWARD),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArcLengthCurve {
    positions: Vec<DVec3>,
    directions: Vec<DVec3>,
    rights: Vec<DVec3>,
    distances: Vec<f64>,
    /// Sum of the lengths cut off the head by eviction.
    removed_length: f64,
    /// Absolute length of everything ever appended. Never decreases.
    total_generated_length: f64,
    up: DVec3,
}

impl Default for ArcLengthCurve {
    fn default() -> Self {
        Self::new(WORLD_UP)
    }
}

impl ArcLengthCurve {
    pub fn new(up: DVec3) -> Self {
        Self {
            positions: Vec::new(),
            directions: Vec::new(),
            rights: Vec::new(),
            distances: Vec::new(),
            removed_length: 0.0,
            total_generated_length: 0.0,
            up: up.try_normalize().unwrap_or(WORLD_UP),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True once at least two points are resident. Queries before that return defaults.
    pub fn has_valid_curve(&self) -> bool {
        self.positions.len() >= 2
    }

    /// Length of the resident window.
    pub fn total_length(&self) -> f64 {
        self.distances.last().copied().unwrap_or(0.0)
    }

    pub fn removed_length(&self) -> f64 {
        self.removed_length
    }

    pub fn total_generated_length(&self) -> f64 {
        self.total_generated_length
    }

    pub fn up(&self) -> DVec3 {
        self.up
    }

    pub fn point(&self, index: usize) -> Option<CurvePoint> {
        Some(CurvePoint {
            position: *self.positions.get(index)?,
            direction: self.directions[index],
            right: self.rights[index],
            distance: self.distances[index],
        })
    }

    pub fn first_point(&self) -> Option<CurvePoint> {
        self.point(0)
    }

    pub fn last_point(&self) -> Option<CurvePoint> {
        self.point(self.len().checked_sub(1)?)
    }

    pub fn points(&self) -> impl Iterator<Item = CurvePoint> + '_ {
        (0..self.len()).filter_map(move |i| self.point(i))
    }

    /// Local cumulative distances, one per resident point.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Append a point. The first point takes `initial_direction`; later points
    /// face away from their predecessor. Returns false (and stores nothing) if
    /// the point coincides with the previous one.
    pub fn push_point(&mut self, position: DVec3, initial_direction: DVec3) -> bool {
        let (direction, distance) = match self.positions.last() {
            None => (initial_direction.try_normalize().unwrap_or(WORLD_FORWARD), 0.0),
            Some(&prev) => {
                let step = position - prev;
                let len = step.length();
                if len < MIN_STEP {
                    return false;
                }
                self.total_generated_length += len;
                (step / len, self.total_length() + len)
            }
        };
        let right = self
            .up
            .cross(direction)
            .try_normalize()
            .unwrap_or_else(|| direction.any_orthonormal_vector());

        self.positions.push(position);
        self.directions.push(direction);
        self.rights.push(right);
        self.distances.push(distance);
        true
    }

    /// First index whose cumulative distance is `>= distance`, clamped to the
    /// resident range. 0 when empty.
    pub fn find_index(&self, distance: f64) -> usize {
        if self.distances.is_empty() {
            return 0;
        }
        self.distances
            .partition_point(|&d| d < distance)
            .min(self.distances.len() - 1)
    }

    /// Frame at a local distance, clamped to `[0, total_length]`.
    pub fn sample(&self, distance: f64) -> CurveSample {
        if !self.has_valid_curve() {
            return CurveSample::default();
        }
        let d = if distance.is_nan() {
            0.0
        } else {
            distance.clamp(0.0, self.total_length())
        };
        let hi = self.find_index(d);
        if hi == 0 || self.distances[hi] == d {
            return self.sample_at_index(hi);
        }
        let lo = hi - 1;
        let span = self.distances[hi] - self.distances[lo];
        let t = if span > 0.0 {
            (d - self.distances[lo]) / span
        } else {
            0.0
        };
        CurveSample {
            position: self.positions[lo].lerp(self.positions[hi], t),
            direction: slerp_unit(self.directions[lo], self.directions[hi], t),
            right: slerp_unit(self.rights[lo], self.rights[hi], t),
        }
    }

    fn sample_at_index(&self, i: usize) -> CurveSample {
        CurveSample {
            position: self.positions[i],
            direction: self.directions[i],
            right: self.rights[i],
        }
    }

    pub fn position_at(&self, distance: f64) -> DVec3 {
        self.sample(distance).position
    }

    pub fn direction_at(&self, distance: f64) -> DVec3 {
        self.sample(distance).direction
    }

    pub fn right_at(&self, distance: f64) -> DVec3 {
        self.sample(distance).right
    }

    /// Convert an absolute road distance to a local one.
    pub fn to_local(&self, absolute: f64) -> f64 {
        absolute - self.removed_length
    }

    /// Frame at an absolute road distance. Distances outside the resident
    /// window clamp to its first/last point.
    pub fn sample_absolute(&self, absolute: f64) -> CurveSample {
        self.sample(self.to_local(absolute))
    }

    /// Drop `count` points from the head and rebase the remaining distances
    /// so the new first point sits at 0. Returns the length removed.
    /// At least one point is always kept.
    pub fn pop_front(&mut self, count: usize) -> f64 {
        let count = count.min(self.len().saturating_sub(1));
        if count == 0 {
            return 0.0;
        }
        self.positions.drain(..count);
        self.directions.drain(..count);
        self.rights.drain(..count);
        self.distances.drain(..count);

        let shift = self.distances[0];
        for d in self.distances.iter_mut() {
            *d -= shift;
        }
        self.removed_length += shift;
        shift
    }

    /// Forget every point and both length counters.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.directions.clear();
        self.rights.clear();
        self.distances.clear();
        self.removed_length = 0.0;
        self.total_generated_length = 0.0;
    }
}
