//! Incremental road generation.
//!
//! The road advances along one horizontal forward axis. Each segment is a
//! cubic Bézier from the previous segment's end pose to a new end point whose
//! lateral and vertical offset from that axis is sampled at random and
//! bounded by `max_width` / `max_height`. Segments live in a FIFO window:
//! appended at the tail, evicted from the head once the consumer is past them.

use std::collections::VecDeque;

use engine_core::{clamp01, DVec3, Pose, ResponseCurve, WORLD_FORWARD, WORLD_UP};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::curve::ArcLengthCurve;
use crate::error::{require_non_negative, require_positive, PathConfigError};

/// Scales segment excursions with progress along a finite route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRamp {
    /// Distance at which the ramp reaches the end of its curve.
    pub route_length: f64,
    /// Excursion scale (0..1) as a function of route progress (0..1).
    pub curve: ResponseCurve,
}

/// Road shape and window parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathGeneratorConfig {
    /// RNG seed. `None` draws one from the OS.
    pub seed: Option<u64>,
    pub start_position: DVec3,
    /// Initial heading. Its horizontal projection defines the road's forward axis.
    pub start_direction: DVec3,
    /// Forward length covered by one segment.
    pub segment_length: f64,
    /// Points sampled per segment.
    pub points_per_segment: usize,
    /// Max lateral offset of a control point from the forward axis.
    pub max_width: f64,
    /// Max vertical offset of a control point from the start height.
    pub max_height: f64,
    /// Shapes a uniform random draw into an offset magnitude.
    pub smoothing: ResponseCurve,
    pub difficulty: Option<DifficultyRamp>,
    /// Segments kept resident before eviction is considered.
    pub max_resident_segments: usize,
    /// How far past a segment's start the consumer must be before it may be evicted.
    pub eviction_margin: f64,
    /// Above this consumer speed the eviction margin is multiplied.
    pub high_speed_threshold: f64,
    pub high_speed_margin_multiplier: f64,
    /// Segments generated while loading, before play starts.
    pub initial_segments: usize,
}

impl Default for PathGeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            start_position: DVec3::ZERO,
            start_direction: WORLD_FORWARD,
            segment_length: 60.0,
            points_per_segment: 20,
            max_width: 6.0,
            max_height: 1.5,
            smoothing: ResponseCurve::SmoothStep,
            difficulty: None,
            max_resident_segments: 12,
            eviction_margin: 50.0,
            high_speed_threshold: 25.0,
            high_speed_margin_multiplier: 2.0,
            initial_segments: 6,
        }
    }
}

impl PathGeneratorConfig {
    pub fn validate(&self) -> Result<(), PathConfigError> {
        require_positive("segment_length", self.segment_length)?;
        require_non_negative("max_width", self.max_width)?;
        require_non_negative("max_height", self.max_height)?;
        require_non_negative("eviction_margin", self.eviction_margin)?;
        require_non_negative("high_speed_threshold", self.high_speed_threshold)?;
        require_positive("high_speed_margin_multiplier", self.high_speed_margin_multiplier)?;
        if self.points_per_segment < 1 {
            return Err(PathConfigError::TooSmall {
                field: "points_per_segment",
                min: 1,
                value: self.points_per_segment,
            });
        }
        if self.max_resident_segments < 2 {
            return Err(PathConfigError::TooSmall {
                field: "max_resident_segments",
                min: 2,
                value: self.max_resident_segments,
            });
        }
        if let Some(ramp) = &self.difficulty {
            require_positive("difficulty.route_length", ramp.route_length)?;
        }
        if !self.start_position.is_finite() {
            return Err(PathConfigError::NonFinite {
                field: "start_position",
            });
        }
        if horizontal(self.start_direction).is_none() {
            return Err(PathConfigError::DegenerateDirection);
        }
        Ok(())
    }
}

fn horizontal(v: DVec3) -> Option<DVec3> {
    DVec3::new(v.x, 0.0, v.z).try_normalize()
}

/// Bookkeeping for one generated stretch of road.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub index: u32,
    /// Resident points owned by this segment.
    pub point_count: usize,
    /// Absolute distance of the segment's first point.
    pub start_distance: f64,
    /// Absolute distance of the segment's last point.
    pub end_distance: f64,
    pub start_pose: Pose,
    pub end_pose: Pose,
    /// Simulation time the segment was generated at.
    pub generated_at: f64,
}

impl PathSegment {
    pub fn length(&self) -> f64 {
        self.end_distance - self.start_distance
    }
}

/// Owns the resident curve and extends/trims it one segment at a time.
#[derive(Debug)]
pub struct PathGenerator {
    config: PathGeneratorConfig,
    curve: ArcLengthCurve,
    segments: VecDeque<PathSegment>,
    rng: StdRng,
    forward_axis: DVec3,
    lateral_axis: DVec3,
    end_position: DVec3,
    end_direction: DVec3,
    next_index: u32,
    segments_evicted: u64,
}

impl PathGenerator {
    pub fn new(config: PathGeneratorConfig) -> Result<Self, PathConfigError> {
        config.validate()?;
        let forward_axis = horizontal(config.start_direction).ok_or(PathConfigError::DegenerateDirection)?;
        let lateral_axis = WORLD_UP.cross(forward_axis);
        let rng = make_rng(config.seed);
        let start_direction = config.start_direction.normalize();
        Ok(Self {
            end_position: config.start_position,
            end_direction: start_direction,
            curve: ArcLengthCurve::new(WORLD_UP),
            segments: VecDeque::new(),
            rng,
            forward_axis,
            lateral_axis,
            next_index: 0,
            segments_evicted: 0,
            config,
        })
    }

    /// Drop the whole road and start over from the configured start pose.
    /// A seeded generator replays the same road.
    pub fn reset(&mut self) {
        self.curve.clear();
        self.segments.clear();
        self.rng = make_rng(self.config.seed);
        self.end_position = self.config.start_position;
        self.end_direction = self.config.start_direction.normalize();
        self.next_index = 0;
        self.segments_evicted = 0;
    }

    pub fn config(&self) -> &PathGeneratorConfig {
        &self.config
    }

    pub fn curve(&self) -> &ArcLengthCurve {
        &self.curve
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    pub fn resident_segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments_generated(&self) -> u32 {
        self.next_index
    }

    pub fn segments_evicted(&self) -> u64 {
        self.segments_evicted
    }

    pub fn total_generated_length(&self) -> f64 {
        self.curve.total_generated_length()
    }

    pub fn removed_length(&self) -> f64 {
        self.curve.removed_length()
    }

    /// Generated road left in front of a consumer at `consumer_distance` (absolute).
    pub fn remaining_ahead(&self, consumer_distance: f64) -> f64 {
        self.curve.total_generated_length() - consumer_distance
    }

    /// Excursion scale at an absolute distance: 1 without a difficulty ramp.
    pub fn excursion_scale(&self, distance: f64) -> f64 {
        match &self.config.difficulty {
            None => 1.0,
            Some(ramp) => clamp01(ramp.curve.evaluate(clamp01(distance / ramp.route_length))),
        }
    }

    /// Append one segment to the road and return it.
    pub fn generate_segment(&mut self, now: f64) -> &PathSegment {
        let length = self.config.segment_length;
        let scale = self.excursion_scale(self.curve.total_generated_length());

        let start = self.end_position;
        let start_dir = self.end_direction;
        let origin = self.config.start_position;
        let along = (start - origin).dot(self.forward_axis);

        let (x2, y2) = self.sample_offset(scale);
        let (x3, y3) = self.sample_offset(scale);
        let c1 = start + start_dir * (length / 3.0);
        let c2 = origin
            + self.forward_axis * (along + length * 2.0 / 3.0)
            + self.lateral_axis * x2
            + WORLD_UP * y2;
        let end = origin
            + self.forward_axis * (along + length)
            + self.lateral_axis * x3
            + WORLD_UP * y3;

        let n = self.config.points_per_segment;
        let first_sample = if self.curve.is_empty() { 0 } else { 1 };
        let mut point_count = 0;
        let mut start_distance = None;
        for i in first_sample..=n {
            let t = i as f64 / n as f64;
            if self.curve.push_point(cubic_bezier(start, c1, c2, end, t), start_dir) {
                point_count += 1;
                start_distance.get_or_insert(self.curve.total_generated_length());
            }
        }

        let end_dir = (end - c2).try_normalize().unwrap_or(self.forward_axis);
        let end_distance = self.curve.total_generated_length();
        let segment = PathSegment {
            index: self.next_index,
            point_count,
            start_distance: start_distance.unwrap_or(end_distance),
            end_distance,
            start_pose: Pose::facing(start, start_dir, WORLD_UP),
            end_pose: Pose::facing(end, end_dir, WORLD_UP),
            generated_at: now,
        };
        log::debug!(
            "Generated road segment {} ({} points, {:.1}..{:.1})",
            segment.index,
            segment.point_count,
            segment.start_distance,
            segment.end_distance
        );

        self.end_position = end;
        self.end_direction = end_dir;
        self.next_index += 1;
        self.segments.push_back(segment);
        &self.segments[self.segments.len() - 1]
    }

    /// Margin behind the consumer that must stay resident, widened at high speed.
    pub fn eviction_margin(&self, consumer_speed: f64) -> f64 {
        if consumer_speed > self.config.high_speed_threshold {
            self.config.eviction_margin * self.config.high_speed_margin_multiplier
        } else {
            self.config.eviction_margin
        }
    }

    /// Evict head segments the consumer has left behind. Returns how many were removed.
    ///
    /// A segment goes only while the window holds more than
    /// `max_resident_segments`, the consumer is further than the eviction
    /// margin past its start, and the consumer has already reached the next
    /// segment, so its position always stays inside the resident window.
    pub fn evict_passed(&mut self, consumer_distance: f64, consumer_speed: f64) -> usize {
        let margin = self.eviction_margin(consumer_speed);
        let mut evicted = 0;
        while self.segments.len() > self.config.max_resident_segments {
            let (oldest, next) = match (self.segments.front(), self.segments.get(1)) {
                (Some(o), Some(n)) => (o, n),
                _ => break,
            };
            if consumer_distance <= oldest.start_distance + margin
                || consumer_distance < next.start_distance
            {
                break;
            }
            let count = oldest.point_count;
            let index = oldest.index;
            let removed = self.curve.pop_front(count);
            self.segments.pop_front();
            self.segments_evicted += 1;
            evicted += 1;
            log::debug!("Evicted road segment {} ({:.1} units)", index, removed);
        }
        evicted
    }

    fn sample_offset(&mut self, scale: f64) -> (f64, f64) {
        let lateral = self.sample_axis(self.config.max_width, scale);
        let vertical = self.sample_axis(self.config.max_height, scale);
        (lateral, vertical)
    }

    fn sample_axis(&mut self, max: f64, scale: f64) -> f64 {
        if max <= 0.0 {
            return 0.0;
        }
        let magnitude = self.config.smoothing.evaluate(self.rng.gen::<f64>());
        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        (sign * magnitude * scale * max).clamp(-max, max)
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn cubic_bezier(p0: DVec3, p1: DVec3, p2: DVec3, p3: DVec3, t: f64) -> DVec3 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}
