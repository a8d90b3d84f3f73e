//! Keeps enough generated road ahead of a moving consumer.

use engine_core::{inverse_lerp, lerp};
use serde::{Deserialize, Serialize};

use crate::error::{require_non_negative, require_positive, PathConfigError};
use crate::generator::PathGenerator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationControllerConfig {
    /// Generate when less than this much road is left at low speed.
    pub base_trigger_distance: f64,
    /// Upper bound for the speed-scaled trigger distance.
    pub max_trigger_distance: f64,
    /// Trigger multiplier reached at `high_speed_threshold`.
    pub speed_multiplier: f64,
    pub low_speed_threshold: f64,
    pub high_speed_threshold: f64,
    /// Cap on segments generated in one tick; extra demand waits for the next tick.
    pub max_segments_per_tick: usize,
}

impl Default for GenerationControllerConfig {
    fn default() -> Self {
        Self {
            base_trigger_distance: 200.0,
            max_trigger_distance: 600.0,
            speed_multiplier: 2.5,
            low_speed_threshold: 10.0,
            high_speed_threshold: 40.0,
            max_segments_per_tick: 2,
        }
    }
}

impl GenerationControllerConfig {
    pub fn validate(&self) -> Result<(), PathConfigError> {
        require_positive("base_trigger_distance", self.base_trigger_distance)?;
        require_positive("speed_multiplier", self.speed_multiplier)?;
        require_positive("max_trigger_distance", self.max_trigger_distance)?;
        require_non_negative("low_speed_threshold", self.low_speed_threshold)?;
        require_non_negative("high_speed_threshold", self.high_speed_threshold)?;
        if self.max_trigger_distance < self.base_trigger_distance {
            return Err(PathConfigError::InvertedRange {
                field: "trigger_distance",
                low: self.base_trigger_distance,
                high: self.max_trigger_distance,
            });
        }
        if self.high_speed_threshold < self.low_speed_threshold {
            return Err(PathConfigError::InvertedRange {
                field: "speed_threshold",
                low: self.low_speed_threshold,
                high: self.high_speed_threshold,
            });
        }
        if self.max_segments_per_tick < 1 {
            return Err(PathConfigError::TooSmall {
                field: "max_segments_per_tick",
                min: 1,
                value: self.max_segments_per_tick,
            });
        }
        Ok(())
    }
}

/// What one controller update did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationReport {
    pub generated: usize,
    pub evicted: usize,
    /// Road left ahead of the consumer after this update.
    pub buffer_ahead: f64,
    /// The consumer had already run out of road when the update began.
    pub exhausted: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationController {
    config: GenerationControllerConfig,
    /// Set while the buffer is exhausted, so the warning is logged once per episode.
    exhausted: bool,
}

impl GenerationController {
    pub fn new(config: GenerationControllerConfig) -> Result<Self, PathConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            exhausted: false,
        })
    }

    pub fn config(&self) -> &GenerationControllerConfig {
        &self.config
    }

    /// Road that must remain ahead of a consumer moving at `speed`.
    pub fn trigger_distance(&self, speed: f64) -> f64 {
        let c = &self.config;
        let t = inverse_lerp(c.low_speed_threshold, c.high_speed_threshold, speed);
        let factor = lerp(1.0, c.speed_multiplier, t);
        (c.base_trigger_distance * factor).clamp(c.base_trigger_distance, c.max_trigger_distance)
    }

    pub fn needs_generation(&self, generator: &PathGenerator, consumer_distance: f64, speed: f64) -> bool {
        generator.remaining_ahead(consumer_distance) <= self.trigger_distance(speed)
    }

    /// Top up the road ahead of the consumer, then evict what it has left behind.
    pub fn update(
        &mut self,
        generator: &mut PathGenerator,
        consumer_distance: f64,
        speed: f64,
        now: f64,
    ) -> GenerationReport {
        let exhausted = generator.remaining_ahead(consumer_distance) <= 0.0;
        if exhausted && !self.exhausted {
            log::warn!(
                "Road buffer exhausted at distance {:.1} (speed {:.1}); clamping to last point",
                consumer_distance,
                speed
            );
        }
        self.exhausted = exhausted;

        let mut generated = 0;
        while generated < self.config.max_segments_per_tick
            && self.needs_generation(generator, consumer_distance, speed)
        {
            generator.generate_segment(now);
            generated += 1;
        }
        let evicted = generator.evict_passed(consumer_distance, speed);

        GenerationReport {
            generated,
            evicted,
            buffer_ahead: generator.remaining_ahead(consumer_distance),
            exhausted,
        }
    }

    pub fn reset(&mut self) {
        self.exhausted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::PathGeneratorConfig;

    fn controller() -> GenerationController {
        GenerationController::new(GenerationControllerConfig::default()).unwrap()
    }

    fn generator() -> PathGenerator {
        PathGenerator::new(PathGeneratorConfig {
            seed: Some(99),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn trigger_distance_scales_with_speed() {
        let c = controller();
        assert_eq!(c.trigger_distance(0.0), 200.0);
        assert_eq!(c.trigger_distance(10.0), 200.0);
        // Halfway between thresholds: factor 1.75.
        assert!((c.trigger_distance(25.0) - 350.0).abs() < 1e-9);
        assert_eq!(c.trigger_distance(40.0), 500.0);
        assert_eq!(c.trigger_distance(1000.0), 500.0);
    }

    #[test]
    fn trigger_distance_is_capped() {
        let c = GenerationController::new(GenerationControllerConfig {
            speed_multiplier: 10.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.trigger_distance(40.0), 600.0);
    }

    #[test]
    fn update_caps_segments_per_tick() {
        let mut c = controller();
        let mut g = generator();
        let report = c.update(&mut g, 0.0, 0.0, 0.0);
        assert_eq!(report.generated, 2);
        assert!(report.exhausted);
        let report = c.update(&mut g, 0.0, 0.0, 0.1);
        assert_eq!(report.generated, 2);
        assert!(!report.exhausted);
        assert!(report.buffer_ahead > 200.0);
        let report = c.update(&mut g, 0.0, 0.0, 0.2);
        assert_eq!(report.generated, 0);
    }

    #[test]
    fn buffer_never_runs_out_at_top_speed() {
        let mut c = controller();
        let mut g = generator();
        let dt = 1.0 / 60.0;
        let speed = 60.0;
        let mut distance = 0.0;
        c.update(&mut g, distance, speed, 0.0);
        for tick in 1..20_000 {
            distance += speed * dt;
            let report = c.update(&mut g, distance, speed, tick as f64 * dt);
            assert!(report.buffer_ahead > 0.0, "ran out of road at tick {}", tick);
            assert!(g.removed_length() <= distance);
            assert!(g.resident_segment_count() <= 16);
        }
        assert!(g.segments_evicted() > 0);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let bad = GenerationControllerConfig {
            low_speed_threshold: 50.0,
            high_speed_threshold: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            GenerationController::new(bad),
            Err(PathConfigError::InvertedRange { .. })
        ));
    }

    #[test]
    fn non_finite_bounds_are_rejected() {
        let nan_cap = GenerationControllerConfig {
            max_trigger_distance: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            GenerationController::new(nan_cap),
            Err(PathConfigError::NotPositive { field: "max_trigger_distance", .. })
        ));
        let nan_high = GenerationControllerConfig {
            high_speed_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            GenerationController::new(nan_high),
            Err(PathConfigError::Negative { field: "high_speed_threshold", .. })
        ));
        let infinite_high = GenerationControllerConfig {
            high_speed_threshold: f64::INFINITY,
            ..Default::default()
        };
        assert!(GenerationController::new(infinite_high).is_err());
    }
}
