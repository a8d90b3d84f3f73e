//! The road a vehicle drives on: generator plus the controller that feeds it.

use crate::controller::{GenerationController, GenerationControllerConfig, GenerationReport};
use crate::curve::{ArcLengthCurve, CurveSample};
use crate::error::PathConfigError;
use crate::generator::{PathGenerator, PathGeneratorConfig};

#[derive(Debug)]
pub struct Road {
    generator: PathGenerator,
    controller: GenerationController,
}

impl Road {
    pub fn new(
        path: PathGeneratorConfig,
        generation: GenerationControllerConfig,
    ) -> Result<Self, PathConfigError> {
        Ok(Self {
            generator: PathGenerator::new(path)?,
            controller: GenerationController::new(generation)?,
        })
    }

    /// Generate the configured number of opening segments, reporting progress
    /// in `(0, 1]` after each one.
    pub fn generate_initial(&mut self, now: f64, mut on_progress: impl FnMut(f32)) {
        let count = self.generator.config().initial_segments.max(1);
        for i in 0..count {
            self.generator.generate_segment(now);
            on_progress((i + 1) as f32 / count as f32);
        }
        log::info!(
            "Generated {} opening road segments ({:.0} units)",
            count,
            self.generator.total_generated_length()
        );
    }

    /// Called once per tick with the consumer's absolute distance and speed.
    pub fn update(&mut self, consumer_distance: f64, speed: f64, now: f64) -> GenerationReport {
        self.controller
            .update(&mut self.generator, consumer_distance, speed, now)
    }

    pub fn is_ready(&self) -> bool {
        self.generator.curve().has_valid_curve()
    }

    pub fn curve(&self) -> &ArcLengthCurve {
        self.generator.curve()
    }

    pub fn sample(&self, absolute_distance: f64) -> CurveSample {
        self.generator.curve().sample_absolute(absolute_distance)
    }

    pub fn generator(&self) -> &PathGenerator {
        &self.generator
    }

    pub fn controller(&self) -> &GenerationController {
        &self.controller
    }

    pub fn reset(&mut self) {
        self.generator.reset();
        self.controller.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road() -> Road {
        Road::new(
            PathGeneratorConfig {
                seed: Some(4),
                initial_segments: 4,
                ..Default::default()
            },
            GenerationControllerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn initial_generation_reports_progress_to_one() {
        let mut r = road();
        assert!(!r.is_ready());
        let mut progress = Vec::new();
        r.generate_initial(0.0, |p| progress.push(p));
        assert_eq!(progress, vec![0.25, 0.5, 0.75, 1.0]);
        assert!(r.is_ready());
        assert_eq!(r.generator().resident_segment_count(), 4);
    }

    #[test]
    fn sample_beyond_generated_road_clamps_to_last_point() {
        let mut r = road();
        r.generate_initial(0.0, |_| {});
        let last = r.curve().last_point().unwrap();
        let far = r.sample(r.generator().total_generated_length() + 500.0);
        assert_eq!(far.position, last.position);
    }

    #[test]
    fn reset_clears_road() {
        let mut r = road();
        r.generate_initial(0.0, |_| {});
        r.update(0.0, 10.0, 0.0);
        r.reset();
        assert!(!r.is_ready());
        assert_eq!(r.generator().total_generated_length(), 0.0);
    }
}
