//! Vehicle kinematics along the road.

use engine_core::{move_towards, Pose};
use glam::DVec3;
use roadgen::{GenerationReport, Road};
use serde::{Deserialize, Serialize};

use crate::error::{non_negative, positive, GameError};

/// Per-tick driver input, already normalized by whatever device produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveInput {
    /// Steering in `[-1, 1]`; positive moves right.
    pub lateral: f32,
    pub braking: bool,
}

impl DriveInput {
    pub fn new(lateral: f32, braking: bool) -> Self {
        Self { lateral, braking }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Cruising speed, also the launch speed.
    pub base_speed: f64,
    pub max_speed: f64,
    /// Rate at which the current speed approaches its target (units/s²).
    pub acceleration: f64,
    /// Speed multiplier while braking.
    pub brake_force: f64,
    /// Braking never slows the target below this.
    pub min_braking_speed: f64,
    /// Lateral offset change per second at full steering input.
    pub lateral_speed: f64,
    pub max_lateral_offset: f64,
    /// Height of the vehicle above the road surface.
    pub vertical_offset: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            base_speed: 15.0,
            max_speed: 40.0,
            acceleration: 10.0,
            brake_force: 0.3,
            min_braking_speed: 4.0,
            lateral_speed: 6.0,
            max_lateral_offset: 4.0,
            vertical_offset: 0.5,
        }
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        const S: &str = "vehicle";
        non_negative(S, "base_speed", self.base_speed)?;
        positive(S, "max_speed", self.max_speed)?;
        positive(S, "acceleration", self.acceleration)?;
        non_negative(S, "brake_force", self.brake_force)?;
        non_negative(S, "min_braking_speed", self.min_braking_speed)?;
        non_negative(S, "lateral_speed", self.lateral_speed)?;
        non_negative(S, "max_lateral_offset", self.max_lateral_offset)?;
        if !self.vertical_offset.is_finite() {
            return Err(GameError::Config {
                section: S,
                reason: "vertical_offset must be finite".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleState {
    /// Absolute distance along the road. Only decreases on reset.
    pub distance_traveled: f64,
    pub lateral_offset: f64,
    pub current_speed: f64,
    pub is_braking: bool,
}

#[derive(Debug, Clone)]
pub struct VehicleKinematics {
    config: VehicleConfig,
    state: VehicleState,
    pose: Pose,
}

impl VehicleKinematics {
    pub fn new(config: VehicleConfig) -> Result<Self, GameError> {
        config.validate()?;
        let mut vehicle = Self {
            config,
            state: VehicleState::default(),
            pose: Pose::default(),
        };
        vehicle.reset();
        Ok(vehicle)
    }

    /// Back to the start of the road at cruising speed.
    pub fn reset(&mut self) {
        self.state = VehicleState {
            current_speed: self.config.base_speed.min(self.config.max_speed),
            ..Default::default()
        };
        self.pose = Pose::default();
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn distance(&self) -> f64 {
        self.state.distance_traveled
    }

    pub fn speed(&self) -> f64 {
        self.state.current_speed
    }

    /// Speed the vehicle is heading toward for a braking state.
    pub fn target_speed(&self, braking: bool) -> f64 {
        let c = &self.config;
        let target = if braking {
            (c.base_speed * c.brake_force).max(c.min_braking_speed)
        } else {
            c.base_speed
        };
        target.clamp(0.0, c.max_speed)
    }

    /// Slow enough for a passenger to climb in.
    pub fn can_pickup(&self, speed_threshold: f64) -> bool {
        self.state.current_speed <= speed_threshold
    }

    /// Advance one tick, keep the road topped up around the new position and
    /// refresh the world pose.
    pub fn tick(&mut self, input: DriveInput, dt: f64, road: &mut Road, now: f64) -> GenerationReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let lateral_input = if input.lateral.is_finite() {
            f64::from(input.lateral).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let target = self.target_speed(input.braking);
        let s = &mut self.state;
        s.is_braking = input.braking;
        s.current_speed = move_towards(s.current_speed, target, self.config.acceleration * dt)
            .clamp(0.0, self.config.max_speed);
        s.distance_traveled += s.current_speed * dt;
        let limit = self.config.max_lateral_offset;
        s.lateral_offset = (s.lateral_offset + lateral_input * self.config.lateral_speed * dt).clamp(-limit, limit);

        let report = road.update(s.distance_traveled, s.current_speed, now);
        self.update_pose(road);
        report
    }

    /// Place the vehicle on the road at its current distance and lateral offset.
    pub fn update_pose(&mut self, road: &Road) {
        let sample = road.sample(self.state.distance_traveled);
        let up = road.curve().up();
        let position = sample.position
            + sample.right * self.state.lateral_offset
            + up * self.config.vertical_offset;
        self.pose = Pose::facing(position, sample.direction, up);
    }

    /// World position of the vehicle after the last tick.
    pub fn position(&self) -> DVec3 {
        self.pose.position
    }
}
