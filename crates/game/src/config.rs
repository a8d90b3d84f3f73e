//! Game configuration (road, vehicle, meter, session, driver). Loaded from config.ron at startup.

use roadgen::{GenerationControllerConfig, PathGeneratorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{positive, GameError};
use crate::intoxication::IntoxicationConfig;
use crate::session::SessionConfig;
use crate::vehicle::VehicleConfig;

/// Settings for the headless driver binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed simulation rate in Hz.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    /// Wall-clock frame length fed to the fixed-step accumulator.
    #[serde(default = "default_frame_time")]
    pub frame_time: f64,
    /// Stop after this much simulated time even if the game has not ended.
    #[serde(default = "default_duration")]
    pub duration: f64,
}

fn default_tick_rate() -> f64 {
    60.0
}
fn default_frame_time() -> f64 {
    1.0 / 30.0
}
fn default_duration() -> f64 {
    300.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            frame_time: default_frame_time(),
            duration: default_duration(),
        }
    }
}

/// Everything needed to build a [`crate::Game`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Master seed. When set, the road and the drink timer derive their seeds from it.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub path: PathGeneratorConfig,
    #[serde(default)]
    pub generation: GenerationControllerConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub intoxication: IntoxicationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl GameConfig {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match Self::from_ron(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    pub fn from_ron(data: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(data)
    }

    /// Save current config to `config.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(s) => {
                if let Err(e) = std::fs::write(&path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }

    /// Check every section. Any error here is fatal for session construction.
    pub fn validate(&self) -> Result<(), GameError> {
        self.path.validate()?;
        self.generation.validate()?;
        self.vehicle.validate()?;
        self.intoxication.validate()?;
        self.session.validate()?;
        positive("simulation", "tick_rate", self.simulation.tick_rate)?;
        positive("simulation", "frame_time", self.simulation.frame_time)?;
        Ok(())
    }

    /// Road seed: explicit path seed wins, else derived from the master seed.
    pub fn path_seed(&self) -> Option<u64> {
        self.path.seed.or(self.seed)
    }

    /// Drink timer seed, derived from the master seed or, without one, from the road seed.
    pub fn intoxication_seed(&self) -> Option<u64> {
        self.seed
            .or(self.path.seed)
            .map(|s| s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}
