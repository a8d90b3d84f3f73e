//! Endless Road gameplay core: vehicle, intoxication meter, session rules and
//! the [`Game`] composition root that ticks them over a procedural road.

pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod intoxication;
pub mod session;
pub mod vehicle;

pub use config::{GameConfig, SimulationConfig};
pub use error::GameError;
pub use events::GameEvent;
pub use game::Game;
pub use intoxication::{IntoxicationConfig, IntoxicationEvent, IntoxicationScheduler, SchedulerState};
pub use session::{
    EndReason, GameState, GameplayStateMachine, SessionConfig, SessionEvent, SessionStats,
    TickSnapshot,
};
pub use vehicle::{DriveInput, VehicleConfig, VehicleKinematics, VehicleState};
