//! Core types shared by the road generator and the gameplay crate.
//!
//! - Scalar helpers and tuning curves
//! - Simulation time
//! - World poses
//! - Typed event bus

pub mod events;
pub mod math;
pub mod time;
pub mod transform;

pub use events::*;
pub use math::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{DQuat, DVec3};
