//! Procedural road generation: an endless smooth 3D path produced on demand,
//! held in a bounded window and queried by arc length.

pub mod controller;
pub mod curve;
pub mod error;
pub mod generator;
pub mod road;

pub use controller::*;
pub use curve::*;
pub use error::*;
pub use generator::*;
pub use road::*;
