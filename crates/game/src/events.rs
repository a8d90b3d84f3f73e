//! Notifications published to presentation layers (HUD, audio, effects).
//!
//! Fire-and-forget: subscribers receive each event in subscription order and
//! nothing flows back into the simulation.

use crate::session::{EndReason, GameState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    StateChanged { from: GameState, to: GameState },
    /// Route progress in `[0, 1]`.
    ProgressChanged(f32),
    SpeedChanged(f64),
    DrunkennessChanged(f64),
    CheckpointReached(f64),
    GameEnded(EndReason),
    /// Opening road generation progress in `(0, 1]`.
    GenerationProgress(f32),
    DrinkTaken { amount: f64 },
    AntidoteApplied { removed: f64 },
    AntidoteExpired,
}

/// Last values pushed to subscribers, so continuous readings are only
/// re-sent when they actually move.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReportedValues {
    progress: Option<f32>,
    speed: Option<f64>,
    drunkenness: Option<f64>,
}

const PROGRESS_EPSILON: f32 = 1e-4;
const SPEED_EPSILON: f64 = 1e-3;
const DRUNKENNESS_EPSILON: f64 = 1e-3;

impl ReportedValues {
    pub fn progress(&mut self, value: f32) -> Option<GameEvent> {
        changed_f32(&mut self.progress, value, PROGRESS_EPSILON).then_some(GameEvent::ProgressChanged(value))
    }

    pub fn speed(&mut self, value: f64) -> Option<GameEvent> {
        changed_f64(&mut self.speed, value, SPEED_EPSILON).then_some(GameEvent::SpeedChanged(value))
    }

    pub fn drunkenness(&mut self, value: f64) -> Option<GameEvent> {
        changed_f64(&mut self.drunkenness, value, DRUNKENNESS_EPSILON)
            .then_some(GameEvent::DrunkennessChanged(value))
    }
}

fn changed_f32(last: &mut Option<f32>, value: f32, eps: f32) -> bool {
    match *last {
        Some(prev) if (prev - value).abs() < eps => false,
        _ => {
            *last = Some(value);
            true
        }
    }
}

fn changed_f64(last: &mut Option<f64>, value: f64, eps: f64) -> bool {
    match *last {
        Some(prev) if (prev - value).abs() < eps => false,
        _ => {
            *last = Some(value);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reading_is_always_reported() {
        let mut r = ReportedValues::default();
        assert_eq!(r.speed(0.0), Some(GameEvent::SpeedChanged(0.0)));
        assert_eq!(r.progress(0.0), Some(GameEvent::ProgressChanged(0.0)));
    }

    #[test]
    fn unchanged_readings_are_suppressed() {
        let mut r = ReportedValues::default();
        r.drunkenness(7.0);
        assert_eq!(r.drunkenness(7.0), None);
        assert_eq!(r.drunkenness(7.0005), None);
        assert_eq!(r.drunkenness(7.5), Some(GameEvent::DrunkennessChanged(7.5)));
    }
}
