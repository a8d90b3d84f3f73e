//! Session state machine: lifecycle, win/lose checks, checkpoints and stats.

use engine_core::clamp01;
use serde::{Deserialize, Serialize};

use crate::error::{positive, GameError};

/// Session lifecycle. Victory and Defeat are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Loading,
    Ready,
    Playing,
    Paused,
    Victory,
    Defeat,
}

impl GameState {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::Victory | GameState::Defeat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Reached the victory distance.
    Arrived,
    /// Intoxication hit the ceiling.
    TooDrunk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub victory_distance: f64,
    pub checkpoint_interval: f64,
    /// Passengers can board only at or below this speed.
    pub pickup_speed_threshold: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            victory_distance: 25_000.0,
            checkpoint_interval: 1_000.0,
            pickup_speed_threshold: 5.0,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        positive("session", "victory_distance", self.victory_distance)?;
        positive("session", "checkpoint_interval", self.checkpoint_interval)?;
        Ok(())
    }
}

/// Counters aggregated over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    /// Seconds spent in `Playing`.
    pub play_time: f64,
    pub distance: f64,
    pub top_speed: f64,
    pub drinks_taken: u32,
    pub antidotes_taken: u32,
    pub checkpoints_reached: u32,
    pub peak_intoxication: f64,
    pub segments_generated: u64,
    pub segments_evicted: u64,
}

/// What the vehicle and meter looked like at the end of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSnapshot {
    pub distance: f64,
    pub speed: f64,
    pub intoxication: f64,
    pub max_intoxication: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    CheckpointReached(f64),
    Ended(EndReason),
}

#[derive(Debug, Clone)]
pub struct GameplayStateMachine {
    config: SessionConfig,
    state: GameState,
    last_checkpoint_distance: f64,
    stats: SessionStats,
}

impl GameplayStateMachine {
    pub fn new(config: SessionConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            config,
            state: GameState::Loading,
            last_checkpoint_distance: 0.0,
            stats: SessionStats::default(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == GameState::Playing
    }

    pub fn last_checkpoint_distance(&self) -> f64 {
        self.last_checkpoint_distance
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut SessionStats {
        &mut self.stats
    }

    /// Route progress in `[0, 1]`.
    pub fn progress(&self, distance: f64) -> f32 {
        clamp01(distance / self.config.victory_distance) as f32
    }

    /// Loading → Ready, once the road can be queried.
    pub fn mark_ready(&mut self) -> Result<(), GameError> {
        self.transition(GameState::Loading, GameState::Ready, "mark ready")
    }

    /// Ready → Playing.
    pub fn start(&mut self) -> Result<(), GameError> {
        self.transition(GameState::Ready, GameState::Playing, "start")
    }

    pub fn pause(&mut self) -> Result<(), GameError> {
        self.transition(GameState::Playing, GameState::Paused, "pause")
    }

    pub fn resume(&mut self) -> Result<(), GameError> {
        self.transition(GameState::Paused, GameState::Playing, "resume")
    }

    /// Back to Loading with fresh stats, from any state.
    pub fn reset(&mut self) {
        self.state = GameState::Loading;
        self.last_checkpoint_distance = 0.0;
        self.stats = SessionStats::default();
    }

    fn transition(&mut self, from: GameState, to: GameState, action: &'static str) -> Result<(), GameError> {
        if self.state != from {
            return Err(GameError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        log::info!("Game state {:?} -> {:?}", from, to);
        self.state = to;
        Ok(())
    }

    /// Evaluate one tick. Only does anything while Playing.
    ///
    /// Advances at most one checkpoint per call; further crossed boundaries are
    /// reported on the following ticks. Victory is checked before defeat.
    pub fn evaluate(&mut self, dt: f64, snapshot: TickSnapshot) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.is_playing() {
            return events;
        }

        let stats = &mut self.stats;
        stats.play_time += dt.max(0.0);
        stats.distance = snapshot.distance;
        stats.top_speed = stats.top_speed.max(snapshot.speed);
        stats.peak_intoxication = stats.peak_intoxication.max(snapshot.intoxication);

        let next_checkpoint = self.last_checkpoint_distance + self.config.checkpoint_interval;
        if snapshot.distance >= next_checkpoint {
            self.last_checkpoint_distance = next_checkpoint;
            self.stats.checkpoints_reached += 1;
            log::info!("Checkpoint reached at {:.0}", next_checkpoint);
            events.push(SessionEvent::CheckpointReached(next_checkpoint));
        }

        let ended = if snapshot.distance >= self.config.victory_distance {
            Some((GameState::Victory, EndReason::Arrived))
        } else if snapshot.intoxication >= snapshot.max_intoxication {
            Some((GameState::Defeat, EndReason::TooDrunk))
        } else {
            None
        };
        if let Some((state, reason)) = ended {
            log::info!("Game state {:?} -> {:?} ({:?})", self.state, state, reason);
            self.state = state;
            events.push(SessionEvent::Ended(reason));
        }
        events
    }
}
