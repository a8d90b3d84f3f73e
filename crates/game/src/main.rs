//! Endless Road headless driver: runs a scripted autopilot over the procedural
//! road at a fixed timestep and prints the session stats.

use anyhow::Result;
use engine_core::SimClock;
use game::{DriveInput, Game, GameConfig, GameEvent};

/// Braking pulse used to slow down for passengers.
const BRAKE_PERIOD: f64 = 30.0;
const BRAKE_LENGTH: f64 = 4.0;
const MAX_PASSENGERS: u32 = 4;
/// Autopilot reaches for an antidote above this meter fill.
const ANTIDOTE_THRESHOLD: f64 = 0.6;
const ANTIDOTE_COOLDOWN: f64 = 20.0;

struct Autopilot {
    passengers: u32,
    last_boarding: f64,
    last_antidote: f64,
}

impl Autopilot {
    fn new() -> Self {
        Self {
            passengers: 0,
            last_boarding: f64::NEG_INFINITY,
            last_antidote: f64::NEG_INFINITY,
        }
    }

    fn input(&self, t: f64) -> DriveInput {
        let lateral = ((t * 0.4).sin() * 0.8) as f32;
        let braking = t % BRAKE_PERIOD >= BRAKE_PERIOD - BRAKE_LENGTH && self.passengers < MAX_PASSENGERS;
        DriveInput::new(lateral, braking)
    }

    fn after_tick(&mut self, game: &mut Game, t: f64) {
        if game.can_pickup_passengers() && self.passengers < MAX_PASSENGERS && t - self.last_boarding >= 1.0 {
            self.passengers += 1;
            self.last_boarding = t;
            game.set_passenger_count(self.passengers);
            log::info!("Passenger boarded ({} aboard)", self.passengers);
        }
        if game.intoxication().normalized() >= ANTIDOTE_THRESHOLD && t - self.last_antidote >= ANTIDOTE_COOLDOWN {
            self.last_antidote = t;
            let removed = game.antidote_pickup(None);
            log::info!("Antidote picked up (-{:.1})", removed);
        }
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::ProgressChanged(_) | GameEvent::SpeedChanged(_) | GameEvent::DrunkennessChanged(_) => {
            log::trace!("{:?}", event)
        }
        GameEvent::GenerationProgress(p) => log::debug!("Road generation {:.0}%", p * 100.0),
        GameEvent::DrinkTaken { amount } => log::info!("Drink taken (+{:.2})", amount),
        GameEvent::CheckpointReached(d) => log::info!("Checkpoint {:.0}", d),
        GameEvent::GameEnded(reason) => log::info!("Game ended: {:?}", reason),
        other => log::debug!("{:?}", other),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GameConfig::load();
    let duration = config.simulation.duration;
    let frame_time = config.simulation.frame_time;
    let mut game = Game::new(config)?;
    game.subscribe(log_event);
    game.load()?;
    game.start()?;

    let step = game.clock().fixed_timestep_seconds();
    let mut frames = SimClock::new();
    frames.set_fixed_rate(1.0 / step);
    let mut autopilot = Autopilot::new();

    while !game.state().is_terminal() && game.clock().elapsed_seconds() < duration {
        frames.advance(frame_time);
        while frames.should_fixed_update() {
            let t = game.clock().elapsed_seconds();
            game.tick(autopilot.input(t), step);
            autopilot.after_tick(&mut game, t);
            if game.state().is_terminal() {
                break;
            }
        }
    }

    let stats = game.stats();
    println!("Endless Road - session summary");
    println!("  outcome:         {:?}", game.state());
    println!("  distance:        {:.0} / {:.0}", stats.distance, game.config().session.victory_distance);
    println!("  play time:       {:.1}s", stats.play_time);
    println!("  top speed:       {:.1}", stats.top_speed);
    println!("  drinks:          {}", stats.drinks_taken);
    println!("  antidotes:       {}", stats.antidotes_taken);
    println!("  checkpoints:     {}", stats.checkpoints_reached);
    println!("  peak meter:      {:.1}", stats.peak_intoxication);
    println!("  road segments:   {} generated, {} evicted", stats.segments_generated, stats.segments_evicted);
    Ok(())
}
