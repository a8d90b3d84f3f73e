//! Composition root: owns the road, vehicle, meter and session and runs one
//! deterministic tick at a time.

use engine_core::{EventBus, SimClock, SubscriptionId};
use roadgen::{GenerationReport, Road};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::events::{GameEvent, ReportedValues};
use crate::intoxication::{IntoxicationEvent, IntoxicationScheduler};
use crate::session::{
    EndReason, GameState, GameplayStateMachine, SessionEvent, SessionStats, TickSnapshot,
};
use crate::vehicle::{DriveInput, VehicleKinematics};

#[derive(Debug)]
pub struct Game {
    config: GameConfig,
    clock: SimClock,
    road: Road,
    vehicle: VehicleKinematics,
    intoxication: IntoxicationScheduler,
    session: GameplayStateMachine,
    events: EventBus<GameEvent>,
    passengers_enabled: bool,
    last_report: GenerationReport,
    reported: ReportedValues,
}

impl Game {
    /// Build every subsystem from `config`. Fails on the first invalid section.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        let mut path = config.path.clone();
        path.seed = config.path_seed();
        let road = Road::new(path, config.generation.clone())?;
        let vehicle = VehicleKinematics::new(config.vehicle.clone())?;
        let intoxication =
            IntoxicationScheduler::new(config.intoxication.clone(), config.intoxication_seed())?;
        let session = GameplayStateMachine::new(config.session.clone())?;
        let mut clock = SimClock::new();
        clock.set_fixed_rate(config.simulation.tick_rate);
        Ok(Self {
            config,
            clock,
            road,
            vehicle,
            intoxication,
            session,
            events: EventBus::new(),
            passengers_enabled: false,
            last_report: GenerationReport::default(),
            reported: ReportedValues::default(),
        })
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&GameEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn events(&self) -> &EventBus<GameEvent> {
        &self.events
    }

    /// Generate the opening road and move Loading → Ready.
    pub fn load(&mut self) -> Result<(), GameError> {
        if self.session.state() != GameState::Loading {
            return Err(GameError::InvalidTransition {
                from: self.session.state(),
                action: "load",
            });
        }
        let now = self.clock.elapsed_seconds();
        let events = &mut self.events;
        self.road
            .generate_initial(now, |p| events.emit(GameEvent::GenerationProgress(p)));
        self.vehicle.update_pose(&self.road);
        self.change_state(GameplayStateMachine::mark_ready)?;
        self.report_values();
        Ok(())
    }

    /// Ready → Playing. Starts the drink timer and lets passengers board.
    pub fn start(&mut self) -> Result<(), GameError> {
        self.change_state(GameplayStateMachine::start)?;
        self.intoxication.start();
        self.passengers_enabled = true;
        log::info!(
            "Session started: {:.0} units to go, seed {:?}",
            self.config.session.victory_distance,
            self.config.seed
        );
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), GameError> {
        self.change_state(GameplayStateMachine::pause)
    }

    pub fn resume(&mut self) -> Result<(), GameError> {
        self.change_state(GameplayStateMachine::resume)
    }

    /// Reset every subsystem and regenerate the road from the configured seed.
    /// Subscribers are kept.
    pub fn restart(&mut self) -> Result<(), GameError> {
        let from = self.session.state();
        self.road.reset();
        self.vehicle.reset();
        self.intoxication.reset();
        self.session.reset();
        self.clock.reset();
        self.passengers_enabled = false;
        self.last_report = GenerationReport::default();
        self.reported = ReportedValues::default();
        if from != GameState::Loading {
            self.events.emit(GameEvent::StateChanged {
                from,
                to: GameState::Loading,
            });
        }
        log::info!("Session restarted");
        self.load()
    }

    /// One simulation step: vehicle (which keeps the road topped up), then the
    /// meter, then win/lose checks. Ignored unless Playing.
    pub fn tick(&mut self, input: DriveInput, dt: f64) {
        if !self.session.is_playing() {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock.advance(dt);
        let now = self.clock.elapsed_seconds();

        self.last_report = self.vehicle.tick(input, dt, &mut self.road, now);

        for event in self.intoxication.tick(dt) {
            match event {
                IntoxicationEvent::DrinkTaken { amount } => {
                    log::debug!("Drink taken (+{:.2}, meter {:.1})", amount, self.intoxication.value());
                    self.events.emit(GameEvent::DrinkTaken { amount });
                }
                IntoxicationEvent::AntidoteExpired => self.events.emit(GameEvent::AntidoteExpired),
            }
        }

        let stats = self.session.stats_mut();
        stats.drinks_taken = self.intoxication.drinks_taken();
        stats.segments_generated = u64::from(self.road.generator().segments_generated());
        stats.segments_evicted = self.road.generator().segments_evicted();

        let snapshot = TickSnapshot {
            distance: self.vehicle.distance(),
            speed: self.vehicle.speed(),
            intoxication: self.intoxication.value(),
            max_intoxication: self.intoxication.config().max,
        };
        let session_events = self.session.evaluate(dt, snapshot);
        self.report_values();

        for event in session_events {
            match event {
                SessionEvent::CheckpointReached(d) => self.events.emit(GameEvent::CheckpointReached(d)),
                SessionEvent::Ended(reason) => self.finish(reason),
            }
        }
    }

    /// Passenger count feeding the drink protection factor.
    pub fn set_passenger_count(&mut self, count: u32) {
        self.intoxication.set_passenger_count(count);
    }

    /// True while playing with passenger spawning on and the vehicle slow enough to board.
    pub fn can_pickup_passengers(&self) -> bool {
        self.passengers_enabled
            && self.session.is_playing()
            && self.vehicle.can_pickup(self.config.session.pickup_speed_threshold)
    }

    /// Antidote pickup. `None` uses the configured amount. Returns what was
    /// removed from the meter; zero and no event unless Playing.
    pub fn antidote_pickup(&mut self, amount: Option<f64>) -> f64 {
        if !self.session.is_playing() {
            return 0.0;
        }
        let removed = self.intoxication.apply_antidote(amount);
        self.session.stats_mut().antidotes_taken += 1;
        self.events.emit(GameEvent::AntidoteApplied { removed });
        if let Some(e) = self.reported.drunkenness(self.intoxication.value()) {
            self.events.emit(e);
        }
        removed
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> GameState {
        self.session.state()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn road(&self) -> &Road {
        &self.road
    }

    pub fn vehicle(&self) -> &VehicleKinematics {
        &self.vehicle
    }

    pub fn intoxication(&self) -> &IntoxicationScheduler {
        &self.intoxication
    }

    pub fn session(&self) -> &GameplayStateMachine {
        &self.session
    }

    pub fn stats(&self) -> &SessionStats {
        self.session.stats()
    }

    pub fn passengers_enabled(&self) -> bool {
        self.passengers_enabled
    }

    /// What the road controller did on the last tick.
    pub fn last_generation_report(&self) -> GenerationReport {
        self.last_report
    }

    pub fn progress(&self) -> f32 {
        self.session.progress(self.vehicle.distance())
    }

    fn change_state(
        &mut self,
        action: impl FnOnce(&mut GameplayStateMachine) -> Result<(), GameError>,
    ) -> Result<(), GameError> {
        let from = self.session.state();
        action(&mut self.session)?;
        self.events.emit(GameEvent::StateChanged {
            from,
            to: self.session.state(),
        });
        Ok(())
    }

    fn finish(&mut self, reason: EndReason) {
        self.intoxication.stop();
        self.passengers_enabled = false;
        let stats = self.session.stats();
        log::info!(
            "Session over ({:?}): {:.0} units in {:.1}s, {} drinks, {} checkpoints",
            reason,
            stats.distance,
            stats.play_time,
            stats.drinks_taken,
            stats.checkpoints_reached
        );
        self.events.emit(GameEvent::GameEnded(reason));
        self.events.emit(GameEvent::StateChanged {
            from: GameState::Playing,
            to: self.session.state(),
        });
    }

    fn report_values(&mut self) {
        let progress = self.progress();
        let updates = [
            self.reported.progress(progress),
            self.reported.speed(self.vehicle.speed()),
            self.reported.drunkenness(self.intoxication.value()),
        ];
        for event in updates.into_iter().flatten() {
            self.events.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intoxication::IntoxicationConfig;
    use crate::session::SessionConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn short_route() -> GameConfig {
        GameConfig {
            seed: Some(11),
            session: SessionConfig {
                victory_distance: 300.0,
                checkpoint_interval: 100.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn playing(config: GameConfig) -> Game {
        let mut game = Game::new(config).unwrap();
        game.load().unwrap();
        game.start().unwrap();
        game
    }

    fn record(game: &mut Game) -> Rc<RefCell<Vec<GameEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        game.subscribe(move |e| sink.borrow_mut().push(*e));
        log
    }

    fn run_until_over(game: &mut Game, max_ticks: usize) {
        for _ in 0..max_ticks {
            if game.state().is_terminal() {
                break;
            }
            game.tick(DriveInput::default(), 0.1);
        }
    }

    #[test]
    fn load_reports_generation_progress_then_ready() {
        let mut game = Game::new(short_route()).unwrap();
        let log = record(&mut game);
        game.load().unwrap();
        let events = log.borrow();
        let progress: Vec<f32> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::GenerationProgress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), game.config().path.initial_segments);
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(progress.last().copied(), Some(1.0));
        assert!(events.contains(&GameEvent::StateChanged {
            from: GameState::Loading,
            to: GameState::Ready,
        }));
        assert!(game.road().is_ready());
        assert!(game.load().is_err());
    }

    #[test]
    fn ticks_before_start_do_nothing() {
        let mut game = Game::new(short_route()).unwrap();
        game.load().unwrap();
        game.tick(DriveInput::default(), 1.0);
        assert_eq!(game.vehicle().distance(), 0.0);
        assert_eq!(game.clock().elapsed_seconds(), 0.0);
        assert!(!game.intoxication().is_running());
    }

    #[test]
    fn victory_fires_exactly_once() {
        let mut game = playing(short_route());
        let log = record(&mut game);
        run_until_over(&mut game, 1_000);
        assert_eq!(game.state(), GameState::Victory);
        for _ in 0..10 {
            game.tick(DriveInput::default(), 0.1);
        }
        let events = log.borrow();
        let endings = events.iter().filter(|e| matches!(e, GameEvent::GameEnded(_))).count();
        assert_eq!(endings, 1);
        assert!(events.contains(&GameEvent::GameEnded(EndReason::Arrived)));
        assert!(!game.intoxication().is_running());
        assert!(!game.passengers_enabled());
        assert!(game.stats().distance >= 300.0);
    }

    #[test]
    fn checkpoints_are_reported_in_order() {
        let mut game = playing(short_route());
        let log = record(&mut game);
        run_until_over(&mut game, 1_000);
        let reached: Vec<f64> = log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                GameEvent::CheckpointReached(d) => Some(*d),
                _ => None,
            })
            .collect();
        assert_eq!(reached, vec![100.0, 200.0, 300.0]);
        assert_eq!(game.stats().checkpoints_reached, 3);
    }

    #[test]
    fn maxed_meter_ends_in_defeat() {
        let mut config = short_route();
        config.session.victory_distance = 100_000.0;
        config.intoxication = IntoxicationConfig {
            max: 10.0,
            base_increase: 20.0,
            min_drink_interval: 0.5,
            max_drink_interval: 1.0,
            ..Default::default()
        };
        let mut game = playing(config);
        let log = record(&mut game);
        run_until_over(&mut game, 100);
        assert_eq!(game.state(), GameState::Defeat);
        let events = log.borrow();
        assert!(events.iter().any(|e| matches!(e, GameEvent::DrinkTaken { .. })));
        assert!(events.contains(&GameEvent::GameEnded(EndReason::TooDrunk)));
        assert_eq!(
            events.last(),
            Some(&GameEvent::StateChanged {
                from: GameState::Playing,
                to: GameState::Defeat,
            })
        );
    }

    #[test]
    fn pause_freezes_the_simulation() {
        let mut game = playing(short_route());
        game.tick(DriveInput::default(), 0.5);
        let distance = game.vehicle().distance();
        let elapsed = game.clock().elapsed_seconds();
        let meter_clock = game.intoxication().now();
        game.pause().unwrap();
        for _ in 0..20 {
            game.tick(DriveInput::new(1.0, true), 0.5);
        }
        assert_eq!(game.vehicle().distance(), distance);
        assert_eq!(game.clock().elapsed_seconds(), elapsed);
        assert_eq!(game.intoxication().now(), meter_clock);
        assert!(!game.can_pickup_passengers());
        game.resume().unwrap();
        game.tick(DriveInput::default(), 0.5);
        assert!(game.vehicle().distance() > distance);
    }

    #[test]
    fn subscribers_are_notified_in_subscription_order() {
        let mut game = Game::new(short_route()).unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        game.subscribe(move |_| first.borrow_mut().push(1));
        let id = game.subscribe(move |_| second.borrow_mut().push(2));
        game.load().unwrap();
        let seen = order.borrow().clone();
        assert!(!seen.is_empty());
        assert!(seen.chunks(2).all(|pair| pair == [1, 2]));

        assert!(game.unsubscribe(id));
        order.borrow_mut().clear();
        game.start().unwrap();
        assert_eq!(*order.borrow(), vec![1]);
    }

    #[test]
    fn speed_is_only_reported_when_it_changes() {
        let mut game = playing(short_route());
        let log = record(&mut game);
        for _ in 0..10 {
            game.tick(DriveInput::default(), 0.1);
        }
        let speed_events = log
            .borrow()
            .iter()
            .filter(|e| matches!(e, GameEvent::SpeedChanged(_)))
            .count();
        assert_eq!(speed_events, 0);

        game.tick(DriveInput::new(0.0, true), 0.1);
        assert!(log.borrow().contains(&GameEvent::SpeedChanged(14.0)));
    }

    #[test]
    fn braking_opens_passenger_pickup() {
        let mut game = playing(short_route());
        assert!(!game.can_pickup_passengers());
        for _ in 0..20 {
            game.tick(DriveInput::new(0.0, true), 0.1);
        }
        assert!(game.can_pickup_passengers());
        game.set_passenger_count(4);
        assert_eq!(game.intoxication().passenger_count(), 4);
    }

    #[test]
    fn antidote_only_counts_while_playing() {
        let mut game = Game::new(short_route()).unwrap();
        game.load().unwrap();
        assert_eq!(game.antidote_pickup(None), 0.0);
        assert_eq!(game.stats().antidotes_taken, 0);

        game.start().unwrap();
        let log = record(&mut game);
        assert_eq!(game.antidote_pickup(Some(5.0)), 0.0);
        assert_eq!(game.stats().antidotes_taken, 1);
        assert!(game.intoxication().is_antidote_active());
        assert!(log.borrow().contains(&GameEvent::AntidoteApplied { removed: 0.0 }));
    }

    #[test]
    fn restart_replays_the_same_road() {
        let mut game = playing(short_route());
        for _ in 0..50 {
            game.tick(DriveInput::new(0.3, false), 0.1);
        }
        let first_run = game.road().sample(20.0).position;
        let log = record(&mut game);

        game.restart().unwrap();
        assert_eq!(game.state(), GameState::Ready);
        assert_eq!(game.vehicle().distance(), 0.0);
        assert_eq!(game.intoxication().value(), 0.0);
        assert_eq!(game.stats(), &SessionStats::default());
        assert_eq!(game.clock().elapsed_seconds(), 0.0);
        assert!((game.road().sample(20.0).position - first_run).length() < 1e-9);
        assert_eq!(
            log.borrow().first(),
            Some(&GameEvent::StateChanged {
                from: GameState::Playing,
                to: GameState::Loading,
            })
        );
        game.start().unwrap();
        assert!(game.intoxication().is_running());
    }

    #[test]
    fn invalid_config_is_fatal() {
        let mut config = GameConfig::default();
        config.vehicle.acceleration = 0.0;
        assert!(matches!(Game::new(config), Err(GameError::Config { section: "vehicle", .. })));
    }
}
