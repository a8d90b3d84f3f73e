//! Drink timer and intoxication meter.
//!
//! While running, a drink lands at random intervals. Passengers on board
//! shrink each drink through the protection factor; an antidote knocks the
//! meter down and opens a window in which drinks are halved and the meter
//! stops decaying.

use engine_core::{clamp01, ResponseCurve};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{non_negative, positive, GameError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntoxicationConfig {
    /// Meter ceiling; reaching it ends the game.
    pub max: f64,
    /// Intoxication added by one unprotected drink.
    pub base_increase: f64,
    /// Largest fraction of a drink passengers can cancel (0..1).
    pub max_reduction: f64,
    /// Passenger count at which protection saturates.
    pub max_protection_passengers: u32,
    /// Protection (0..1) as a function of passenger fill (0..1).
    pub protection_curve: ResponseCurve,
    pub min_drink_interval: f64,
    pub max_drink_interval: f64,
    /// Meter drop per second outside the antidote window.
    pub decay_per_second: f64,
    /// Default amount removed by an antidote pickup.
    pub antidote_amount: f64,
    pub antidote_duration: f64,
}

impl Default for IntoxicationConfig {
    fn default() -> Self {
        Self {
            max: 100.0,
            base_increase: 7.0,
            max_reduction: 0.5,
            max_protection_passengers: 4,
            protection_curve: ResponseCurve::Linear,
            min_drink_interval: 4.0,
            max_drink_interval: 8.0,
            decay_per_second: 0.5,
            antidote_amount: 15.0,
            antidote_duration: 5.0,
        }
    }
}

impl IntoxicationConfig {
    pub fn validate(&self) -> Result<(), GameError> {
        const S: &str = "intoxication";
        positive(S, "max", self.max)?;
        non_negative(S, "base_increase", self.base_increase)?;
        positive(S, "min_drink_interval", self.min_drink_interval)?;
        positive(S, "max_drink_interval", self.max_drink_interval)?;
        non_negative(S, "decay_per_second", self.decay_per_second)?;
        non_negative(S, "antidote_amount", self.antidote_amount)?;
        non_negative(S, "antidote_duration", self.antidote_duration)?;
        if !(0.0..=1.0).contains(&self.max_reduction) {
            return Err(GameError::Config {
                section: S,
                reason: format!("max_reduction must be within 0..=1, got {}", self.max_reduction),
            });
        }
        if self.max_drink_interval < self.min_drink_interval {
            return Err(GameError::Config {
                section: S,
                reason: format!(
                    "drink interval range is inverted: {} > {}",
                    self.min_drink_interval, self.max_drink_interval
                ),
            });
        }
        if self.max_protection_passengers == 0 {
            return Err(GameError::Config {
                section: S,
                reason: "max_protection_passengers must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntoxicationEvent {
    DrinkTaken { amount: f64 },
    AntidoteExpired,
}

#[derive(Debug, Clone)]
pub struct IntoxicationScheduler {
    config: IntoxicationConfig,
    state: SchedulerState,
    value: f64,
    /// Scheduler-local time; advances only while running.
    now: f64,
    next_drink_time: Option<f64>,
    antidote_end_time: Option<f64>,
    passenger_count: u32,
    drinks_taken: u32,
    seed: Option<u64>,
    rng: StdRng,
}

impl IntoxicationScheduler {
    pub fn new(config: IntoxicationConfig, seed: Option<u64>) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            config,
            state: SchedulerState::Stopped,
            value: 0.0,
            now: 0.0,
            next_drink_time: None,
            antidote_end_time: None,
            passenger_count: 0,
            drinks_taken: 0,
            seed,
            rng: make_rng(seed),
        })
    }

    pub fn config(&self) -> &IntoxicationConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Meter fill in `[0, 1]`.
    pub fn normalized(&self) -> f64 {
        clamp01(self.value / self.config.max)
    }

    pub fn is_at_max(&self) -> bool {
        self.value >= self.config.max
    }

    pub fn next_drink_time(&self) -> Option<f64> {
        self.next_drink_time
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn drinks_taken(&self) -> u32 {
        self.drinks_taken
    }

    pub fn passenger_count(&self) -> u32 {
        self.passenger_count
    }

    pub fn set_passenger_count(&mut self, count: u32) {
        self.passenger_count = count;
    }

    pub fn is_antidote_active(&self) -> bool {
        self.antidote_end_time.is_some()
    }

    pub fn antidote_end_time(&self) -> Option<f64> {
        self.antidote_end_time
    }

    /// Start the drink timer. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.state = SchedulerState::Running;
        self.schedule_next_drink();
        log::debug!("Drink timer started, first drink at {:.1}s", self.next_drink_time.unwrap_or(self.now));
    }

    /// Stop the drink timer and drop every pending deadline. The meter keeps its value.
    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
        self.next_drink_time = None;
        self.antidote_end_time = None;
    }

    /// Stop, empty the meter and rewind the clock. A seeded scheduler replays its intervals.
    pub fn reset(&mut self) {
        self.stop();
        self.value = 0.0;
        self.now = 0.0;
        self.drinks_taken = 0;
        self.passenger_count = 0;
        self.rng = make_rng(self.seed);
    }

    /// Multiplier in `[1 - max_reduction, 1]` applied to every drink.
    pub fn protection_factor(&self) -> f64 {
        let c = &self.config;
        let fill = clamp01(self.passenger_count as f64 / c.max_protection_passengers as f64);
        let floor = 1.0 - c.max_reduction;
        (1.0 - c.max_reduction * c.protection_curve.evaluate(fill)).clamp(floor, 1.0)
    }

    /// What the next drink would add right now.
    pub fn drink_amount(&self) -> f64 {
        let amount = self.config.base_increase * self.protection_factor();
        if self.is_antidote_active() {
            amount * 0.5
        } else {
            amount
        }
    }

    /// Apply one drink immediately. Returns the amount added before clamping.
    pub fn take_drink(&mut self) -> f64 {
        let amount = self.drink_amount();
        self.value = (self.value + amount).clamp(0.0, self.config.max);
        self.drinks_taken += 1;
        amount
    }

    /// Remove `amount` (or the configured default) from the meter and open the
    /// antidote window. Returns how much was actually removed.
    pub fn apply_antidote(&mut self, amount: Option<f64>) -> f64 {
        let amount = amount
            .filter(|a| a.is_finite())
            .unwrap_or(self.config.antidote_amount)
            .max(0.0);
        let before = self.value;
        self.value = (self.value - amount).max(0.0);
        self.antidote_end_time = Some(self.now + self.config.antidote_duration);
        before - self.value
    }

    /// Advance the timer. Does nothing while stopped.
    pub fn tick(&mut self, dt: f64) -> Vec<IntoxicationEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.now += dt;

        if let Some(end) = self.antidote_end_time {
            if self.now >= end {
                self.antidote_end_time = None;
                events.push(IntoxicationEvent::AntidoteExpired);
            }
        }

        if !self.is_antidote_active() {
            self.value = (self.value - self.config.decay_per_second * dt).max(0.0);
        }

        if let Some(due) = self.next_drink_time {
            if self.now >= due {
                let amount = self.take_drink();
                events.push(IntoxicationEvent::DrinkTaken { amount });
                self.schedule_next_drink();
            }
        }
        events
    }

    fn schedule_next_drink(&mut self) {
        let (lo, hi) = (self.config.min_drink_interval, self.config.max_drink_interval);
        let interval = if hi > lo { self.rng.gen_range(lo..=hi) } else { lo };
        self.next_drink_time = Some(self.now + interval);
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> IntoxicationScheduler {
        IntoxicationScheduler::new(IntoxicationConfig::default(), Some(17)).unwrap()
    }

    #[test]
    fn protection_limits() {
        let mut s = scheduler();
        assert_eq!(s.protection_factor(), 1.0);
        assert_eq!(s.drink_amount(), 7.0);
        s.set_passenger_count(2);
        assert_eq!(s.drink_amount(), 7.0 * 0.75);
        s.set_passenger_count(4);
        assert_eq!(s.drink_amount(), 3.5);
        s.set_passenger_count(40);
        assert_eq!(s.drink_amount(), 3.5);
    }

    #[test]
    fn protection_curve_overshoot_is_clamped() {
        let mut s = IntoxicationScheduler::new(
            IntoxicationConfig {
                protection_curve: ResponseCurve::Constant(5.0),
                ..Default::default()
            },
            Some(1),
        )
        .unwrap();
        s.set_passenger_count(1);
        assert_eq!(s.protection_factor(), 0.5);
    }

    #[test]
    fn drink_then_antidote() {
        let mut s = scheduler();
        s.start();
        let due = s.next_drink_time().unwrap();
        let events = s.tick(due);
        assert_eq!(events, vec![IntoxicationEvent::DrinkTaken { amount: 7.0 }]);
        // Decay runs before the drink lands, so the meter reads the full amount.
        assert_eq!(s.value(), 7.0);
        assert_eq!(s.drinks_taken(), 1);
        assert!(s.next_drink_time().unwrap() > due);
        let removed = s.apply_antidote(Some(15.0));
        assert_eq!(removed, 7.0);
        assert_eq!(s.value(), 0.0);
        assert!(s.is_antidote_active());
    }

    #[test]
    fn antidote_halves_drinks_and_suspends_decay() {
        let mut s = scheduler();
        s.start();
        s.take_drink();
        s.take_drink();
        s.apply_antidote(Some(4.0));
        assert_eq!(s.value(), 10.0);
        assert_eq!(s.drink_amount(), 3.5);
        let events = s.tick(1.0);
        assert!(events.is_empty());
        assert_eq!(s.value(), 10.0);
    }

    #[test]
    fn antidote_window_expires() {
        let mut s = scheduler();
        s.start();
        s.apply_antidote(None);
        let mut expired = 0;
        for _ in 0..60 {
            expired += s
                .tick(0.1)
                .iter()
                .filter(|e| **e == IntoxicationEvent::AntidoteExpired)
                .count();
        }
        assert_eq!(expired, 1);
        assert!(!s.is_antidote_active());
    }

    #[test]
    fn value_decays_toward_zero() {
        let mut s = scheduler();
        s.start();
        s.take_drink();
        s.tick(2.0);
        assert!((s.value() - 6.0).abs() < 1e-12);
        s.tick(3.0);
        s.tick(100.0);
        assert!(s.value() >= 0.0);
    }

    #[test]
    fn drinks_fire_within_interval_bounds() {
        let mut s = IntoxicationScheduler::new(
            IntoxicationConfig {
                decay_per_second: 0.0,
                ..Default::default()
            },
            Some(3),
        )
        .unwrap();
        s.start();
        let first = s.next_drink_time().unwrap();
        assert!((4.0..=8.0).contains(&first));
        let mut fired = 0;
        for _ in 0..6000 {
            let events = s.tick(0.01);
            if events.iter().any(|e| matches!(e, IntoxicationEvent::DrinkTaken { .. })) {
                let gap = s.next_drink_time().unwrap() - s.now();
                assert!(gap >= 4.0 - 1e-9 && gap <= 8.0 + 1e-9, "gap {}", gap);
                fired += 1;
            }
        }
        assert!(fired >= 7, "only {} drinks in 60s", fired);
        assert_eq!(s.drinks_taken(), fired);
    }

    #[test]
    fn value_is_capped_at_max() {
        let mut s = scheduler();
        for _ in 0..30 {
            s.take_drink();
        }
        assert_eq!(s.value(), 100.0);
        assert!(s.is_at_max());
        assert_eq!(s.normalized(), 1.0);
    }

    #[test]
    fn stopped_scheduler_ignores_ticks_and_restarts_cleanly() {
        let mut s = scheduler();
        s.start();
        s.apply_antidote(None);
        s.stop();
        assert_eq!(s.next_drink_time(), None);
        assert!(!s.is_antidote_active());
        assert!(s.tick(100.0).is_empty());
        assert_eq!(s.now(), 0.0);

        s.start();
        let due = s.next_drink_time().unwrap();
        assert!((4.0..=8.0).contains(&due));
    }

    #[test]
    fn reset_replays_intervals() {
        let mut s = scheduler();
        s.start();
        let first = s.next_drink_time();
        s.tick(3.0);
        s.reset();
        assert_eq!(s.value(), 0.0);
        s.start();
        assert_eq!(s.next_drink_time(), first);
    }

    #[test]
    fn inverted_interval_is_rejected() {
        let bad = IntoxicationConfig {
            min_drink_interval: 9.0,
            max_drink_interval: 2.0,
            ..Default::default()
        };
        assert!(IntoxicationScheduler::new(bad, None).is_err());
    }

    #[test]
    fn unbounded_drink_interval_is_rejected() {
        for max_drink_interval in [f64::INFINITY, f64::NAN] {
            let bad = IntoxicationConfig {
                max_drink_interval,
                ..Default::default()
            };
            assert!(matches!(
                IntoxicationScheduler::new(bad, Some(1)),
                Err(GameError::Config { section: "intoxication", .. })
            ));
        }
    }
}
