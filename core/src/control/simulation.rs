//! Seeded presence simulation for bench operation.
//!
//! Each signal gets an approach simulator cycling IDLE, PRESENCE and GAP
//! with dwell times biased by movement kind: protected turns see sparse
//! traffic, throughs see steady traffic, crosswalks see rare pedestrians.
//! The simulator drives only the `presence` flag; latching and recall
//! turn that into demand exactly as real detection would.

use std::rc::Rc;

use crate::control::signal::{Signal, SignalState, SignalType, TrafficMovement};
use crate::core::context::Context;
use crate::core::timer::Timer;

/// Random integer in `start..=end` biased toward the high end of the
/// range as `bias` approaches 1.0.
fn random_range_biased(rng: &mut fastrand::Rng, start: u32, end: u32, bias: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&bias));
    let biased = rng.f64().powf(1.0 - bias);
    start as f64 + biased * (end - start) as f64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ApproachState {
    Idle,
    Presence,
    Gap,
}

struct ApproachSimulator {
    signal: Rc<Signal>,
    state: ApproachState,
    trigger: f64,
    timer: Timer,
    turn_on_red: bool,
}

impl ApproachSimulator {
    fn new(signal: Rc<Signal>, rng: &mut fastrand::Rng) -> Self {
        let mut sim = Self {
            signal,
            state: ApproachState::Idle,
            trigger: 0.0,
            timer: Timer::new(),
            turn_on_red: false,
        };
        sim.trigger = sim.idle_time(rng, true);
        sim
    }

    fn is_turn(&self) -> bool {
        self.signal.movement() == TrafficMovement::ProtectedTurn
    }

    fn idle_time(&self, rng: &mut fastrand::Rng, first: bool) -> f64 {
        let min_idle = if first { 0 } else { 1 };
        match self.signal.signal_type() {
            SignalType::Vehicle => {
                if self.is_turn() {
                    random_range_biased(rng, min_idle, 300, 0.9)
                } else {
                    random_range_biased(rng, min_idle, 60, 0.1)
                }
            }
            SignalType::Pedestrian => random_range_biased(rng, min_idle, 3600, 0.9),
        }
    }

    fn presence_time(&self, rng: &mut fastrand::Rng, after_idle: bool) -> f64 {
        match self.signal.signal_type() {
            SignalType::Vehicle => {
                if matches!(self.signal.state(), SignalState::Go | SignalState::Extend) {
                    rng.u32(1..3) as f64
                } else if after_idle {
                    random_range_biased(rng, 2, 15, 0.1)
                } else {
                    random_range_biased(rng, 1, 5, 0.1)
                }
            }
            SignalType::Pedestrian => 0.2,
        }
    }

    fn change(&mut self, rng: &mut fastrand::Rng) {
        self.timer.reset();
        match self.state {
            ApproachState::Idle => {
                self.turn_on_red = self.signal.signal_type() == SignalType::Vehicle
                    && !self.is_turn()
                    && rng.bool();
                self.state = ApproachState::Presence;
                self.trigger = self.presence_time(rng, true);
            }
            ApproachState::Presence => match self.signal.signal_type() {
                SignalType::Vehicle => {
                    self.state = ApproachState::Gap;
                    self.trigger = random_range_biased(rng, 1, 5, 0.5);
                }
                SignalType::Pedestrian => {
                    self.state = ApproachState::Idle;
                    self.trigger = self.idle_time(rng, false);
                }
            },
            ApproachState::Gap => {
                if rng.bool() {
                    self.state = ApproachState::Presence;
                    self.trigger = self.presence_time(rng, false);
                } else {
                    self.state = ApproachState::Idle;
                    self.trigger = self.idle_time(rng, false);
                }
            }
        }
    }

    fn tick(&mut self, delta: f64, rng: &mut fastrand::Rng) {
        match self.signal.signal_type() {
            SignalType::Vehicle => {
                // A queue waiting at red does not age out, unless it can
                // turn on red and filter away.
                if !self.signal.active() && self.state == ApproachState::Presence {
                    if self.turn_on_red {
                        self.trigger = random_range_biased(rng, 4, 15, 0.6);
                    } else {
                        self.timer.reset();
                    }
                }
            }
            SignalType::Pedestrian => {
                if self.signal.active() && self.state == ApproachState::Idle {
                    self.timer.reset();
                }
            }
        }
        if self.timer.poll(delta, self.trigger) {
            self.change(rng);
        }
        self.signal
            .set_presence(self.state == ApproachState::Presence);
    }
}

pub struct IntersectionSimulator {
    rng: fastrand::Rng,
    approaches: Vec<ApproachSimulator>,
}

impl IntersectionSimulator {
    pub fn new(signals: &[Rc<Signal>], seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let approaches = signals
            .iter()
            .map(|s| ApproachSimulator::new(s.clone(), &mut rng))
            .collect();
        Self { rng, approaches }
    }

    /// Ticked from the time clock but immune to time freeze: traffic
    /// keeps arriving while the operator holds the indication.
    pub fn tick(&mut self, ctx: Context) {
        let delta = ctx.delay();
        for approach in &mut self.approaches {
            approach.tick(delta, &mut self.rng);
        }
    }
}
