//! The clock bus: five named periodic tick sources.
//!
//! Each clock is a cooperative task that sleeps for its live-configurable
//! period and then invokes its subscribers directly, in registration
//! order. There is no keyed event dispatch; the subscriber list lives
//! inside the clock. A subscriber that overruns the period does not stack
//! ticks: the clock re-paces from "now" and counts the skipped ticks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::core::context::{Context, RateParameter, TimeState};
use crate::core::event::Event;
use crate::core::id::{IdRegistry, Identifiable, ObjectId, ObjectKind};
use crate::error::ConfigError;

pub const TIME_CLOCK: ObjectId = 901;
pub const INPUTS_CLOCK: ObjectId = 902;
pub const FIELDBUS_CLOCK: ObjectId = 903;
pub const NETWORK_CLOCK: ObjectId = 904;
pub const FLASH_CLOCK: ObjectId = 905;

const P_TIME_RATE: ObjectId = 8100;
const P_INPUTS_RATE: ObjectId = 8101;
const P_FIELDBUS_RATE: ObjectId = 8102;
const P_NETWORK_RATE: ObjectId = 8103;
const P_FLASH_FPM: ObjectId = 8104;

/// Receives clock ticks. One implementation typically subscribes to
/// several clocks and dispatches on the clock id.
pub trait Tickable {
    fn tick(&self, clock: ObjectId, ctx: Context);
}

/// How a clock's rate parameter translates to a period.
#[derive(Clone, Copy, Debug)]
enum Cadence {
    Hertz,
    /// Flashes per minute; the clock ticks once per half flash period so
    /// each tick is one scalar toggle.
    FlashesPerMinute,
}

pub struct Clock {
    id: ObjectId,
    name: &'static str,
    cadence: Cadence,
    param: Rc<RateParameter>,
    time: Rc<TimeState>,
    subscribers: RefCell<Vec<Rc<dyn Tickable>>>,
    ticks: Cell<u64>,
    missed: Cell<u64>,
}

impl Clock {
    fn new(
        id: ObjectId,
        name: &'static str,
        cadence: Cadence,
        param: Rc<RateParameter>,
        time: Rc<TimeState>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id,
            name,
            cadence,
            param,
            time,
            subscribers: RefCell::new(Vec::new()),
            ticks: Cell::new(0),
            missed: Cell::new(0),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rate(&self) -> &RateParameter {
        &self.param
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    /// Ticks dropped because a period elapsed before the previous
    /// dispatch finished.
    pub fn missed(&self) -> u64 {
        self.missed.get()
    }

    pub fn subscribe(&self, subscriber: Rc<dyn Tickable>) {
        self.subscribers.borrow_mut().push(subscriber);
    }

    /// Wall-clock seconds between ticks at the current rate, or `None`
    /// when the clock is parked (rate zero).
    fn period(&self) -> Option<f64> {
        let rate = self.param.value();
        if rate <= 0.0 {
            return None;
        }
        Some(match self.cadence {
            Cadence::Hertz => 1.0 / rate,
            Cadence::FlashesPerMinute => (60.0 / rate) / 2.0,
        })
    }

    fn context(&self, period: f64) -> Context {
        let is_time = self.id == TIME_CLOCK;
        Context {
            rate: 1.0 / period,
            scale: if is_time { self.time.scale.get() } else { 1.0 },
            timing: !is_time || !self.time.freeze.get(),
        }
    }

    pub async fn run(self: Rc<Self>, shutdown: Rc<Event>) {
        let mut next = tokio::time::Instant::now();
        loop {
            if shutdown.is_set() {
                break;
            }
            let Some(period) = self.period() else {
                // Parked; poll for a rate change.
                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = tokio::time::sleep(Duration::from_millis(250)) => {}
                }
                next = tokio::time::Instant::now();
                continue;
            };
            next += Duration::from_secs_f64(period);
            let now = tokio::time::Instant::now();
            if next <= now {
                // Overran: coalesce, most recent tick wins.
                let behind = (now - next).as_secs_f64();
                let skipped = (behind / period) as u64 + 1;
                self.missed.set(self.missed.get() + skipped);
                debug!(clock = self.name, skipped, "tick overrun, coalescing");
                next = now;
            }
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tokio::time::sleep_until(next) => {}
            }
            self.ticks.set(self.ticks.get() + 1);
            let ctx = self.context(period);
            let subscribers = self.subscribers.borrow().clone();
            for subscriber in subscribers {
                subscriber.tick(self.id, ctx);
            }
        }
    }
}

impl Identifiable for Clock {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Clock
    }
}

/// Initial clock rates; validated against the per-clock ranges when the
/// set is built.
#[derive(Clone, Copy, Debug)]
pub struct ClockRates {
    pub time_hz: f64,
    pub inputs_hz: f64,
    pub fieldbus_hz: f64,
    pub network_hz: f64,
    pub flash_fpm: f64,
}

impl Default for ClockRates {
    fn default() -> Self {
        Self {
            time_hz: 1.0,
            inputs_hz: 20.0,
            fieldbus_hz: 20.0,
            network_hz: 20.0,
            flash_fpm: 60.0,
        }
    }
}

/// The standard five-clock bus.
pub struct ClockSet {
    pub time: Rc<Clock>,
    pub inputs: Rc<Clock>,
    pub fieldbus: Rc<Clock>,
    pub network: Rc<Clock>,
    pub flash: Rc<Clock>,
}

impl ClockSet {
    pub fn new(
        registry: &mut IdRegistry,
        time_state: Rc<TimeState>,
        rates: ClockRates,
    ) -> Result<Self, ConfigError> {
        for id in [
            TIME_CLOCK,
            INPUTS_CLOCK,
            FIELDBUS_CLOCK,
            NETWORK_CLOCK,
            FLASH_CLOCK,
        ] {
            registry.claim(ObjectKind::Clock, id)?;
        }
        let mut rate = |id, name, value, lo, hi| -> Result<Rc<RateParameter>, ConfigError> {
            registry.claim(ObjectKind::Parameter, id)?;
            Ok(Rc::new(RateParameter::new(id, name, value, lo, hi)?))
        };
        let time_rate = rate(P_TIME_RATE, "time rate", rates.time_hz, 0.0, 100.0)?;
        let inputs_rate = rate(P_INPUTS_RATE, "inputs rate", rates.inputs_hz, 1.0, 40.0)?;
        let fieldbus_rate = rate(P_FIELDBUS_RATE, "fieldbus rate", rates.fieldbus_hz, 1.0, 20.0)?;
        let network_rate = rate(P_NETWORK_RATE, "network rate", rates.network_hz, 1.0, 40.0)?;
        let flash_fpm = rate(P_FLASH_FPM, "flash rate", rates.flash_fpm, 54.0, 66.0)?;

        Ok(Self {
            time: Clock::new(
                TIME_CLOCK,
                "time",
                Cadence::Hertz,
                time_rate,
                time_state.clone(),
            ),
            inputs: Clock::new(
                INPUTS_CLOCK,
                "inputs",
                Cadence::Hertz,
                inputs_rate,
                time_state.clone(),
            ),
            fieldbus: Clock::new(
                FIELDBUS_CLOCK,
                "fieldbus",
                Cadence::Hertz,
                fieldbus_rate,
                time_state.clone(),
            ),
            network: Clock::new(
                NETWORK_CLOCK,
                "network",
                Cadence::Hertz,
                network_rate,
                time_state.clone(),
            ),
            flash: Clock::new(
                FLASH_CLOCK,
                "flash",
                Cadence::FlashesPerMinute,
                flash_fpm,
                time_state,
            ),
        })
    }

    pub fn all(&self) -> [Rc<Clock>; 5] {
        [
            self.time.clone(),
            self.inputs.clone(),
            self.fieldbus.clone(),
            self.network.clone(),
            self.flash.clone(),
        ]
    }
}
