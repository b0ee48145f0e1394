//! The per-head interval state machine.
//!
//! A signal owns one indication head (a vehicle approach, a pedestrian
//! crossing, or a protected-turn arrow), a timer, per-state interval
//! timing and configuration, and the mapping from each interval state to
//! the field output it energises. `serve()` is the cooperative service
//! entry point: it transitions the signal out of STOP and resolves when
//! the signal has cleared back to STOP.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::control::field::{FieldOutput, FieldState};
use crate::core::event::Event;
use crate::core::context::Context;
use crate::core::id::{Identifiable, ObjectId, ObjectKind};
use crate::error::{ConfigError, Fault};

/// Interval states. CAUTION and EXTEND are rigid (they must progress once
/// their minimum has elapsed); STOP, GO and FYA may rest when configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    Stop,
    Caution,
    Extend,
    Go,
    Fya,
    LsFlash,
}

impl SignalState {
    pub fn name(self) -> &'static str {
        match self {
            SignalState::Stop => "STOP",
            SignalState::Caution => "CAUTION",
            SignalState::Extend => "EXTEND",
            SignalState::Go => "GO",
            SignalState::Fya => "FYA",
            SignalState::LsFlash => "LS_FLASH",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Vehicle,
    Pedestrian,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficMovement {
    Thru,
    PermissiveTurn,
    ProtectedTurn,
    Crosswalk,
}

/// Which colour this head flashes in LS_FLASH mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashChannel {
    Red,
    Yellow,
}

/// Dwell bounds for one interval state, in seconds. `minimum` is the
/// floor; `maximum`, if present, forces progression even from a restable
/// state once conflicting demand removes the rest privilege; `revert`
/// extends the STOP floor after a flashing-yellow-arrow service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntervalTiming {
    pub minimum: f64,
    pub maximum: Option<f64>,
    pub revert: Option<f64>,
}

impl IntervalTiming {
    pub fn new(minimum: f64) -> Self {
        Self {
            minimum,
            maximum: None,
            revert: None,
        }
    }

    pub fn with_maximum(minimum: f64, maximum: f64) -> Self {
        Self {
            minimum,
            maximum: Some(maximum),
            revert: None,
        }
    }

    pub fn with_revert(mut self, revert: f64) -> Self {
        self.revert = Some(revert);
        self
    }
}

/// Behaviour knobs for one interval state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntervalConfig {
    /// Drive the mapped field output FLASHING instead of ON.
    pub flashing: bool,
    /// May dwell past minimum while the signal is free of conflicting
    /// demand.
    pub rest: bool,
    /// Bias the dwell toward early expiry when other phases are waiting.
    pub reduce: bool,
}

impl IntervalConfig {
    pub fn flashing() -> Self {
        Self {
            flashing: true,
            ..Self::default()
        }
    }

    pub fn resting() -> Self {
        Self {
            rest: true,
            ..Self::default()
        }
    }

    pub fn flashing_resting() -> Self {
        Self {
            flashing: true,
            rest: true,
            reduce: false,
        }
    }
}

pub struct Signal {
    id: ObjectId,
    signal_type: SignalType,
    movement: TrafficMovement,
    flash_channel: FlashChannel,
    initial_state: SignalState,
    timing: HashMap<SignalState, IntervalTiming>,
    config: HashMap<SignalState, IntervalConfig>,
    mapping: HashMap<SignalState, Rc<FieldOutput>>,

    state: Cell<SignalState>,
    timer: Cell<f64>,
    /// Passage gap while extending; presence restarts it.
    gap_timer: Cell<f64>,
    /// Seconds spent in FYA this service, for the protected-service delay.
    fya_timer: Cell<f64>,
    /// The current service window passed through FYA; STOP entry is then
    /// held for the configured revert offset.
    served_fya: Cell<bool>,

    demand: Cell<bool>,
    presence: Cell<bool>,
    recall: Cell<bool>,
    recycle: bool,
    latch: bool,
    free: Cell<bool>,
    fya_enabled: Cell<bool>,
    fya_service_delay: Option<f64>,
    fya_phase: Option<ObjectId>,
    /// Set by the cycler while the paired phase is in service.
    fya_hold: Cell<bool>,

    inactive: Event,
}

pub struct SignalSettings {
    pub signal_type: SignalType,
    pub movement: TrafficMovement,
    pub flash_channel: FlashChannel,
    pub initial_state: SignalState,
    pub recall: bool,
    pub recycle: bool,
    pub latch: bool,
    pub fya_enabled: bool,
    pub fya_service_delay: Option<f64>,
    pub fya_phase: Option<ObjectId>,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            signal_type: SignalType::Vehicle,
            movement: TrafficMovement::Thru,
            flash_channel: FlashChannel::Red,
            initial_state: SignalState::Stop,
            recall: false,
            recycle: false,
            latch: false,
            fya_enabled: false,
            fya_service_delay: None,
            fya_phase: None,
        }
    }
}

impl Signal {
    pub fn new(
        id: ObjectId,
        timing: HashMap<SignalState, IntervalTiming>,
        config: HashMap<SignalState, IntervalConfig>,
        mapping: HashMap<SignalState, Rc<FieldOutput>>,
        settings: SignalSettings,
    ) -> Result<Rc<Self>, ConfigError> {
        let tag = crate::core::id::tag(ObjectKind::Signal, id);
        for (state, interval) in &timing {
            if let Some(max) = interval.maximum
                && max < interval.minimum
            {
                return Err(ConfigError::TimingRange {
                    tag,
                    state: state.name(),
                    min: interval.minimum,
                    max,
                });
            }
        }
        let mut required = vec![SignalState::Stop, SignalState::Caution, SignalState::Go];
        if settings.fya_enabled {
            required.push(SignalState::Fya);
        }
        for state in required {
            if !timing.contains_key(&state) {
                return Err(ConfigError::MissingTiming {
                    tag,
                    state: state.name(),
                });
            }
        }

        let signal = Rc::new(Self {
            id,
            signal_type: settings.signal_type,
            movement: settings.movement,
            flash_channel: settings.flash_channel,
            initial_state: settings.initial_state,
            timing,
            config,
            mapping,
            state: Cell::new(settings.initial_state),
            timer: Cell::new(0.0),
            gap_timer: Cell::new(0.0),
            fya_timer: Cell::new(0.0),
            served_fya: Cell::new(false),
            demand: Cell::new(false),
            presence: Cell::new(false),
            recall: Cell::new(settings.recall),
            recycle: settings.recycle,
            latch: settings.latch,
            free: Cell::new(false),
            fya_enabled: Cell::new(settings.fya_enabled),
            fya_service_delay: settings.fya_service_delay,
            fya_phase: settings.fya_phase,
            fya_hold: Cell::new(false),
            inactive: Event::new(),
        });
        if settings.initial_state == SignalState::Stop {
            signal.inactive.set();
        }
        // Energise the initial indication; an unmapped initial state just
        // stays dark until first commanded.
        if let Some(output) = signal.mapping.get(&signal.initial_state) {
            let cfg = signal.config_for(signal.initial_state);
            output.set(if cfg.flashing {
                FieldState::Flashing
            } else {
                FieldState::On
            });
        }
        Ok(signal)
    }

    pub fn signal_type(&self) -> SignalType {
        self.signal_type
    }

    pub fn movement(&self) -> TrafficMovement {
        self.movement
    }

    pub fn flash_channel(&self) -> FlashChannel {
        self.flash_channel
    }

    pub fn initial_state(&self) -> SignalState {
        self.initial_state
    }

    pub fn state(&self) -> SignalState {
        self.state.get()
    }

    pub fn timer(&self) -> f64 {
        self.timer.get()
    }

    pub fn active(&self) -> bool {
        !self.inactive.is_set()
    }

    pub fn demand(&self) -> bool {
        self.demand.get()
    }

    pub fn presence(&self) -> bool {
        self.presence.get()
    }

    pub fn recall(&self) -> bool {
        self.recall.get()
    }

    pub fn recycle(&self) -> bool {
        self.recycle
    }

    pub fn free(&self) -> bool {
        self.free.get()
    }

    pub fn fya_enabled(&self) -> bool {
        self.fya_enabled.get()
    }

    pub fn fya_phase(&self) -> Option<ObjectId> {
        self.fya_phase
    }

    pub fn set_demand(&self, value: bool) {
        if value != self.demand.replace(value) {
            debug!(tag = %self.tag(), demand = value, "demand changed");
        }
    }

    pub fn set_presence(&self, value: bool) {
        if value != self.presence.replace(value) {
            debug!(tag = %self.tag(), presence = value, "presence changed");
        }
    }

    pub fn set_recall(&self, value: bool) {
        if value != self.recall.replace(value) {
            debug!(tag = %self.tag(), recall = value, "recall changed");
        }
    }

    pub fn set_free(&self, value: bool) {
        self.free.set(value);
    }

    pub fn set_fya_enabled(&self, value: bool) {
        if value != self.fya_enabled.replace(value) {
            debug!(tag = %self.tag(), fya = value, "fya changed");
        }
    }

    pub fn set_fya_hold(&self, value: bool) {
        self.fya_hold.set(value);
    }

    /// Every field output this signal maps, ascending by id, deduplicated.
    pub fn field_outputs(&self) -> Vec<Rc<FieldOutput>> {
        let mut outputs: Vec<Rc<FieldOutput>> = Vec::new();
        for output in self.mapping.values() {
            if !outputs.iter().any(|o| o.id() == output.id()) {
                outputs.push(output.clone());
            }
        }
        outputs.sort_by_key(|o| o.id());
        outputs
    }

    fn config_for(&self, state: SignalState) -> IntervalConfig {
        self.config.get(&state).copied().unwrap_or_default()
    }

    fn extend_configured(&self) -> bool {
        self.timing
            .get(&SignalState::Extend)
            .is_some_and(|t| t.minimum > 0.0)
    }

    fn next_state(&self) -> SignalState {
        match self.state.get() {
            SignalState::Stop => {
                if self.fya_enabled.get() && self.fya_hold.get() {
                    SignalState::Fya
                } else {
                    SignalState::Go
                }
            }
            SignalState::Go => {
                if self.extend_configured() {
                    SignalState::Extend
                } else {
                    SignalState::Caution
                }
            }
            SignalState::Extend => SignalState::Caution,
            SignalState::Fya => SignalState::Caution,
            SignalState::Caution => SignalState::Stop,
            SignalState::LsFlash => self.initial_state,
        }
    }

    /// Transition to the next (or forced) state, retiring the previous
    /// indication and energising the new one.
    pub fn change(&self, force_state: Option<SignalState>) -> Result<(), Fault> {
        let current = self.state.get();
        let next = force_state.unwrap_or_else(|| self.next_state());
        let output = self
            .mapping
            .get(&next)
            .ok_or_else(|| Fault::UnmappedState {
                tag: self.tag(),
                state: next.name(),
            })?
            .clone();

        if let Some(previous) = self.mapping.get(&current) {
            previous.set(FieldState::Off);
        }
        if current == SignalState::Fya {
            self.served_fya.set(true);
        }
        self.timer.set(0.0);
        self.gap_timer.set(0.0);
        if next == SignalState::Fya {
            self.fya_timer.set(0.0);
        }
        self.state.set(next);

        let cfg = self.config_for(next);
        output.set(if cfg.flashing {
            FieldState::Flashing
        } else {
            FieldState::On
        });

        if next != SignalState::Stop {
            self.inactive.clear();
        }
        debug!(
            tag = %self.tag(),
            from = current.name(),
            to = next.name(),
            "interval change"
        );
        Ok(())
    }

    /// One time-clock tick. All interval progression happens here; the
    /// delta is zero while time is frozen, which freezes every dwell
    /// without disturbing the driven outputs.
    pub fn tick(&self, ctx: Context) -> Result<(), Fault> {
        let state = self.state.get();
        let timing = *self
            .timing
            .get(&state)
            .ok_or_else(|| Fault::UntimedState {
                tag: self.tag(),
                state: state.name(),
            })?;
        let cfg = self.config_for(state);
        let t = self.timer.get() + ctx.delta();
        self.timer.set(t);

        match state {
            SignalState::Stop => {
                if self.latch && self.presence.get() && !self.demand.get() {
                    self.set_demand(true);
                    debug!(tag = %self.tag(), "latched");
                }
                let mut minimum = timing.minimum;
                if self.served_fya.get() {
                    minimum += timing.revert.unwrap_or(0.0);
                }
                if t >= minimum && self.active() {
                    if self.recall.get() && !self.demand.get() {
                        self.set_demand(true);
                        debug!(tag = %self.tag(), "recalled");
                    }
                    self.served_fya.set(false);
                    self.inactive.set();
                }
            }
            SignalState::Extend => {
                // Passage timing: presence restarts the gap; the interval
                // maximum bounds the whole extension.
                if self.presence.get() {
                    self.gap_timer.set(0.0);
                } else {
                    self.gap_timer.set(self.gap_timer.get() + ctx.delta());
                }
                let gapped_out = self.gap_timer.get() >= timing.minimum;
                let maxed_out = timing.maximum.is_some_and(|max| t >= max);
                if gapped_out || maxed_out {
                    self.change(None)?;
                }
            }
            SignalState::Fya => {
                self.fya_timer.set(self.fya_timer.get() + ctx.delta());
                if t >= timing.minimum {
                    let protected_due = self
                        .fya_service_delay
                        .is_some_and(|delay| self.fya_timer.get() >= delay)
                        && self.demand.get();
                    if !self.fya_hold.get() || protected_due {
                        self.change(None)?;
                    } else if let Some(max) = timing.maximum
                        && t >= max
                    {
                        self.change(None)?;
                    }
                }
            }
            _ => {
                if t >= timing.minimum {
                    let resting = cfg.rest && self.free.get();
                    if !resting {
                        match timing.maximum {
                            Some(max) => {
                                let trigger = if cfg.reduce { max - t } else { max };
                                if t >= trigger {
                                    self.change(None)?;
                                }
                            }
                            None => self.change(None)?,
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Serve this signal: consume its demand, leave STOP, and resolve
    /// once it has cleared back through its intervals to STOP.
    pub async fn serve(self: Rc<Self>) -> Result<(), Fault> {
        if self.active() {
            return Err(Fault::AlreadyActive { tag: self.tag() });
        }
        if !self.demand.get() {
            return Ok(());
        }
        debug!(tag = %self.tag(), "activated");
        self.set_demand(false);
        self.change(None)?;
        self.inactive.wait().await;
        debug!(tag = %self.tag(), "deactivated");
        Ok(())
    }

    /// Flashing-yellow-arrow overlay service: runs the head in FYA while
    /// its paired phase is in service. Demand is not consumed; a
    /// protected service is still owed if one is waiting.
    pub async fn serve_fya(self: Rc<Self>) -> Result<(), Fault> {
        if !self.fya_enabled.get() || self.active() {
            return Ok(());
        }
        debug!(tag = %self.tag(), "fya overlay");
        self.change(Some(SignalState::Fya))?;
        self.inactive.wait().await;
        debug!(tag = %self.tag(), "fya cleared");
        Ok(())
    }

    /// Force the head into load-switch flash. Used by the degraded path
    /// and operator flash; unmapped heads are reported, not paniced.
    pub fn enter_ls_flash(&self) -> Result<(), Fault> {
        self.set_free(true);
        self.change(Some(SignalState::LsFlash))?;
        self.inactive.set();
        Ok(())
    }
}

impl Identifiable for Signal {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Signal
    }
}
