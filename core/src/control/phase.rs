//! Phases: sets of signals that run together.

use std::cell::Cell;
use std::rc::Rc;

use tokio::task::JoinSet;
use tracing::debug;

use crate::control::field::FieldOutput;
use crate::control::signal::Signal;
use crate::core::id::{Identifiable, ObjectId, ObjectKind};
use crate::error::Fault;

/// A schedulable movement: one or more signals served concurrently.
/// The phase is in service from activation until every contained signal
/// has cleared back to STOP (modulo per-signal recycling).
pub struct Phase {
    id: ObjectId,
    signals: Vec<Rc<Signal>>,
    serving: Cell<bool>,
    /// Consumed by the cycler to avoid double-service across a mode
    /// transition.
    skip_once: Cell<bool>,
}

impl Phase {
    pub fn new(id: ObjectId, signals: Vec<Rc<Signal>>) -> Rc<Self> {
        Rc::new(Self {
            id,
            signals,
            serving: Cell::new(false),
            skip_once: Cell::new(false),
        })
    }

    pub fn signals(&self) -> &[Rc<Signal>] {
        &self.signals
    }

    /// OR over the contained signals' demand.
    pub fn demand(&self) -> bool {
        self.signals.iter().any(|s| s.demand())
    }

    pub fn set_demand(&self, value: bool) {
        for signal in &self.signals {
            signal.set_demand(value);
        }
    }

    /// The service window is open: the cycler owns this phase and must
    /// not reassign its ring.
    pub fn in_service(&self) -> bool {
        self.serving.get()
    }

    /// Any contained signal is off STOP. Stricter than `in_service`: it
    /// also covers FYA overlay time and clearance intervals, during which
    /// the phase must not be selected.
    pub fn signals_active(&self) -> bool {
        self.signals.iter().any(|s| s.active())
    }

    /// Eligible for selection: demanded and fully quiescent.
    pub fn waiting(&self) -> bool {
        self.demand() && !self.serving.get() && !self.signals_active()
    }

    pub fn set_free(&self, value: bool) {
        for signal in &self.signals {
            signal.set_free(value);
        }
    }

    pub fn skip_once(&self) -> &Cell<bool> {
        &self.skip_once
    }

    /// Open the service window before the service task first runs, so the
    /// ring reads as busy from the moment of selection.
    pub fn mark_committed(&self) {
        self.serving.set(true);
    }

    /// Field outputs of every contained signal, ascending, deduplicated.
    pub fn field_outputs(&self) -> Vec<Rc<FieldOutput>> {
        let mut outputs: Vec<Rc<FieldOutput>> = Vec::new();
        for signal in &self.signals {
            for output in signal.field_outputs() {
                if !outputs.iter().any(|o| o.id() == output.id()) {
                    outputs.push(output);
                }
            }
        }
        outputs.sort_by_key(|o| o.id());
        outputs
    }

    /// Serve the phase: start every demanded signal concurrently and
    /// resolve when all of them have returned to STOP.
    ///
    /// While at least one signal is still timing, a signal that has
    /// already cleared is re-served immediately if it is configured
    /// `recycle`, currently `free`, and its demand has been re-asserted
    /// (latched or recalled). This is what lets a pedestrian head recycle
    /// while the concurrent vehicle green is still resting.
    pub async fn serve(self: Rc<Self>) -> Result<(), Fault> {
        if self.signals_active() {
            self.serving.set(false);
            return Err(Fault::AlreadyActive { tag: self.tag() });
        }
        self.serving.set(true);
        if !self.demand() {
            // Demand was withdrawn between selection and start.
            self.serving.set(false);
            return Ok(());
        }
        debug!(tag = %self.tag(), "activated");

        let mut window = JoinSet::new();
        for signal in &self.signals {
            if signal.demand() {
                window.spawn_local(signal.clone().serve());
            }
        }
        let result = self.run_window(&mut window).await;

        self.serving.set(false);
        debug!(tag = %self.tag(), "deactivated");
        result
    }

    async fn run_window(&self, window: &mut JoinSet<Result<(), Fault>>) -> Result<(), Fault> {
        while let Some(joined) = window.join_next().await {
            if let Ok(result) = joined {
                result?;
            }
            if window.is_empty() {
                break;
            }
            for signal in &self.signals {
                if signal.recycle() && signal.free() && !signal.active() && signal.demand() {
                    debug!(tag = %signal.tag(), "recycling");
                    window.spawn_local(signal.clone().serve());
                }
            }
        }
        Ok(())
    }
}

impl Identifiable for Phase {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Phase
    }
}
