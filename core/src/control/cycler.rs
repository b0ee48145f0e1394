//! The ring-and-barrier phase cycler.
//!
//! The cycler owns the scheduling decision: which phases run now, and
//! when control crosses to the next barrier. It never mutates signal
//! state directly; it drives phases by spawning their service tasks and
//! observes completion.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::control::phase::Phase;
use crate::control::ring::{Barrier, Ring};
use crate::control::signal::Signal;
use crate::core::context::Context;
use crate::core::event::Event;
use crate::core::id::{Identifiable, ObjectId};
use crate::error::Fault;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    /// No new service is initiated; in-flight phases complete naturally.
    Pause,
    /// Degenerate single-ring operation over the global phase order.
    Sequential,
    /// Dual-ring barrier-synchronised operation; the primary mode.
    Concurrent,
}

/// A flashing-yellow-arrow overlay pairing: the signal runs FYA while its
/// paired phase is in service.
pub struct FyaPair {
    pub signal: Rc<Signal>,
    pub phase: ObjectId,
}

pub struct PhaseCycler {
    rings: Vec<Rc<Ring>>,
    barriers: Vec<Rc<Barrier>>,
    fya_pairs: Vec<FyaPair>,
    fya_enabled: Cell<bool>,

    mode: Cell<CycleMode>,
    /// Phases already served in the current cycle.
    cycle_phases: RefCell<Vec<ObjectId>>,
    /// Recently occupied barriers, bounded to the barrier count.
    barrier_history: RefCell<VecDeque<ObjectId>>,
    current_barrier: Cell<Option<usize>>,
    cycle_count: Cell<u64>,
    last_phase: RefCell<Option<Rc<Phase>>>,
    /// Sequential-mode round-robin cursor over the global phase order.
    seq_cursor: Cell<usize>,

    tick_notify: Notify,
    shutdown: Rc<Event>,
}

impl PhaseCycler {
    pub fn new(
        rings: Vec<Rc<Ring>>,
        barriers: Vec<Rc<Barrier>>,
        fya_pairs: Vec<FyaPair>,
        shutdown: Rc<Event>,
    ) -> Rc<Self> {
        Rc::new(Self {
            rings,
            barriers,
            fya_pairs,
            fya_enabled: Cell::new(true),
            mode: Cell::new(CycleMode::Pause),
            cycle_phases: RefCell::new(Vec::new()),
            barrier_history: RefCell::new(VecDeque::new()),
            current_barrier: Cell::new(None),
            cycle_count: Cell::new(0),
            last_phase: RefCell::new(None),
            seq_cursor: Cell::new(0),
            tick_notify: Notify::new(),
            shutdown,
        })
    }

    pub fn mode(&self) -> CycleMode {
        self.mode.get()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count.get()
    }

    pub fn fya_enabled(&self) -> bool {
        self.fya_enabled.get()
    }

    pub fn set_fya_enabled(&self, value: bool) {
        self.fya_enabled.set(value);
    }

    /// The global phase order: ring order, rings concatenated.
    pub fn phases(&self) -> Vec<Rc<Phase>> {
        self.rings
            .iter()
            .flat_map(|r| r.phases().iter().cloned())
            .collect()
    }

    pub fn active_phases(&self) -> Vec<Rc<Phase>> {
        self.phases().into_iter().filter(|p| p.in_service()).collect()
    }

    pub fn waiting_phases(&self) -> Vec<Rc<Phase>> {
        self.phases().into_iter().filter(|p| p.waiting()).collect()
    }

    pub fn active_barrier(&self) -> Option<Rc<Barrier>> {
        self.current_barrier.get().map(|i| self.barriers[i].clone())
    }

    pub fn barrier_history(&self) -> Vec<ObjectId> {
        self.barrier_history.borrow().iter().copied().collect()
    }

    /// Time-clock bookkeeping: recompute rest privileges and FYA holds,
    /// then wake the selection loop. Runs after all signals have ticked,
    /// so selection never acts on stale activity.
    pub fn tick(&self, _ctx: Context) {
        let free = self.waiting_phases().is_empty();
        for phase in self.phases() {
            if phase.in_service() {
                phase.set_free(free);
            }
        }
        let fya_master = self.fya_enabled.get();
        for pair in &self.fya_pairs {
            let hold = fya_master
                && pair.signal.fya_enabled()
                && self
                    .phase_by_id(pair.phase)
                    .is_some_and(|p| p.in_service());
            pair.signal.set_fya_hold(hold);
        }
        self.tick_notify.notify_waiters();
    }

    fn phase_by_id(&self, id: ObjectId) -> Option<Rc<Phase>> {
        self.phases().into_iter().find(|p| p.id() == id)
    }

    /// Change the cycle mode. In-flight service is never interrupted; the
    /// transition only adjusts where selection resumes.
    pub fn set_mode(&self, mode: CycleMode) {
        let previous = self.mode.get();
        if mode == previous {
            return;
        }
        match mode {
            CycleMode::Sequential => {
                let phases = self.phases();
                let cursor = self
                    .last_phase
                    .borrow()
                    .as_ref()
                    .and_then(|last| phases.iter().position(|p| p.id() == last.id()))
                    .unwrap_or(0);
                self.seq_cursor.set(cursor);
            }
            CycleMode::Concurrent => {
                // Resume one barrier past the last served phase's home
                // barrier, and do not serve that phase again this cycle.
                if let Some(last) = self.last_phase.borrow().as_ref()
                    && let Some(home) = self
                        .barriers
                        .iter()
                        .position(|b| b.contains(last.id()))
                {
                    self.current_barrier
                        .set(Some((home + 1) % self.barriers.len()));
                    last.skip_once().set(true);
                }
            }
            CycleMode::Pause => {}
        }
        self.mode.set(mode);
        info!(from = ?previous, to = ?mode, "cycle mode changed");
        self.tick_notify.notify_waiters();
    }

    async fn wait_tick(&self) {
        tokio::select! {
            _ = self.shutdown.wait() => {}
            _ = self.tick_notify.notified() => {}
        }
    }

    /// Advance the barrier round-robin. A wrap back to the first barrier
    /// completes the cycle: the cycle count increments and the served-set
    /// clears.
    fn advance_barrier(&self) {
        let count = self.barriers.len();
        let next = match self.current_barrier.get() {
            None => 0,
            Some(current) => {
                let next = (current + 1) % count;
                if next == 0 {
                    let cycle = self.cycle_count.get() + 1;
                    self.cycle_count.set(cycle);
                    self.cycle_phases.borrow_mut().clear();
                    debug!(cycle, "cycle complete");
                }
                next
            }
        };
        self.current_barrier.set(Some(next));
        let barrier = &self.barriers[next];
        let mut history = self.barrier_history.borrow_mut();
        if history.len() == count {
            history.pop_front();
        }
        history.push_back(barrier.id());
        debug!(tag = %barrier.tag(), "barrier active");
    }

    /// One phase per idle ring: the first phase in ring order that is in
    /// the current barrier, not yet served this cycle, and demanding.
    /// First in ring order wins; there is no look-ahead.
    fn select_phases(&self) -> Vec<Rc<Phase>> {
        if self.mode.get() != CycleMode::Concurrent || self.shutdown.is_set() {
            return Vec::new();
        }
        let Some(index) = self.current_barrier.get() else {
            return Vec::new();
        };
        let barrier = &self.barriers[index];
        let mut selected = Vec::new();
        let served = self.cycle_phases.borrow();
        for ring in &self.rings {
            if ring.busy() {
                continue;
            }
            for phase in ring.in_barrier(barrier) {
                if served.contains(&phase.id()) {
                    continue;
                }
                if phase.waiting() {
                    if phase.skip_once().replace(false) {
                        continue;
                    }
                    selected.push(phase);
                    break;
                }
            }
        }
        selected
    }

    /// Commit a phase for service: record it, spawn its task, and spawn
    /// FYA overlays for any head paired to it.
    fn commit(&self, window: &mut JoinSet<Result<(), Fault>>, phase: Rc<Phase>) {
        phase.mark_committed();
        self.cycle_phases.borrow_mut().push(phase.id());
        *self.last_phase.borrow_mut() = Some(phase.clone());
        if self.fya_enabled.get() {
            for pair in &self.fya_pairs {
                if pair.phase == phase.id()
                    && pair.signal.fya_enabled()
                    && !pair.signal.active()
                {
                    pair.signal.set_fya_hold(true);
                    window.spawn_local(pair.signal.clone().serve_fya());
                }
            }
        }
        window.spawn_local(phase.serve());
    }

    /// One barrier occupancy in CONCURRENT mode: select, serve, re-select
    /// while tasks are outstanding, then either continue in this barrier
    /// or cross to the next.
    async fn run_concurrent(&self) -> Result<(), Fault> {
        if self.current_barrier.get().is_none() {
            self.advance_barrier();
        }
        let selected = self.select_phases();
        if selected.is_empty() {
            // Nothing serviceable this tick; re-check once, then cross.
            self.wait_tick().await;
            if self.shutdown.is_set() || self.mode.get() != CycleMode::Concurrent {
                return Ok(());
            }
            if self.select_phases().is_empty() {
                self.advance_barrier();
            }
            return Ok(());
        }

        let mut window = JoinSet::new();
        for phase in selected {
            self.commit(&mut window, phase);
        }
        while !window.is_empty() {
            tokio::select! {
                joined = window.join_next() => {
                    if let Some(Ok(result)) = joined {
                        result?;
                    }
                }
                _ = self.tick_notify.notified() => {}
                _ = self.shutdown.wait() => {
                    window.abort_all();
                    return Ok(());
                }
            }
            // Demand may have arrived that fits this barrier and an idle
            // ring; fold it into the open window.
            for phase in self.select_phases() {
                self.commit(&mut window, phase);
            }
        }
        Ok(())
    }

    /// One full scan of the global phase order in SEQUENTIAL mode.
    async fn run_sequential(&self) -> Result<(), Fault> {
        let phases = self.phases();
        while !phases.iter().any(|p| p.waiting()) {
            self.wait_tick().await;
            if self.shutdown.is_set() || self.mode.get() != CycleMode::Sequential {
                return Ok(());
            }
        }
        for _ in 0..phases.len() {
            if self.shutdown.is_set() || self.mode.get() != CycleMode::Sequential {
                return Ok(());
            }
            let cursor = self.seq_cursor.get();
            self.seq_cursor.set((cursor + 1) % phases.len());
            let phase = phases[cursor % phases.len()].clone();
            if self.cycle_phases.borrow().contains(&phase.id()) || !phase.waiting() {
                continue;
            }
            if phase.skip_once().replace(false) {
                continue;
            }
            self.cycle_phases.borrow_mut().push(phase.id());
            *self.last_phase.borrow_mut() = Some(phase.clone());
            phase.serve().await?;
        }
        let cycle = self.cycle_count.get() + 1;
        self.cycle_count.set(cycle);
        self.cycle_phases.borrow_mut().clear();
        debug!(cycle, "cycle complete");
        Ok(())
    }

    /// The scheduler task. Returns `Ok` on shutdown; a `Fault` from any
    /// service task propagates out so the controller can degrade.
    pub async fn run(self: Rc<Self>) -> Result<(), Fault> {
        loop {
            if self.shutdown.is_set() {
                return Ok(());
            }
            match self.mode.get() {
                CycleMode::Pause => self.wait_tick().await,
                CycleMode::Sequential => self.run_sequential().await?,
                CycleMode::Concurrent => self.run_concurrent().await?,
            }
        }
    }
}
