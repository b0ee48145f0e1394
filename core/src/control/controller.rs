//! The controller root.
//!
//! Owns every entity collection, the clock bus, the cycler and the bus
//! service; resolves all cross-references at build time; dispatches clock
//! ticks; and runs the operation-mode sequence (entrance transition,
//! normal cycling, load-switch flash degradation).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::control::calls::{CallList, CallSource};
use crate::control::cycler::{CycleMode, FyaPair, PhaseCycler};
use crate::control::definition::IntersectionDef;
use crate::control::field::FieldOutput;
use crate::control::inputs::{Input, InputAction, InputManager};
use crate::control::phase::Phase;
use crate::control::ring::{Barrier, Ring};
use crate::control::signal::{Signal, SignalSettings, SignalState, SignalType};
use crate::control::simulation::IntersectionSimulator;
use crate::core::clock::{
    ClockRates, ClockSet, FIELDBUS_CLOCK, FLASH_CLOCK, INPUTS_CLOCK, NETWORK_CLOCK, TIME_CLOCK,
    Tickable,
};
use crate::core::context::{Context, TimeState};
use crate::core::event::Event;
use crate::core::id::{self, IdRegistry, Identifiable, ObjectId, ObjectKind};
use crate::error::{ConfigError, Fault};
use crate::fieldbus::FieldBus;
use crate::fieldbus::frames::{DeviceAddress, FrameType, OutputStateFrame};
use crate::rpc;
use crate::rpc::StreamSelector;

/// Coarse controller mode, distinct from the cycler's scheduling mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationMode {
    /// Powered but dark; before the entrance transition begins.
    Dark,
    /// Control entrance transition: vehicle heads hold CAUTION before the
    /// first cycle.
    Cet,
    /// Normal actuated cycling.
    Normal,
    /// Degraded: all vehicle heads flashing, no scheduling.
    LsFlash,
}

pub struct ControllerOptions {
    pub rates: ClockRates,
    pub tick_scale: f64,
    /// Entrance-transition dwell; floored at 3 s, zero skips it.
    pub cet_time: f64,
    pub cycle_mode: CycleMode,
    pub transfer_relay: bool,
    pub fya_enabled: bool,
    pub init_demand: bool,
    pub presence_simulation: bool,
    pub simulation_seed: Option<u64>,
    pub shutdown_timeout: f64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            rates: ClockRates::default(),
            tick_scale: 1.0,
            cet_time: 4.0,
            cycle_mode: CycleMode::Concurrent,
            transfer_relay: true,
            fya_enabled: true,
            init_demand: false,
            presence_simulation: false,
            simulation_seed: None,
            shutdown_timeout: 10.0,
        }
    }
}

pub struct Controller {
    name: String,
    options: ControllerOptions,
    time_state: Rc<TimeState>,
    clocks: ClockSet,

    field_outputs: Vec<Rc<FieldOutput>>,
    signals: Vec<Rc<Signal>>,
    phases: Vec<Rc<Phase>>,
    #[allow(dead_code)]
    rings: Vec<Rc<Ring>>,
    #[allow(dead_code)]
    barriers: Vec<Rc<Barrier>>,
    cycler: Rc<PhaseCycler>,
    calls: CallList,
    inputs: InputManager,
    bus: Option<FieldBus>,
    simulator: RefCell<IntersectionSimulator>,

    op_mode: Cell<OperationMode>,
    cet_timer: Cell<f64>,
    transfer: Cell<bool>,
    presence_simulation: Cell<bool>,
    fault: RefCell<Option<Fault>>,

    started_at_epoch: u64,
    started_at: Instant,
    snapshot_seq: Cell<u64>,
    snapshot_dirty: Cell<bool>,
    snapshot_tx: watch::Sender<rpc::StateSnapshot>,

    shutdown: Rc<Event>,
}

impl Controller {
    pub fn build(
        def: IntersectionDef,
        options: ControllerOptions,
        bus: Option<FieldBus>,
    ) -> Result<Rc<Self>, ConfigError> {
        let mut registry = IdRegistry::new();
        let time_state = Rc::new(TimeState::new(options.tick_scale));
        let clocks = ClockSet::new(&mut registry, time_state.clone(), options.rates)?;

        let mut output_map: HashMap<ObjectId, Rc<FieldOutput>> = HashMap::new();
        let mut field_outputs = Vec::with_capacity(def.field_outputs.len());
        for id in &def.field_outputs {
            registry.claim(ObjectKind::FieldOutput, *id)?;
            let output = Rc::new(FieldOutput::new(*id));
            output_map.insert(*id, output.clone());
            field_outputs.push(output);
        }
        field_outputs.sort_by_key(|o| o.id());

        let mut signal_map: HashMap<ObjectId, Rc<Signal>> = HashMap::new();
        let mut signals = Vec::with_capacity(def.signals.len());
        for sig in def.signals {
            registry.claim(ObjectKind::Signal, sig.id)?;
            let mut mapping = HashMap::new();
            for (state, output_id) in &sig.mapping {
                let output =
                    output_map
                        .get(output_id)
                        .ok_or_else(|| ConfigError::UnresolvedRef {
                            tag: id::tag(ObjectKind::Signal, sig.id),
                            kind: ObjectKind::FieldOutput,
                            id: *output_id,
                        })?;
                mapping.insert(*state, output.clone());
            }
            let signal = Signal::new(
                sig.id,
                sig.timing,
                sig.config,
                mapping,
                SignalSettings {
                    signal_type: sig.signal_type,
                    movement: sig.movement,
                    flash_channel: sig.flash_channel,
                    initial_state: sig.initial_state,
                    recall: sig.recall,
                    recycle: sig.recycle,
                    latch: sig.latch,
                    fya_enabled: sig.fya_enabled,
                    fya_service_delay: sig.fya_service_delay,
                    fya_phase: sig.fya_phase,
                },
            )?;
            signal_map.insert(sig.id, signal.clone());
            signals.push(signal);
        }

        let mut phase_map: HashMap<ObjectId, Rc<Phase>> = HashMap::new();
        let mut phases = Vec::with_capacity(def.phases.len());
        for ph in &def.phases {
            registry.claim(ObjectKind::Phase, ph.id)?;
            let mut members = Vec::with_capacity(ph.signals.len());
            for signal_id in &ph.signals {
                let signal =
                    signal_map
                        .get(signal_id)
                        .ok_or_else(|| ConfigError::UnresolvedRef {
                            tag: id::tag(ObjectKind::Phase, ph.id),
                            kind: ObjectKind::Signal,
                            id: *signal_id,
                        })?;
                members.push(signal.clone());
            }
            let phase = Phase::new(ph.id, members);
            phase_map.insert(ph.id, phase.clone());
            phases.push(phase);
        }

        let resolve_phases = |tag: String, ids: &[ObjectId]| -> Result<Vec<Rc<Phase>>, ConfigError> {
            ids.iter()
                .map(|phase_id| {
                    phase_map
                        .get(phase_id)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnresolvedRef {
                            tag: tag.clone(),
                            kind: ObjectKind::Phase,
                            id: *phase_id,
                        })
                })
                .collect()
        };

        let mut rings = Vec::with_capacity(def.rings.len());
        for ring in &def.rings {
            registry.claim(ObjectKind::Ring, ring.id)?;
            rings.push(Ring::new(
                ring.id,
                resolve_phases(id::tag(ObjectKind::Ring, ring.id), &ring.phases)?,
            ));
        }
        let mut barriers = Vec::with_capacity(def.barriers.len());
        for barrier in &def.barriers {
            registry.claim(ObjectKind::Barrier, barrier.id)?;
            barriers.push(Barrier::new(
                barrier.id,
                resolve_phases(id::tag(ObjectKind::Barrier, barrier.id), &barrier.phases)?,
            ));
        }

        let mut fya_pairs = Vec::new();
        for signal in &signals {
            if let Some(paired) = signal.fya_phase() {
                if !phase_map.contains_key(&paired) {
                    return Err(ConfigError::UnresolvedRef {
                        tag: signal.tag(),
                        kind: ObjectKind::Phase,
                        id: paired,
                    });
                }
                fya_pairs.push(FyaPair {
                    signal: signal.clone(),
                    phase: paired,
                });
            }
        }

        let mut inputs = Vec::with_capacity(def.inputs.len());
        for input in def.inputs {
            for target in &input.targets {
                if !phase_map.contains_key(target) {
                    return Err(ConfigError::UnresolvedRef {
                        tag: format!("input slot {}", input.slot),
                        kind: ObjectKind::Phase,
                        id: *target,
                    });
                }
            }
            inputs.push(Input::new(
                input.slot,
                input.activation,
                input.action,
                input.targets,
            ));
        }

        let shutdown = Rc::new(Event::new());
        let cycler = PhaseCycler::new(rings.clone(), barriers.clone(), fya_pairs, shutdown.clone());
        cycler.set_fya_enabled(options.fya_enabled);

        if options.init_demand {
            for phase in &phases {
                phase.set_demand(true);
            }
        }

        let simulator = RefCell::new(IntersectionSimulator::new(
            &signals,
            options.simulation_seed,
        ));
        let (snapshot_tx, _) = watch::channel(rpc::StateSnapshot::default());

        let presence_simulation = Cell::new(options.presence_simulation);
        let transfer = Cell::new(options.transfer_relay);
        let controller = Rc::new(Self {
            name: def.name,
            options,
            time_state,
            clocks,
            field_outputs,
            signals,
            phases,
            rings,
            barriers,
            cycler,
            calls: CallList::new(),
            inputs: InputManager::new(inputs),
            bus,
            simulator,
            op_mode: Cell::new(OperationMode::Dark),
            cet_timer: Cell::new(0.0),
            transfer,
            presence_simulation,
            fault: RefCell::new(None),
            started_at_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            started_at: Instant::now(),
            snapshot_seq: Cell::new(0),
            snapshot_dirty: Cell::new(false),
            snapshot_tx,
            shutdown,
        });

        for clock in controller.clocks.all() {
            clock.subscribe(controller.clone());
        }
        Ok(controller)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op_mode(&self) -> OperationMode {
        self.op_mode.get()
    }

    pub fn cycler(&self) -> &PhaseCycler {
        &self.cycler
    }

    pub fn clocks(&self) -> &ClockSet {
        &self.clocks
    }

    pub fn calls(&self) -> &CallList {
        &self.calls
    }

    pub fn bus(&self) -> Option<&FieldBus> {
        self.bus.as_ref()
    }

    pub fn field_outputs(&self) -> &[Rc<FieldOutput>] {
        &self.field_outputs
    }

    pub fn signals(&self) -> &[Rc<Signal>] {
        &self.signals
    }

    pub fn phases(&self) -> &[Rc<Phase>] {
        &self.phases
    }

    pub fn signal(&self, id: ObjectId) -> Option<&Rc<Signal>> {
        self.signals.iter().find(|s| s.id() == id)
    }

    pub fn phase(&self, id: ObjectId) -> Option<&Rc<Phase>> {
        self.phases.iter().find(|p| p.id() == id)
    }

    pub fn time_freeze(&self) -> bool {
        self.time_state.freeze.get()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault.borrow().clone()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_set()
    }

    pub fn shutdown(&self) {
        if !self.shutdown.is_set() {
            info!("shutdown requested");
            self.shutdown.set();
        }
    }

    /// Handle to wait for or trigger shutdown from collaborators (RPC
    /// server, signal handlers).
    pub fn shutdown_event(&self) -> Rc<Event> {
        self.shutdown.clone()
    }

    // ------------------------------------------------------------------
    // Operation modes
    // ------------------------------------------------------------------

    fn begin_entrance(&self) {
        if self.options.cet_time <= 0.0 {
            self.enter_normal();
            return;
        }
        self.op_mode.set(OperationMode::Cet);
        self.cet_timer.set(0.0);
        info!(seconds = self.cet_seconds(), "entrance transition started");
        for signal in &self.signals {
            if signal.signal_type() == SignalType::Vehicle
                && let Err(e) = signal.change(Some(SignalState::Caution))
            {
                error!(error = %e, "entrance transition skip");
            }
        }
    }

    /// Configured entrance dwell, floored at the mandated 3 s.
    fn cet_seconds(&self) -> f64 {
        self.options.cet_time.max(3.0)
    }

    fn enter_normal(&self) {
        for signal in &self.signals {
            if let Err(e) = signal.change(Some(SignalState::Stop)) {
                error!(error = %e, "stop entry skip");
            }
        }
        // Prime recalled movements so minor streets are not starved from
        // a cold start.
        for signal in &self.signals {
            if signal.recall() {
                signal.set_demand(true);
                self.place_system_call(signal);
            }
        }
        self.op_mode.set(OperationMode::Normal);
        self.cycler.set_mode(self.options.cycle_mode);
        info!("normal control started");
    }

    fn place_system_call(&self, signal: &Rc<Signal>) {
        if let Some(phase) = self
            .phases
            .iter()
            .find(|p| p.signals().iter().any(|s| s.id() == signal.id()))
        {
            self.calls.place(phase.id(), CallSource::Recall);
        }
    }

    /// Degrade to load-switch flash after an invariant violation.
    pub fn degrade(&self, fault: &Fault) {
        if self.op_mode.get() == OperationMode::LsFlash {
            return;
        }
        error!(fault = %fault, "invariant violated, dropping to load-switch flash");
        *self.fault.borrow_mut() = Some(fault.clone());
        self.enter_ls_flash_mode();
    }

    /// Operator-commanded flash; also the terminal state of `degrade`.
    pub fn enter_ls_flash_mode(&self) {
        if self.op_mode.replace(OperationMode::LsFlash) == OperationMode::LsFlash {
            return;
        }
        self.cycler.set_mode(CycleMode::Pause);
        for signal in &self.signals {
            if signal.signal_type() == SignalType::Vehicle
                && let Err(e) = signal.enter_ls_flash()
            {
                error!(error = %e, "flash entry skip");
            }
        }
        self.snapshot_dirty.set(true);
        info!("load-switch flash active");
    }

    // ------------------------------------------------------------------
    // Clock handlers
    // ------------------------------------------------------------------

    fn on_time_tick(&self, ctx: Context) {
        match self.op_mode.get() {
            OperationMode::Dark => {}
            OperationMode::Cet => {
                let elapsed = self.cet_timer.get() + ctx.delta();
                self.cet_timer.set(elapsed);
                if elapsed >= self.cet_seconds() {
                    self.enter_normal();
                }
            }
            OperationMode::Normal => {
                for signal in &self.signals {
                    if let Err(fault) = signal.tick(ctx) {
                        self.degrade(&fault);
                        return;
                    }
                }
                self.calls.tick(ctx.delta());
                for phase in &self.phases {
                    if phase.in_service() {
                        self.calls.clear_for(phase.id());
                    }
                }
                self.cycler.tick(ctx);
                if self.presence_simulation.get() {
                    self.simulator.borrow_mut().tick(ctx);
                }
            }
            OperationMode::LsFlash => {
                for signal in &self.signals {
                    if let Err(fault) = signal.tick(ctx) {
                        error!(fault = %fault, "tick fault while degraded");
                    }
                }
            }
        }
        self.snapshot_seq.set(self.snapshot_seq.get() + 1);
        self.snapshot_dirty.set(true);
    }

    fn on_inputs_tick(&self) {
        if let Some(bus) = &self.bus {
            for frame in bus.poll() {
                if frame.frame_type == FrameType::Inputs {
                    self.inputs.submit_bitfield(frame.payload);
                }
            }
        }
        for event in self.inputs.poll() {
            match event.action {
                InputAction::Nothing => {}
                InputAction::Call => {
                    for target in &event.targets {
                        if let Some(phase) = self.phase(*target) {
                            self.calls.place(*target, CallSource::Fieldbus);
                            phase.set_demand(true);
                        }
                    }
                }
                InputAction::Detect => {
                    for target in &event.targets {
                        if let Some(phase) = self.phase(*target) {
                            for signal in phase.signals() {
                                signal.set_presence(event.level);
                            }
                        }
                    }
                }
                InputAction::TimeFreeze => {
                    info!(freeze = event.level, "time freeze input");
                    self.time_state.freeze.set(event.level);
                }
                InputAction::LsFlash => {
                    if event.level {
                        info!("flash commanded by input");
                        self.enter_ls_flash_mode();
                    }
                }
            }
        }
    }

    fn on_fieldbus_tick(&self) {
        let Some(bus) = &self.bus else { return };
        let states: Vec<bool> = self.field_outputs.iter().map(|o| o.scalar()).collect();
        let frame = OutputStateFrame::new(DeviceAddress::Tfib1, states, self.transfer.get());
        bus.enqueue(&frame.content());
        bus.transmit_pending();
    }

    fn on_network_tick(&self) {
        if self.snapshot_dirty.replace(false) {
            let snapshot = self.snapshot(StreamSelector::default());
            self.snapshot_tx.send_replace(snapshot);
        }
    }

    fn on_flash_tick(&self) {
        for output in &self.field_outputs {
            output.tick_flash();
        }
    }

    // ------------------------------------------------------------------
    // Runtime
    // ------------------------------------------------------------------

    /// Run the controller until shutdown. Spawns the clock and cycler
    /// tasks on the current local set; a fault from the cycler degrades
    /// the controller but keeps the flash heads alive until shutdown.
    pub async fn run(self: Rc<Self>) -> Result<(), Fault> {
        info!(intersection = %self.name, "control started");
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        for clock in self.clocks.all() {
            tasks.push(tokio::task::spawn_local(
                clock.run(self.shutdown.clone()),
            ));
        }
        let controller = self.clone();
        tasks.push(tokio::task::spawn_local(async move {
            if let Err(fault) = controller.cycler.clone().run().await {
                controller.degrade(&fault);
            }
        }));
        self.begin_entrance();

        self.shutdown.wait().await;

        let aborts: Vec<_> = tasks.iter().map(|t| t.abort_handle()).collect();
        let graceful = futures::future::join_all(tasks);
        let timeout = Duration::from_secs_f64(self.options.shutdown_timeout);
        if tokio::time::timeout(timeout, graceful).await.is_err() {
            error!(
                seconds = self.options.shutdown_timeout,
                "shutdown timeout exceeded, forcing exit"
            );
            for abort in aborts {
                abort.abort();
            }
        } else {
            debug!(
                seconds = self.shutdown.elapsed(),
                "shutdown complete"
            );
        }
        match self.fault.borrow().clone() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Observational surface
    // ------------------------------------------------------------------

    pub fn metadata(&self) -> rpc::ControllerMetadata {
        rpc::ControllerMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at_epoch: self.started_at_epoch,
            supports_time_freeze: true,
            supports_time_scaling: true,
            supports_coordination: false,
            supports_scheduling: false,
            supports_dimming: false,
            field_outputs: self
                .field_outputs
                .iter()
                .map(|o| rpc::FieldOutputMetadata { id: o.id() })
                .collect(),
            signals: self
                .signals
                .iter()
                .map(|s| rpc::SignalMetadata {
                    id: s.id(),
                    signal_type: s.signal_type(),
                    movement: s.movement(),
                    initial_state: s.initial_state(),
                    field_output_ids: s.field_outputs().iter().map(|o| o.id()).collect(),
                })
                .collect(),
        }
    }

    pub fn runtime_info(&self) -> rpc::RuntimeInfo {
        let run_seconds = self.started_at.elapsed().as_secs_f64();
        rpc::RuntimeInfo {
            run_seconds,
            control_seconds: run_seconds,
            time_freeze: self.time_state.freeze.get(),
            time_scale: self.time_state.scale.get(),
            active_phases: self
                .cycler
                .active_phases()
                .iter()
                .map(|p| p.id())
                .collect(),
            waiting_phases: self
                .cycler
                .waiting_phases()
                .iter()
                .map(|p| p.id())
                .collect(),
            cycle_mode: self.cycler.mode(),
            cycle_count: self.cycler.cycle_count(),
        }
    }

    pub fn field_output_infos(&self) -> Vec<rpc::FieldOutputInfo> {
        self.field_outputs
            .iter()
            .map(|o| rpc::FieldOutputInfo {
                id: o.id(),
                state: o.state(),
                value: o.scalar(),
            })
            .collect()
    }

    pub fn signal_infos(&self) -> Vec<rpc::SignalInfo> {
        self.signals
            .iter()
            .map(|s| rpc::SignalInfo {
                id: s.id(),
                state: s.state(),
                timer: s.timer(),
                demand: s.demand(),
                presence: s.presence(),
            })
            .collect()
    }

    pub fn phase_infos(&self) -> Vec<rpc::PhaseInfo> {
        self.phases
            .iter()
            .map(|p| rpc::PhaseInfo {
                id: p.id(),
                in_service: p.in_service(),
                demand: p.demand(),
                signal_ids: p.signals().iter().map(|s| s.id()).collect(),
            })
            .collect()
    }

    pub fn snapshot(&self, selector: StreamSelector) -> rpc::StateSnapshot {
        rpc::StateSnapshot {
            seq: self.snapshot_seq.get(),
            runtime_info: selector.runtime_info.then(|| self.runtime_info()),
            field_outputs: selector.field_outputs.then(|| self.field_output_infos()),
            signals: selector.signals.then(|| self.signal_infos()),
        }
    }

    /// Subscribe to the state stream: one snapshot per controller time
    /// tick, delivered at the network clock's cadence.
    pub fn snapshot_stream(&self) -> watch::Receiver<rpc::StateSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn set_time_freeze(&self, value: bool) -> rpc::ChangeResult {
        let before = self.time_state.freeze.replace(value);
        if before != value {
            info!(freeze = value, "time freeze changed");
        }
        rpc::ChangeResult::ok(before != value)
    }

    pub fn set_time_scale(&self, value: f64) -> rpc::ChangeResult {
        if !(0.01..=1000.0).contains(&value) {
            return rpc::ChangeResult::failed();
        }
        let before = self.time_state.scale.replace(value);
        rpc::ChangeResult::ok(before != value)
    }

    pub fn set_cycle_mode(&self, mode: CycleMode) -> rpc::ChangeResult {
        if self.op_mode.get() == OperationMode::LsFlash {
            return rpc::ChangeResult::failed();
        }
        let before = self.cycler.mode();
        self.cycler.set_mode(mode);
        rpc::ChangeResult::ok(self.cycler.mode() != before)
    }

    pub fn set_presence_simulation(&self, value: bool) -> rpc::ChangeResult {
        let before = self.presence_simulation.replace(value);
        if before != value {
            info!(enabled = value, "presence simulation changed");
        }
        rpc::ChangeResult::ok(before != value)
    }

    pub fn set_fya_enabled(&self, value: bool) -> rpc::ChangeResult {
        let before = self.cycler.fya_enabled();
        self.cycler.set_fya_enabled(value);
        rpc::ChangeResult::ok(before != value)
    }

    pub fn set_signal_demand(&self, id: ObjectId, value: bool) -> rpc::ChangeResult {
        match self.signal(id) {
            Some(signal) => {
                let changed = signal.demand() != value;
                signal.set_demand(value);
                rpc::ChangeResult::ok(changed)
            }
            None => rpc::ChangeResult::failed(),
        }
    }

    pub fn set_signal_presence(&self, id: ObjectId, value: bool) -> rpc::ChangeResult {
        match self.signal(id) {
            Some(signal) => {
                let changed = signal.presence() != value;
                signal.set_presence(value);
                rpc::ChangeResult::ok(changed)
            }
            None => rpc::ChangeResult::failed(),
        }
    }

    pub fn set_phase_demand(&self, id: ObjectId, value: bool) -> rpc::ChangeResult {
        match self.phase(id) {
            Some(phase) => {
                let changed = phase.demand() != value;
                phase.set_demand(value);
                if value {
                    self.calls.place(id, CallSource::Network);
                } else {
                    self.calls.clear_for(id);
                }
                rpc::ChangeResult::ok(changed)
            }
            None => rpc::ChangeResult::failed(),
        }
    }

    /// Dispatch one protocol request. Streams are handled by the server
    /// through [`Controller::snapshot_stream`].
    pub fn dispatch(&self, request: &rpc::Request) -> rpc::Response {
        match request {
            rpc::Request::GetMetadata => rpc::Response::Metadata(self.metadata()),
            rpc::Request::GetRuntimeInfo => rpc::Response::RuntimeInfo(self.runtime_info()),
            rpc::Request::GetFieldOutputs => {
                rpc::Response::FieldOutputs(self.field_output_infos())
            }
            rpc::Request::GetSignals => rpc::Response::Signals(self.signal_infos()),
            rpc::Request::GetPhases => rpc::Response::Phases(self.phase_infos()),
            rpc::Request::SetTimeFreeze { value } => {
                rpc::Response::Change(self.set_time_freeze(*value))
            }
            rpc::Request::SetTimeScale { value } => {
                rpc::Response::Change(self.set_time_scale(*value))
            }
            rpc::Request::SetCycleMode { mode } => {
                rpc::Response::Change(self.set_cycle_mode(*mode))
            }
            rpc::Request::SetPresenceSimulation { value } => {
                rpc::Response::Change(self.set_presence_simulation(*value))
            }
            rpc::Request::SetFyaEnabled { value } => {
                rpc::Response::Change(self.set_fya_enabled(*value))
            }
            rpc::Request::SetSignalDemand { id, value } => {
                rpc::Response::Change(self.set_signal_demand(*id, *value))
            }
            rpc::Request::SetSignalPresence { id, value } => {
                rpc::Response::Change(self.set_signal_presence(*id, *value))
            }
            rpc::Request::SetPhaseDemand { id, value } => {
                rpc::Response::Change(self.set_phase_demand(*id, *value))
            }
            rpc::Request::GetStateStream { selector } => {
                rpc::Response::Snapshot(self.snapshot(*selector))
            }
        }
    }
}

impl Tickable for Controller {
    fn tick(&self, clock: ObjectId, ctx: Context) {
        match clock {
            TIME_CLOCK => self.on_time_tick(ctx),
            INPUTS_CLOCK => self.on_inputs_tick(),
            FIELDBUS_CLOCK => self.on_fieldbus_tick(),
            NETWORK_CLOCK => self.on_network_tick(),
            FLASH_CLOCK => self.on_flash_tick(),
            other => debug!(clock = other, "tick from unknown clock"),
        }
    }
}
