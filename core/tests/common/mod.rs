//! Shared fixtures: a minimal dual-ring eight-phase intersection with
//! deterministic (non-resting) interval timing, and helpers for building
//! the pieces directly.
#![allow(dead_code)]

use std::collections::HashMap;
use std::rc::Rc;

use atsc_core::control::cycler::PhaseCycler;
use atsc_core::control::field::FieldOutput;
use atsc_core::control::phase::Phase;
use atsc_core::control::ring::{Barrier, Ring};
use atsc_core::control::signal::{Signal, SignalSettings};
use atsc_core::core::event::Event;
use atsc_core::core::id::Identifiable;
use atsc_core::prelude::*;

/// Time-clock context at 1 Hz, unfrozen.
pub fn ctx() -> Context {
    Context {
        rate: 1.0,
        scale: 1.0,
        timing: true,
    }
}

/// Context with the time clock frozen.
pub fn frozen_ctx() -> Context {
    Context {
        timing: false,
        ..ctx()
    }
}

/// STOP 1s, CAUTION 2s, GO 3s, LS_FLASH 5s. GO neither rests nor has a
/// ceiling, so a full service is exactly 6 seconds of dwell.
pub fn vehicle_timing() -> HashMap<SignalState, IntervalTiming> {
    HashMap::from([
        (SignalState::LsFlash, IntervalTiming::new(5.0)),
        (SignalState::Stop, IntervalTiming::new(1.0)),
        (SignalState::Caution, IntervalTiming::new(2.0)),
        (SignalState::Go, IntervalTiming::new(3.0)),
    ])
}

pub fn vehicle_config() -> HashMap<SignalState, IntervalConfig> {
    HashMap::from([
        (SignalState::LsFlash, IntervalConfig::flashing_resting()),
        (SignalState::Stop, IntervalConfig::resting()),
    ])
}

pub fn vehicle_mapping(base: ObjectId) -> HashMap<SignalState, ObjectId> {
    HashMap::from([
        (SignalState::LsFlash, base),
        (SignalState::Stop, base),
        (SignalState::Caution, base + 1),
        (SignalState::Go, base + 2),
    ])
}

fn signal_def(id: ObjectId, base: ObjectId, timing: HashMap<SignalState, IntervalTiming>) -> SignalDef {
    SignalDef::new(id, timing, vehicle_config(), vehicle_mapping(base))
}

/// Dual-ring eight-phase test intersection: one vehicle signal per
/// phase, ring 2 greens one second shorter than ring 1.
pub fn dual_ring_def() -> IntersectionDef {
    let mut ring2_timing = vehicle_timing();
    ring2_timing.insert(SignalState::Go, IntervalTiming::new(2.0));

    let signals = (0..8u16)
        .map(|i| {
            let timing = if i < 4 {
                vehicle_timing()
            } else {
                ring2_timing.clone()
            };
            signal_def(501 + i, 101 + i * 3, timing)
        })
        .collect();
    let phases = (0..8u16)
        .map(|i| PhaseDef {
            id: 601 + i,
            signals: vec![501 + i],
        })
        .collect();
    IntersectionDef {
        name: "dual-ring-test".to_string(),
        field_outputs: (101..=124).collect(),
        signals,
        phases,
        rings: vec![
            RingDef {
                id: 701,
                phases: vec![601, 602, 603, 604],
            },
            RingDef {
                id: 702,
                phases: vec![605, 606, 607, 608],
            },
        ],
        barriers: vec![
            BarrierDef {
                id: 801,
                phases: vec![601, 602, 605, 606],
            },
            BarrierDef {
                id: 802,
                phases: vec![603, 604, 607, 608],
            },
        ],
        inputs: Vec::new(),
    }
}

/// Options tuned for deterministic tests: no entrance transition, 1 Hz
/// time clock, no simulation.
pub fn test_options() -> ControllerOptions {
    ControllerOptions {
        cet_time: 0.0,
        ..ControllerOptions::default()
    }
}

/// The dual-ring layout built directly from parts, for cycler tests that
/// drive ticks by hand.
pub struct Parts {
    pub signals: Vec<Rc<Signal>>,
    pub phases: Vec<Rc<Phase>>,
    pub cycler: Rc<PhaseCycler>,
    pub shutdown: Rc<Event>,
}

impl Parts {
    pub fn signal(&self, id: ObjectId) -> &Rc<Signal> {
        self.signals.iter().find(|s| s.id() == id).expect("signal")
    }

    pub fn phase(&self, id: ObjectId) -> &Rc<Phase> {
        self.phases.iter().find(|p| p.id() == id).expect("phase")
    }
}

pub fn dual_ring_parts() -> Parts {
    let mut ring2_timing = vehicle_timing();
    ring2_timing.insert(SignalState::Go, IntervalTiming::new(2.0));

    let signals: Vec<Rc<Signal>> = (0..8u16)
        .map(|i| {
            let timing = if i < 4 {
                vehicle_timing()
            } else {
                ring2_timing.clone()
            };
            standalone_signal_with(501 + i, 101 + i * 3, timing, SignalSettings::default())
        })
        .collect();
    let phases: Vec<Rc<Phase>> = (0..8usize)
        .map(|i| Phase::new(601 + i as ObjectId, vec![signals[i].clone()]))
        .collect();
    let rings = vec![
        Ring::new(701, phases[0..4].to_vec()),
        Ring::new(702, phases[4..8].to_vec()),
    ];
    let barriers = vec![
        Barrier::new(
            801,
            vec![
                phases[0].clone(),
                phases[1].clone(),
                phases[4].clone(),
                phases[5].clone(),
            ],
        ),
        Barrier::new(
            802,
            vec![
                phases[2].clone(),
                phases[3].clone(),
                phases[6].clone(),
                phases[7].clone(),
            ],
        ),
    ];
    let shutdown = Rc::new(Event::new());
    let cycler = PhaseCycler::new(rings, barriers, Vec::new(), shutdown.clone());
    Parts {
        signals,
        phases,
        cycler,
        shutdown,
    }
}

/// Build a standalone signal over fresh field outputs (base, base+1,
/// base+2), for direct state-machine tests.
pub fn standalone_signal(id: ObjectId, base: ObjectId) -> Rc<Signal> {
    standalone_signal_with(id, base, vehicle_timing(), SignalSettings::default())
}

pub fn standalone_signal_with(
    id: ObjectId,
    base: ObjectId,
    timing: HashMap<SignalState, IntervalTiming>,
    settings: SignalSettings,
) -> Rc<Signal> {
    let outputs: HashMap<ObjectId, Rc<FieldOutput>> = (base..base + 3)
        .map(|i| (i, Rc::new(FieldOutput::new(i))))
        .collect();
    let mapping = vehicle_mapping(base)
        .into_iter()
        .map(|(state, output_id)| (state, outputs[&output_id].clone()))
        .collect();
    Signal::new(id, timing, vehicle_config(), mapping, settings).expect("valid signal")
}
