//! Standard NEMA dual-ring, eight-phase intersection.
//!
//! Two arterial throughs with protected/permissive left turns and
//! pedestrian crossings, two side-street throughs with crossings. Ring 1
//! carries phases 601-604, ring 2 phases 605-608; barrier 801 groups the
//! arterial movements, barrier 802 the side street. Field outputs are
//! red/yellow/green triples from 101 up, with dedicated flashing-arrow
//! channels for the four turn heads.

use std::collections::HashMap;

use atsc_core::control::inputs::{InputAction, InputActivation};
use atsc_core::prelude::*;

use crate::registry::IntersectionEntry;

inventory::submit! {
    IntersectionEntry::new(
        "nema8",
        "standard NEMA dual-ring eight-phase",
        definition,
    )
}

fn timing_vehicle_arterial() -> HashMap<SignalState, IntervalTiming> {
    HashMap::from([
        (SignalState::LsFlash, IntervalTiming::new(16.0)),
        (SignalState::Stop, IntervalTiming::new(1.0)),
        (SignalState::Caution, IntervalTiming::new(4.0)),
        (SignalState::Extend, IntervalTiming::with_maximum(5.0, 20.0)),
        (SignalState::Go, IntervalTiming::with_maximum(10.0, 55.0)),
    ])
}

fn timing_vehicle_side() -> HashMap<SignalState, IntervalTiming> {
    HashMap::from([
        (SignalState::LsFlash, IntervalTiming::new(16.0)),
        (SignalState::Stop, IntervalTiming::new(1.0)),
        (SignalState::Caution, IntervalTiming::new(4.0)),
        (SignalState::Extend, IntervalTiming::with_maximum(2.5, 10.0)),
        (SignalState::Go, IntervalTiming::with_maximum(5.0, 20.0)),
    ])
}

fn timing_vehicle_turn() -> HashMap<SignalState, IntervalTiming> {
    HashMap::from([
        (SignalState::LsFlash, IntervalTiming::new(16.0)),
        (SignalState::Stop, IntervalTiming::new(1.0).with_revert(2.0)),
        (SignalState::Caution, IntervalTiming::new(4.0)),
        (SignalState::Extend, IntervalTiming::with_maximum(2.5, 10.0)),
        (SignalState::Go, IntervalTiming::with_maximum(5.0, 15.0)),
        (SignalState::Fya, IntervalTiming::new(4.0)),
    ])
}

fn timing_ped_long() -> HashMap<SignalState, IntervalTiming> {
    HashMap::from([
        (SignalState::Stop, IntervalTiming::new(0.0)),
        (SignalState::Caution, IntervalTiming::new(14.0)),
        (SignalState::Go, IntervalTiming::with_maximum(5.0, 5.0)),
    ])
}

fn timing_ped_short() -> HashMap<SignalState, IntervalTiming> {
    HashMap::from([
        (SignalState::Stop, IntervalTiming::new(0.0)),
        (SignalState::Caution, IntervalTiming::new(10.0)),
        (SignalState::Go, IntervalTiming::with_maximum(5.0, 5.0)),
    ])
}

fn config_vehicle() -> HashMap<SignalState, IntervalConfig> {
    HashMap::from([
        (SignalState::LsFlash, IntervalConfig::flashing_resting()),
        (SignalState::Stop, IntervalConfig::resting()),
        // Greens rest until crossing demand appears, then gap-reduce
        // toward expiry instead of holding to the full maximum.
        (
            SignalState::Go,
            IntervalConfig {
                flashing: false,
                rest: true,
                reduce: true,
            },
        ),
        (SignalState::Fya, IntervalConfig::flashing_resting()),
    ])
}

fn config_ped() -> HashMap<SignalState, IntervalConfig> {
    HashMap::from([
        (SignalState::Stop, IntervalConfig::resting()),
        (SignalState::Caution, IntervalConfig::flashing()),
    ])
}

/// Red/yellow/green triple from `base`, with LS_FLASH on the channel the
/// head flashes and an optional protected-turn arrow output.
fn vehicle_mapping(
    base: ObjectId,
    flash: FlashChannel,
    fya_output: Option<ObjectId>,
) -> HashMap<SignalState, ObjectId> {
    let mut mapping = HashMap::from([
        (
            SignalState::LsFlash,
            match flash {
                FlashChannel::Red => base,
                FlashChannel::Yellow => base + 1,
            },
        ),
        (SignalState::Stop, base),
        (SignalState::Caution, base + 1),
        (SignalState::Extend, base + 2),
        (SignalState::Go, base + 2),
    ]);
    if let Some(arrow) = fya_output {
        mapping.insert(SignalState::Fya, arrow);
    }
    mapping
}

/// Don't-walk / walk pair; pedestrian clearance flashes the don't-walk.
fn ped_mapping(dont_walk: ObjectId) -> HashMap<SignalState, ObjectId> {
    HashMap::from([
        (SignalState::Stop, dont_walk),
        (SignalState::Caution, dont_walk),
        (SignalState::Go, dont_walk + 2),
    ])
}

fn turn_signal(id: ObjectId, base: ObjectId, arrow: ObjectId, fya_phase: ObjectId) -> SignalDef {
    SignalDef {
        movement: TrafficMovement::ProtectedTurn,
        fya_enabled: true,
        fya_service_delay: Some(30.0),
        fya_phase: Some(fya_phase),
        ..SignalDef::new(
            id,
            timing_vehicle_turn(),
            config_vehicle(),
            vehicle_mapping(base, FlashChannel::Red, Some(arrow)),
        )
    }
}

fn through_signal(id: ObjectId, base: ObjectId, arterial: bool) -> SignalDef {
    let (timing, flash) = if arterial {
        (timing_vehicle_arterial(), FlashChannel::Yellow)
    } else {
        (timing_vehicle_side(), FlashChannel::Red)
    };
    SignalDef {
        movement: TrafficMovement::PermissiveTurn,
        flash_channel: flash,
        recall: arterial,
        ..SignalDef::new(id, timing, config_vehicle(), vehicle_mapping(base, flash, None))
    }
}

fn ped_signal(id: ObjectId, dont_walk: ObjectId, long_clearance: bool, recycle: bool) -> SignalDef {
    let timing = if long_clearance {
        timing_ped_long()
    } else {
        timing_ped_short()
    };
    SignalDef {
        signal_type: SignalType::Pedestrian,
        movement: TrafficMovement::Crosswalk,
        recycle,
        latch: true,
        ..SignalDef::new(id, timing, config_ped(), ped_mapping(dont_walk))
    }
}

pub fn definition() -> IntersectionDef {
    let field_outputs: Vec<ObjectId> = (101..=196).collect();

    let signals = vec![
        turn_signal(501, 101, 126, 602),
        through_signal(502, 104, true),
        turn_signal(503, 107, 129, 604),
        through_signal(504, 110, false),
        turn_signal(505, 113, 132, 606),
        through_signal(506, 116, true),
        turn_signal(507, 119, 135, 608),
        through_signal(508, 122, false),
        ped_signal(509, 125, true, true),
        ped_signal(510, 128, false, false),
        ped_signal(511, 131, true, true),
        ped_signal(512, 134, false, false),
    ];

    let phases = vec![
        PhaseDef { id: 601, signals: vec![501] },
        PhaseDef { id: 602, signals: vec![502, 509] },
        PhaseDef { id: 603, signals: vec![503] },
        PhaseDef { id: 604, signals: vec![504, 510] },
        PhaseDef { id: 605, signals: vec![505] },
        PhaseDef { id: 606, signals: vec![506, 511] },
        PhaseDef { id: 607, signals: vec![507] },
        PhaseDef { id: 608, signals: vec![508, 512] },
    ];

    let rings = vec![
        RingDef { id: 701, phases: vec![601, 602, 603, 604] },
        RingDef { id: 702, phases: vec![605, 606, 607, 608] },
    ];
    let barriers = vec![
        BarrierDef { id: 801, phases: vec![601, 602, 605, 606] },
        BarrierDef { id: 802, phases: vec![603, 604, 607, 608] },
    ];

    // Bus slots 1-8 are per-phase detector calls; 9 follows the cabinet
    // time-freeze switch, 10 commands flash.
    let mut inputs: Vec<InputDef> = (601..=608u16)
        .enumerate()
        .map(|(slot, phase)| InputDef {
            slot: slot + 1,
            activation: InputActivation::Rising,
            action: InputAction::Call,
            targets: vec![phase],
        })
        .collect();
    inputs.push(InputDef {
        slot: 9,
        activation: InputActivation::High,
        action: InputAction::TimeFreeze,
        targets: Vec::new(),
    });
    inputs.push(InputDef {
        slot: 10,
        activation: InputActivation::Rising,
        action: InputAction::LsFlash,
        targets: Vec::new(),
    });

    IntersectionDef {
        name: "nema8".to_string(),
        field_outputs,
        signals,
        phases,
        rings,
        barriers,
        inputs,
    }
}
