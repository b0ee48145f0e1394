//! Intersection definitions: the data an intersection crate hands the
//! controller. Everything is identifiers; resolution and validation
//! happen when the controller is built.

use std::collections::HashMap;

use crate::control::inputs::{InputAction, InputActivation};
use crate::control::signal::{
    FlashChannel, IntervalConfig, IntervalTiming, SignalState, SignalType, TrafficMovement,
};
use crate::core::id::ObjectId;

pub struct SignalDef {
    pub id: ObjectId,
    pub signal_type: SignalType,
    pub movement: TrafficMovement,
    pub flash_channel: FlashChannel,
    pub initial_state: SignalState,
    pub timing: HashMap<SignalState, IntervalTiming>,
    pub config: HashMap<SignalState, IntervalConfig>,
    /// Interval state to field-output id.
    pub mapping: HashMap<SignalState, ObjectId>,
    pub recall: bool,
    pub recycle: bool,
    pub latch: bool,
    pub fya_enabled: bool,
    pub fya_service_delay: Option<f64>,
    /// Phase whose service grants this head its flashing arrow.
    pub fya_phase: Option<ObjectId>,
}

impl SignalDef {
    pub fn new(
        id: ObjectId,
        timing: HashMap<SignalState, IntervalTiming>,
        config: HashMap<SignalState, IntervalConfig>,
        mapping: HashMap<SignalState, ObjectId>,
    ) -> Self {
        Self {
            id,
            signal_type: SignalType::Vehicle,
            movement: TrafficMovement::Thru,
            flash_channel: FlashChannel::Red,
            initial_state: SignalState::Stop,
            timing,
            config,
            mapping,
            recall: false,
            recycle: false,
            latch: false,
            fya_enabled: false,
            fya_service_delay: None,
            fya_phase: None,
        }
    }
}

pub struct PhaseDef {
    pub id: ObjectId,
    pub signals: Vec<ObjectId>,
}

pub struct RingDef {
    pub id: ObjectId,
    pub phases: Vec<ObjectId>,
}

pub struct BarrierDef {
    pub id: ObjectId,
    pub phases: Vec<ObjectId>,
}

pub struct InputDef {
    pub slot: usize,
    pub activation: InputActivation,
    pub action: InputAction,
    pub targets: Vec<ObjectId>,
}

pub struct IntersectionDef {
    pub name: String,
    pub field_outputs: Vec<ObjectId>,
    pub signals: Vec<SignalDef>,
    pub phases: Vec<PhaseDef>,
    pub rings: Vec<RingDef>,
    pub barriers: Vec<BarrierDef>,
    pub inputs: Vec<InputDef>,
}
