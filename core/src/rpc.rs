//! Observational protocol types.
//!
//! The wire is line-delimited JSON over TCP, served by the frontend; the
//! types live here so the controller can build replies atomically between
//! suspension points.

use serde::{Deserialize, Serialize};

use crate::control::cycler::CycleMode;
use crate::control::field::FieldState;
use crate::control::signal::{SignalState, SignalType, TrafficMovement};
use crate::core::id::ObjectId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldOutputMetadata {
    pub id: ObjectId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignalMetadata {
    pub id: ObjectId,
    pub signal_type: SignalType,
    pub movement: TrafficMovement,
    pub initial_state: SignalState,
    pub field_output_ids: Vec<ObjectId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerMetadata {
    pub version: String,
    pub started_at_epoch: u64,
    pub supports_time_freeze: bool,
    pub supports_time_scaling: bool,
    pub supports_coordination: bool,
    pub supports_scheduling: bool,
    pub supports_dimming: bool,
    pub field_outputs: Vec<FieldOutputMetadata>,
    pub signals: Vec<SignalMetadata>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub run_seconds: f64,
    pub control_seconds: f64,
    pub time_freeze: bool,
    pub time_scale: f64,
    pub active_phases: Vec<ObjectId>,
    pub waiting_phases: Vec<ObjectId>,
    pub cycle_mode: CycleMode,
    pub cycle_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldOutputInfo {
    pub id: ObjectId,
    pub state: FieldState,
    pub value: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignalInfo {
    pub id: ObjectId,
    pub state: SignalState,
    pub timer: f64,
    pub demand: bool,
    pub presence: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub id: ObjectId,
    pub in_service: bool,
    pub demand: bool,
    pub signal_ids: Vec<ObjectId>,
}

/// Result of every setter: `changed` is true iff the prior value
/// differed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ChangeResult {
    pub success: bool,
    pub changed: bool,
}

impl ChangeResult {
    pub fn ok(changed: bool) -> Self {
        Self {
            success: true,
            changed,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            changed: false,
        }
    }
}

/// Which sections a state stream subscriber wants in each push.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StreamSelector {
    pub runtime_info: bool,
    pub field_outputs: bool,
    pub signals: bool,
}

impl Default for StreamSelector {
    fn default() -> Self {
        Self {
            runtime_info: true,
            field_outputs: true,
            signals: true,
        }
    }
}

/// One state-stream push; `seq` increments per controller time tick.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_info: Option<RuntimeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_outputs: Option<Vec<FieldOutputInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<Vec<SignalInfo>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    GetMetadata,
    GetRuntimeInfo,
    GetFieldOutputs,
    GetSignals,
    GetPhases,
    SetTimeFreeze { value: bool },
    SetTimeScale { value: f64 },
    SetCycleMode { mode: CycleMode },
    SetPresenceSimulation { value: bool },
    SetFyaEnabled { value: bool },
    SetSignalDemand { id: ObjectId, value: bool },
    SetSignalPresence { id: ObjectId, value: bool },
    SetPhaseDemand { id: ObjectId, value: bool },
    GetStateStream { selector: StreamSelector },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "reply", content = "body", rename_all = "snake_case")]
pub enum Response {
    Metadata(ControllerMetadata),
    RuntimeInfo(RuntimeInfo),
    FieldOutputs(Vec<FieldOutputInfo>),
    Signals(Vec<SignalInfo>),
    Phases(Vec<PhaseInfo>),
    Change(ChangeResult),
    Snapshot(StateSnapshot),
    Error { message: String },
}
