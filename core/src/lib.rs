pub mod control;
pub mod core;
pub mod error;
pub mod fieldbus;
pub mod rpc;

pub mod prelude {
    pub use crate::control::controller::{Controller, ControllerOptions, OperationMode};
    pub use crate::control::cycler::CycleMode;
    pub use crate::control::definition::{
        BarrierDef, InputDef, IntersectionDef, PhaseDef, RingDef, SignalDef,
    };
    pub use crate::control::signal::{
        FlashChannel, IntervalConfig, IntervalTiming, SignalState, SignalType, TrafficMovement,
    };
    pub use crate::core::context::Context;
    pub use crate::core::id::{ObjectId, ObjectKind};
    pub use crate::error::{BusError, ConfigError, Fault};
}
