pub mod calls;
pub mod controller;
pub mod cycler;
pub mod definition;
pub mod field;
pub mod inputs;
pub mod phase;
pub mod ring;
pub mod signal;
pub mod simulation;

pub use calls::{Call, CallList, CallSource};
pub use controller::{Controller, ControllerOptions, OperationMode};
pub use cycler::{CycleMode, PhaseCycler};
pub use field::{FieldOutput, FieldState};
pub use phase::Phase;
pub use ring::{Barrier, Ring};
pub use signal::{Signal, SignalState, SignalType};
