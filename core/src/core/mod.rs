pub mod clock;
pub mod context;
pub mod event;
pub mod id;
pub mod timer;

pub use clock::{Clock, ClockRates, ClockSet, Tickable};
pub use context::{Context, RateParameter, TimeState};
pub use event::Event;
pub use id::{IdRegistry, Identifiable, ObjectId, ObjectKind};
pub use timer::{Flasher, Timer};
