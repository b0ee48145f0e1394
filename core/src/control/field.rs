//! Field outputs: the lowest-level actuator abstraction.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::core::id::{Identifiable, ObjectId, ObjectKind};

/// Commanded state of a load-switch channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldState {
    #[default]
    Off,
    On,
    Flashing,
}

/// One binary output channel driving a load switch.
///
/// The scalar is the driven value and only changes on `set()` or, while
/// FLASHING, on flash-clock ticks. An OFF to FLASHING transition starts
/// dark (the next flash tick illuminates it); ON to FLASHING keeps the
/// current scalar so the head does not blink dark at the transition.
pub struct FieldOutput {
    id: ObjectId,
    state: Cell<FieldState>,
    scalar: Cell<bool>,
}

impl FieldOutput {
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            state: Cell::new(FieldState::Off),
            scalar: Cell::new(false),
        }
    }

    pub fn state(&self) -> FieldState {
        self.state.get()
    }

    pub fn scalar(&self) -> bool {
        self.scalar.get()
    }

    pub fn set(&self, state: FieldState) {
        match state {
            FieldState::Off => self.scalar.set(false),
            FieldState::On => self.scalar.set(true),
            FieldState::Flashing => {} // retain current scalar
        }
        self.state.set(state);
    }

    /// Invoked by the flash clock; one call is one half flash period.
    pub fn tick_flash(&self) {
        if self.state.get() == FieldState::Flashing {
            self.scalar.set(!self.scalar.get());
        }
    }
}

impl Identifiable for FieldOutput {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::FieldOutput
    }
}
