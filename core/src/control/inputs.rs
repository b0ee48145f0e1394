//! Detector and preemption inputs.
//!
//! The field bus delivers InputState bitfields; on each inputs-clock tick
//! the manager edge-detects every configured slot and emits the resulting
//! actions for the controller to apply.

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::id::ObjectId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputActivation {
    Low,
    High,
    Rising,
    Falling,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    Nothing,
    /// Place a call on the target phases.
    Call,
    /// Assert presence on the target phases' signals (extends a green).
    Detect,
    /// Follow the input level into the global time-freeze flag.
    TimeFreeze,
    /// Drop the controller into load-switch flash.
    LsFlash,
}

pub struct Input {
    /// 1-based bus slot; slot 1 is bit 0 of payload byte 0.
    slot: usize,
    activation: InputActivation,
    action: InputAction,
    targets: Vec<ObjectId>,
    state: Cell<bool>,
    last: Cell<bool>,
}

impl Input {
    pub fn new(
        slot: usize,
        activation: InputActivation,
        action: InputAction,
        targets: Vec<ObjectId>,
    ) -> Self {
        Self {
            slot,
            activation,
            action,
            targets,
            state: Cell::new(false),
            last: Cell::new(false),
        }
    }

    fn update(&self, level: bool) {
        self.last.set(self.state.replace(level));
    }

    fn changed(&self) -> bool {
        self.state.get() != self.last.get()
    }

    fn activated(&self) -> bool {
        let (state, last) = (self.state.get(), self.last.get());
        match self.activation {
            InputActivation::Low => !state && !last,
            InputActivation::High => state && last,
            InputActivation::Rising => state && !last,
            InputActivation::Falling => !state && last,
        }
    }
}

/// An action the controller must apply this tick.
#[derive(Clone, Debug)]
pub struct InputEvent {
    pub action: InputAction,
    pub targets: Vec<ObjectId>,
    pub level: bool,
}

#[derive(Default)]
pub struct InputManager {
    inputs: Vec<Input>,
    pending: RefCell<Option<Vec<u8>>>,
    last_bitfield: RefCell<Option<Vec<u8>>>,
}

impl InputManager {
    pub fn new(inputs: Vec<Input>) -> Self {
        Self {
            inputs,
            pending: RefCell::new(None),
            last_bitfield: RefCell::new(None),
        }
    }

    /// Latch the most recent decoded InputState payload; consumed on the
    /// next inputs tick (most recent wins).
    pub fn submit_bitfield(&self, bitfield: Vec<u8>) {
        *self.pending.borrow_mut() = Some(bitfield);
    }

    fn slot_level(bitfield: &[u8], slot: usize) -> bool {
        let index = slot - 1;
        bitfield
            .get(index / 8)
            .is_some_and(|byte| byte >> (index % 8) & 1 == 1)
    }

    /// Process the latched bitfield: update slot levels, run activation
    /// logic, and return the actions to apply.
    pub fn poll(&self) -> Vec<InputEvent> {
        let Some(bitfield) = self.pending.borrow_mut().take() else {
            return Vec::new();
        };
        let unchanged = self
            .last_bitfield
            .borrow()
            .as_ref()
            .is_some_and(|last| *last == bitfield);
        if unchanged {
            return Vec::new();
        }

        let mut events = Vec::new();
        for input in &self.inputs {
            if input.action == InputAction::Nothing {
                continue;
            }
            input.update(Self::slot_level(&bitfield, input.slot));
            let fire = match input.action {
                // Freeze follows the line level, so it fires on any edge.
                InputAction::TimeFreeze => input.changed(),
                _ => input.activated(),
            };
            if fire {
                debug!(slot = input.slot, action = ?input.action, "input activated");
                events.push(InputEvent {
                    action: input.action,
                    targets: input.targets.clone(),
                    level: input.state.get(),
                });
            }
        }
        *self.last_bitfield.borrow_mut() = Some(bitfield);
        events
    }
}
