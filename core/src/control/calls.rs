//! Calls: demand with provenance and age.
//!
//! A call associates a phase with how long it has been waiting and where
//! the demand came from. Phase demand is the derived boolean the cycler
//! acts on; calls exist so waiting demand can be reported and ranked
//! fairly when more of it exists than can be served.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::id::ObjectId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    Unknown,
    System,
    Recall,
    Fieldbus,
    Network,
}

pub struct Call {
    serial: u32,
    phase: ObjectId,
    source: CallSource,
    age: Cell<f64>,
    duplicates: Cell<u32>,
}

impl Call {
    pub fn phase(&self) -> ObjectId {
        self.phase
    }

    pub fn source(&self) -> CallSource {
        self.source
    }

    pub fn age(&self) -> f64 {
        self.age.get()
    }

    /// How many times the same phase was called again while this call was
    /// already waiting.
    pub fn duplicates(&self) -> u32 {
        self.duplicates.get()
    }
}

#[derive(Default)]
pub struct CallList {
    calls: RefCell<Vec<Rc<Call>>>,
    serial: Cell<u32>,
}

impl CallList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Place a call against a phase. A phase already called folds into
    /// the existing call's duplicate count rather than queueing twice.
    pub fn place(&self, phase: ObjectId, source: CallSource) -> Rc<Call> {
        if let Some(existing) = self.calls.borrow().iter().find(|c| c.phase == phase) {
            existing.duplicates.set(existing.duplicates.get() + 1);
            return existing.clone();
        }
        let serial = self.serial.get() + 1;
        self.serial.set(serial);
        let call = Rc::new(Call {
            serial,
            phase,
            source,
            age: Cell::new(0.0),
            duplicates: Cell::new(0),
        });
        debug!(phase, source = ?source, "call placed");
        self.calls.borrow_mut().push(call.clone());
        call
    }

    /// Age every waiting call by the tick delta.
    pub fn tick(&self, delta: f64) {
        for call in self.calls.borrow().iter() {
            call.age.set(call.age.get() + delta);
        }
    }

    /// Drop the call for a phase once its service begins.
    pub fn clear_for(&self, phase: ObjectId) {
        self.calls.borrow_mut().retain(|c| {
            if c.phase == phase {
                debug!(phase, age = c.age.get(), "call served");
                false
            } else {
                true
            }
        });
    }

    /// Calls ranked for fairness: oldest first; ages within one tick of
    /// each other fall back to placement order.
    pub fn ranked(&self, tick_delta: f64) -> Vec<Rc<Call>> {
        let mut calls = self.calls.borrow().clone();
        calls.sort_by(|a, b| {
            if (a.age.get() - b.age.get()).abs() < tick_delta {
                a.serial.cmp(&b.serial)
            } else {
                b.age
                    .get()
                    .partial_cmp(&a.age.get())
                    .unwrap_or(std::cmp::Ordering::Equal)
            }
        });
        calls
    }
}
