//! Rings and barriers: the compatibility structure over phases.

use std::rc::Rc;

use crate::control::phase::Phase;
use crate::core::id::{Identifiable, ObjectId, ObjectKind};

/// An ordered set of phases of which at most one may be in service at a
/// time.
pub struct Ring {
    id: ObjectId,
    phases: Vec<Rc<Phase>>,
}

impl Ring {
    pub fn new(id: ObjectId, phases: Vec<Rc<Phase>>) -> Rc<Self> {
        Rc::new(Self { id, phases })
    }

    pub fn phases(&self) -> &[Rc<Phase>] {
        &self.phases
    }

    pub fn busy(&self) -> bool {
        self.phases.iter().any(|p| p.in_service())
    }

    pub fn demand(&self) -> bool {
        self.phases.iter().any(|p| p.demand())
    }

    /// Phases of this ring inside the barrier, in ring order.
    pub fn in_barrier(&self, barrier: &Barrier) -> Vec<Rc<Phase>> {
        self.phases
            .iter()
            .filter(|p| barrier.contains(p.id()))
            .cloned()
            .collect()
    }
}

impl Identifiable for Ring {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Ring
    }
}

/// A set of mutually compatible phases across rings. Crossing a barrier
/// requires every ring to have finished its current phase.
pub struct Barrier {
    id: ObjectId,
    phases: Vec<Rc<Phase>>,
}

impl Barrier {
    pub fn new(id: ObjectId, phases: Vec<Rc<Phase>>) -> Rc<Self> {
        Rc::new(Self { id, phases })
    }

    pub fn phases(&self) -> &[Rc<Phase>] {
        &self.phases
    }

    pub fn contains(&self, phase: ObjectId) -> bool {
        self.phases.iter().any(|p| p.id() == phase)
    }
}

impl Identifiable for Barrier {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Barrier
    }
}
