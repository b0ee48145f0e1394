//! Entity identifiers.
//!
//! Every core entity carries a globally unique numeric identifier drawn
//! from a disjoint per-kind range. Identifiers are claimed at construction
//! through an [`IdRegistry`]; a duplicate or out-of-range claim is a
//! configuration error. Cross-references between entities are stored as
//! bare identifiers and resolved through the controller root, so the data
//! graph has no ownership cycles.

use std::collections::HashSet;
use std::fmt;

use crate::error::ConfigError;

pub type ObjectId = u16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    FieldOutput,
    Signal,
    Phase,
    Ring,
    Barrier,
    Parameter,
    Clock,
}

impl ObjectKind {
    /// Inclusive identifier range reserved for this kind.
    pub fn range(self) -> (ObjectId, ObjectId) {
        match self {
            ObjectKind::FieldOutput => (101, 196),
            ObjectKind::Signal => (501, 599),
            ObjectKind::Phase => (601, 699),
            ObjectKind::Ring => (701, 704),
            ObjectKind::Barrier => (801, 804),
            ObjectKind::Parameter => (8000, 8199),
            ObjectKind::Clock => (901, 905),
        }
    }

    /// Two-letter tag prefix used in logs (`FO101`, `SI502`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            ObjectKind::FieldOutput => "FO",
            ObjectKind::Signal => "SI",
            ObjectKind::Phase => "PH",
            ObjectKind::Ring => "RI",
            ObjectKind::Barrier => "BA",
            ObjectKind::Parameter => "PA",
            ObjectKind::Clock => "CL",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::FieldOutput => "field output",
            ObjectKind::Signal => "signal",
            ObjectKind::Phase => "phase",
            ObjectKind::Ring => "ring",
            ObjectKind::Barrier => "barrier",
            ObjectKind::Parameter => "parameter",
            ObjectKind::Clock => "clock",
        };
        f.write_str(name)
    }
}

/// Compact display tag for an entity, e.g. `SI502`.
pub fn tag(kind: ObjectKind, id: ObjectId) -> String {
    format!("{}{}", kind.prefix(), id)
}

/// Carried by every addressable entity.
pub trait Identifiable {
    fn id(&self) -> ObjectId;
    fn kind(&self) -> ObjectKind;

    fn tag(&self) -> String {
        tag(self.kind(), self.id())
    }
}

/// Construction-time identifier allocator. Rejects duplicates and ids
/// outside their kind's reserved range.
#[derive(Default)]
pub struct IdRegistry {
    claimed: HashSet<ObjectId>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, kind: ObjectKind, id: ObjectId) -> Result<ObjectId, ConfigError> {
        let (lo, hi) = kind.range();
        if id < lo || id > hi {
            return Err(ConfigError::IdOutOfRange { id, kind, lo, hi });
        }
        if !self.claimed.insert(id) {
            return Err(ConfigError::DuplicateId { id });
        }
        Ok(id)
    }
}
