//! Error taxonomy for the controller.
//!
//! Three kinds, with different propagation rules:
//! - [`ConfigError`]: rejected at construction, terminates startup.
//! - [`BusError`]: transient field-bus I/O; recovered locally, never fatal.
//! - [`Fault`]: internal invariant violation; degrades the controller to
//!   load-switch flash rather than leaving the intersection mid-indication.

use thiserror::Error;

use crate::core::id::{ObjectId, ObjectKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("identifier {id} already defined")]
    DuplicateId { id: ObjectId },

    #[error("identifier {id} out of range for {kind} ({lo}..={hi})")]
    IdOutOfRange {
        id: ObjectId,
        kind: ObjectKind,
        lo: ObjectId,
        hi: ObjectId,
    },

    #[error("{tag}: unresolved {kind} reference {id}")]
    UnresolvedRef {
        tag: String,
        kind: ObjectKind,
        id: ObjectId,
    },

    #[error("{tag}: {state} minimum {min}s exceeds maximum {max}s")]
    TimingRange {
        tag: String,
        state: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{tag}: missing {state} interval timing")]
    MissingTiming { tag: String, state: &'static str },

    #[error("{name} value {value} out of range ({lo}..={hi})")]
    ValueOutOfRange {
        name: &'static str,
        value: f64,
        lo: f64,
        hi: f64,
    },
}

/// Transient field-bus I/O failures. Logged and recovered in place; the
/// frame in flight is discarded and the bus loop continues.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to open bus link {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("bus write failed: {0}")]
    Write(std::io::Error),
}

/// Programming faults detected at runtime. These identify the offending
/// entity by tag and are fatal to normal operation: the controller logs
/// the fault, pauses the cycler and drops every vehicle signal into
/// LS_FLASH before shutting down.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    #[error("{tag}: already active")]
    AlreadyActive { tag: String },

    #[error("{tag}: no field output mapped for state {state}")]
    UnmappedState { tag: String, state: &'static str },

    #[error("{tag}: no interval timing for state {state}")]
    UntimedState { tag: String, state: &'static str },
}
