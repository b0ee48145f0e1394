//! Tick context and live rate parameters.

use std::cell::Cell;

use crate::core::id::{self, ObjectId, ObjectKind};
use crate::error::ConfigError;

/// Snapshot handed to every subscriber on a clock tick.
///
/// `rate` is the publishing clock's rate in Hz, `scale` the global virtual
/// time scale, and `timing` whether interval timers may advance on this
/// tick (false while time is frozen; always true on I/O clocks).
#[derive(Clone, Copy, Debug)]
pub struct Context {
    pub rate: f64,
    pub scale: f64,
    pub timing: bool,
}

impl Context {
    /// Virtual seconds covered by one tick of this clock.
    pub fn delay(&self) -> f64 {
        self.scale / self.rate
    }

    /// Timer increment for this tick: zero while frozen.
    pub fn delta(&self) -> f64 {
        if self.timing { self.delay() } else { 0.0 }
    }
}

/// Global time controls shared by the clocks: the virtual time scale and
/// the freeze flag. Freezing zeroes the delta observed by time-clock
/// subscribers; the clock itself keeps ticking so I/O and flash cadence
/// are unaffected.
#[derive(Debug)]
pub struct TimeState {
    pub scale: Cell<f64>,
    pub freeze: Cell<bool>,
}

impl TimeState {
    pub fn new(scale: f64) -> Self {
        Self {
            scale: Cell::new(scale),
            freeze: Cell::new(false),
        }
    }
}

/// A live numeric parameter with a validated range. Rate changes write
/// through and take effect on the owning clock's next period.
#[derive(Debug)]
pub struct RateParameter {
    id: ObjectId,
    name: &'static str,
    value: Cell<f64>,
    lo: f64,
    hi: f64,
}

impl RateParameter {
    pub fn new(
        id: ObjectId,
        name: &'static str,
        initial: f64,
        lo: f64,
        hi: f64,
    ) -> Result<Self, ConfigError> {
        let param = Self {
            id,
            name,
            value: Cell::new(initial),
            lo,
            hi,
        };
        param.validate(initial)?;
        Ok(param)
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    pub fn set(&self, value: f64) -> Result<(), ConfigError> {
        self.validate(value)?;
        self.value.set(value);
        Ok(())
    }

    fn validate(&self, value: f64) -> Result<(), ConfigError> {
        if value < self.lo || value > self.hi || !value.is_finite() {
            return Err(ConfigError::ValueOutOfRange {
                name: self.name,
                value,
                lo: self.lo,
                hi: self.hi,
            });
        }
        Ok(())
    }
}

impl id::Identifiable for RateParameter {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Parameter
    }
}
