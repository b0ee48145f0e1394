//! Small timing primitives shared across the controller.

/// Accumulating interval timer. The owner advances it with the per-tick
/// delta and reads or resets the elapsed value; `poll` is the auto-reset
/// form used by free-running consumers (flasher, simulator).
#[derive(Debug, Default)]
pub struct Timer {
    value: f64,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    /// Advance by `delta`; when the accumulated value reaches `trigger`,
    /// reset and report true.
    pub fn poll(&mut self, delta: f64, trigger: f64) -> bool {
        self.value += delta;
        if self.value >= trigger {
            self.value = 0.0;
            true
        } else {
            false
        }
    }
}

/// Half-period square-wave generator for flashing indications. `poll`
/// is driven with the flash-clock delta and reports true on each toggle
/// boundary; one full flash is two toggles.
#[derive(Debug)]
pub struct Flasher {
    timer: Timer,
}

impl Flasher {
    pub fn new() -> Self {
        Self { timer: Timer::new() }
    }

    /// Seconds between toggles at the given flashes-per-minute rate.
    pub fn half_period(fpm: f64) -> f64 {
        (60.0 / fpm) / 2.0
    }

    pub fn poll(&mut self, delta: f64, fpm: f64) -> bool {
        self.timer.poll(delta, Self::half_period(fpm))
    }
}

impl Default for Flasher {
    fn default() -> Self {
        Self::new()
    }
}
