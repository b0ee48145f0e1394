//! Single-threaded set/clear event with async waiters.

use std::cell::Cell;
use std::time::Instant;

use tokio::sync::Notify;

/// A cooperative event flag. `wait()` suspends until the flag is set.
/// Tracks the wall instant of the last set/clear so shutdown timing can
/// be reported.
pub struct Event {
    set: Cell<bool>,
    marker: Cell<Instant>,
    notify: Notify,
}

impl Event {
    pub fn new() -> Self {
        Self {
            set: Cell::new(false),
            marker: Cell::new(Instant::now()),
            notify: Notify::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.set.get()
    }

    /// Seconds since the flag last changed.
    pub fn elapsed(&self) -> f64 {
        self.marker.get().elapsed().as_secs_f64()
    }

    pub fn set(&self) {
        if !self.set.replace(true) {
            self.marker.set(Instant::now());
        }
        self.notify.notify_waiters();
    }

    pub fn clear(&self) {
        if self.set.replace(false) {
            self.marker.set(Instant::now());
        }
    }

    pub async fn wait(&self) {
        // On a current-thread runtime the flag cannot change between the
        // check and the first poll of `notified()`, so no wakeup is lost.
        while !self.set.get() {
            self.notify.notified().await;
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}
