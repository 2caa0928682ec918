//! Time source for note and trash timestamps

use std::cell::Cell;

pub const DAY_MS: f64 = 86_400_000.0;

/// Supplies "now" as epoch milliseconds, the unit every stored timestamp uses.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock. `chrono` is built with `wasmbind`, so this reads `Date.now()` in the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: Cell<f64>,
}

impl FixedClock {
    pub fn new(now_ms: f64) -> FixedClock {
        FixedClock {
            now: Cell::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance_days(&self, days: f64) {
        self.now.set(self.now.get() + days * DAY_MS);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}
