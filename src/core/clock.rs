/*
 * Time source abstraction. The search debouncer asks the clock rather than
 * reading `Instant::now()` directly so tests can drive time by hand.
 */
use std::time::Instant;

pub trait ClockOperations: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct CoreClock {}

impl CoreClock {
    pub fn new() -> Self {
        CoreClock {}
    }
}

impl Default for CoreClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockOperations for CoreClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
