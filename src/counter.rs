//! The shared step counter.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::phase::Direction;

/// Signed count of committed steps, shared between the interrupt path and
/// the application loop.
///
/// Every access runs inside a critical section, so the read-modify-write in
/// [`advance()`](Self::advance) cannot be torn on cores without atomic
/// read-modify-write instructions (Cortex-M0+), nor interleaved with a
/// higher-priority handler touching the same counter.
///
/// The value wraps on overflow.
///
/// ```
/// use qei_decoder::{Direction, StepCounter};
///
/// static COUNTER: StepCounter = StepCounter::new();
///
/// COUNTER.advance(Direction::Clockwise);
/// COUNTER.advance(Direction::Clockwise);
/// COUNTER.advance(Direction::CounterClockwise);
/// assert_eq!(COUNTER.load(), 1);
/// ```
pub struct StepCounter {
    count: Mutex<CriticalSectionRawMutex, Cell<i32>>,
}

impl Default for StepCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl StepCounter {
    /// A counter at zero. `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(0)),
        }
    }

    /// Current raw count.
    pub fn load(&self) -> i32 {
        self.count.lock(|count| count.get())
    }

    /// Overwrite the raw count.
    pub fn store(&self, value: i32) {
        self.count.lock(|count| count.set(value));
    }

    /// Add one step in `direction` and return the new count.
    pub fn advance(&self, direction: Direction) -> i32 {
        self.count.lock(|count| {
            let next = count.get().wrapping_add(direction.delta());
            count.set(next);
            next
        })
    }
}
