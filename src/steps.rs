//! Public step API read by the application loop.

use crate::counter::StepCounter;
use crate::decoder::QuadratureDecoder;

/// Application-side view of a [`StepCounter`], in whole detents.
///
/// Holds the cursor behind [`offset_step()`](Self::offset_step). There must
/// be exactly one `Steps` per counter: the offset is consumed by whoever
/// polls it, so `offset_step()` and `reset_step()` take `&mut self`.
///
/// Raw counts are floor-divided by the backend's counts per detent, so a
/// decoder reporting quarter-detents reads exactly the same as one reporting
/// whole detents whenever the knob rests on a detent. The offset cursor
/// keeps the raw count, so offsets stay correct when the counter wraps.
///
/// ```
/// use qei_decoder::{Direction, StepCounter, Steps};
///
/// let counter = StepCounter::new();
/// let mut steps = Steps::new(&counter, 1);
///
/// counter.advance(Direction::Clockwise);
/// counter.advance(Direction::Clockwise);
/// assert_eq!(steps.absolute_step(), 2);
/// assert_eq!(steps.offset_step(), 2);
/// assert_eq!(steps.offset_step(), 0);
///
/// steps.reset_step(5);
/// assert_eq!(steps.absolute_step(), 5);
/// assert_eq!(steps.offset_step(), 0);
/// ```
pub struct Steps<'a> {
    counter: &'a StepCounter,
    counts_per_detent: i32,
    /// Raw count at the previous poll.
    last_count: i32,
}

impl<'a> Steps<'a> {
    /// Wrap `counter`, scaling raw counts by `counts_per_detent`.
    ///
    /// The offset cursor starts at zero, so the first
    /// [`offset_step()`](Self::offset_step) reports everything counted so far.
    ///
    /// # Panics
    /// If `counts_per_detent` is not positive.
    pub fn new(counter: &'a StepCounter, counts_per_detent: i32) -> Self {
        assert!(counts_per_detent > 0, "counts_per_detent must be positive");
        Self {
            counter,
            counts_per_detent,
            last_count: 0,
        }
    }

    /// Wrap `counter` with the resolution of backend `D`.
    pub fn for_backend<D: QuadratureDecoder>(counter: &'a StepCounter) -> Self {
        Self::new(counter, D::COUNTS_PER_DETENT)
    }

    /// Current position in detents. No side effects.
    pub fn absolute_step(&self) -> i32 {
        self.counter.load().div_euclid(self.counts_per_detent)
    }

    /// Unscaled counter value.
    pub fn absolute_count(&self) -> i32 {
        self.counter.load()
    }

    /// Detents moved since the previous call.
    ///
    /// The raw movement is taken modulo the counter width, then counted in
    /// detent boundaries crossed, so a wrap of the counter reads as the
    /// small movement it was.
    pub fn offset_step(&mut self) -> i32 {
        let current = self.counter.load();
        let moved = i64::from(current.wrapping_sub(self.last_count));
        let cpd = i64::from(self.counts_per_detent);
        let into_detent = i64::from(self.last_count.rem_euclid(self.counts_per_detent));
        self.last_count = current;
        // The quotient stays within i32 for any positive divisor.
        (into_detent + moved).div_euclid(cpd) as i32
    }

    /// Set the position to `value` detents and re-base the offset cursor
    /// on it, so the next [`offset_step()`](Self::offset_step) only reports
    /// rotation after the reset.
    ///
    /// Values the raw counter cannot hold at this resolution are clamped
    /// to the nearest one it can.
    pub fn reset_step(&mut self, value: i32) {
        let max = i32::MAX / self.counts_per_detent;
        let min = i32::MIN / self.counts_per_detent;
        let count = value.clamp(min, max) * self.counts_per_detent;
        self.counter.store(count);
        self.last_count = count;
    }

    /// Re-zero the position.
    pub fn reset_step_to_zero(&mut self) {
        self.reset_step(0);
    }

    /// Raw counts per detent this view divides by.
    pub fn counts_per_detent(&self) -> i32 {
        self.counts_per_detent
    }
}
