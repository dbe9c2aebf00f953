//! Edge-interrupt decoder.
//!
//! Every transition on either channel raises a pin-change interrupt whose
//! handler calls [`EdgeDecoder::on_edge()`]. The decoder does not count
//! individual edges. It collects [`EdgeEvidence`] while the knob travels
//! from one detent to the next and, when the phase returns to idle, commits
//! a single step only if the evidence tells a consistent story:
//!
//! - leading edge and completing edge on opposite channels, or
//! - either of them plus a pass through the fully engaged midpoint.
//!
//! One missing edge per detent is therefore tolerated, while a partial turn
//! that reverses before the midpoint is dropped as bounce.

use embedded_hal::digital::InputPin;

use crate::config::DecoderConfig;
use crate::counter::StepCounter;
use crate::decoder::QuadratureDecoder;
use crate::error::DecoderError;
use crate::phase::{read_phase, Channel, Direction, EncoderPhase};

/// Edges observed during the current detent transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeEvidence(u8);

impl EdgeEvidence {
    /// Left idle with channel A engaging first.
    pub const LEAD_A: EdgeEvidence = EdgeEvidence(1 << 0);
    /// Left idle with channel B engaging first.
    pub const LEAD_B: EdgeEvidence = EdgeEvidence(1 << 1);
    /// Returned to idle with channel B releasing last.
    pub const TRAIL_B: EdgeEvidence = EdgeEvidence(1 << 2);
    /// Returned to idle with channel A releasing last.
    pub const TRAIL_A: EdgeEvidence = EdgeEvidence(1 << 3);
    /// Passed through the fully engaged phase.
    pub const MIDPOINT: EdgeEvidence = EdgeEvidence(1 << 4);

    /// No edges seen yet.
    pub const fn empty() -> EdgeEvidence {
        EdgeEvidence(0)
    }

    /// Raw flag bits, for logging.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether nothing has been recorded.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag of `other` is set.
    pub const fn contains(self, other: EdgeEvidence) -> bool {
        self.0 & other.0 == other.0
    }

    /// Record the flags of `other`.
    pub fn insert(&mut self, other: EdgeEvidence) {
        *self = self.union(other);
    }

    /// Flags set in either `self` or `other`.
    pub const fn union(self, other: EdgeEvidence) -> EdgeEvidence {
        EdgeEvidence(self.0 | other.0)
    }

    fn lead(channel: Channel) -> EdgeEvidence {
        match channel {
            Channel::A => Self::LEAD_A,
            Channel::B => Self::LEAD_B,
        }
    }

    fn trail(channel: Channel) -> EdgeEvidence {
        match channel {
            Channel::A => Self::TRAIL_A,
            Channel::B => Self::TRAIL_B,
        }
    }

    /// Decide the direction of a finished detent, if the evidence supports
    /// one. Clockwise is checked first.
    pub fn verdict(self) -> Option<Direction> {
        let supports = |lead: EdgeEvidence, trail: EdgeEvidence| {
            let lead = self.contains(lead);
            let trail = self.contains(trail);
            let mid = self.contains(Self::MIDPOINT);
            (lead && (trail || mid)) || (trail && (lead || mid))
        };

        if supports(Self::LEAD_A, Self::TRAIL_B) {
            Some(Direction::Clockwise)
        } else if supports(Self::LEAD_B, Self::TRAIL_A) {
            Some(Direction::CounterClockwise)
        } else {
            None
        }
    }
}

/// What a single edge did to the detent tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// Phase unchanged; a duplicate or noise interrupt.
    Unchanged,
    /// Mid-detent; evidence recorded, nothing committed yet.
    Tracking,
    /// Back at idle with a consistent sequence; one step committed.
    Committed(Direction),
    /// Back at idle with inconsistent evidence; nothing committed.
    Rejected(EdgeEvidence),
}

/// The detent state machine, without any pin or counter attached.
///
/// Feed it successive phases; it reports when a detent completes.
#[derive(Debug, Clone)]
pub struct EdgeTracker {
    previous: EncoderPhase,
    evidence: EdgeEvidence,
}

impl EdgeTracker {
    /// Start tracking from the phase the pins currently show.
    pub const fn new(initial: EncoderPhase) -> Self {
        Self {
            previous: initial,
            evidence: EdgeEvidence::empty(),
        }
    }

    /// Phase seen on the last update.
    pub fn previous(&self) -> EncoderPhase {
        self.previous
    }

    /// Evidence gathered so far in the current detent.
    pub fn evidence(&self) -> EdgeEvidence {
        self.evidence
    }

    /// Process the phase read after an edge interrupt.
    pub fn update(&mut self, current: EncoderPhase) -> EdgeOutcome {
        let previous = self.previous;
        if current == previous {
            return EdgeOutcome::Unchanged;
        }
        self.previous = current;

        if previous == EncoderPhase::IDLE {
            if current == EncoderPhase::A_ONLY {
                self.evidence.insert(EdgeEvidence::lead(Channel::A));
            } else if current == EncoderPhase::B_ONLY {
                self.evidence.insert(EdgeEvidence::lead(Channel::B));
            }
        }

        if current == EncoderPhase::ENGAGED {
            self.evidence.insert(EdgeEvidence::MIDPOINT);
            return EdgeOutcome::Tracking;
        }

        if current != EncoderPhase::IDLE {
            return EdgeOutcome::Tracking;
        }

        // Back at idle: whichever channel was still engaged released last.
        if previous == EncoderPhase::B_ONLY {
            self.evidence.insert(EdgeEvidence::trail(Channel::B));
        } else if previous == EncoderPhase::A_ONLY {
            self.evidence.insert(EdgeEvidence::trail(Channel::A));
        }

        let evidence = core::mem::take(&mut self.evidence);
        match evidence.verdict() {
            Some(direction) => EdgeOutcome::Committed(direction),
            None => EdgeOutcome::Rejected(evidence),
        }
    }
}

/// Running totals kept by [`EdgeDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeStats {
    /// Interrupts serviced.
    pub edges: u32,
    /// Interrupts that found the phase unchanged.
    pub duplicates: u32,
    /// Detents committed as a step.
    pub committed: u32,
    /// Detents dropped for inconsistent evidence.
    pub rejected: u32,
}

/// Software quadrature decoder fed by pin-change interrupts on both
/// channels.
///
/// Commits one count per detent into the shared [`StepCounter`].
///
/// # Example
///
/// ```
/// use core::convert::Infallible;
/// use embedded_hal::digital::{ErrorType, InputPin};
/// use qei_decoder::{Channel, DecoderConfig, EdgeDecoder, StepCounter};
///
/// struct Released;
/// impl ErrorType for Released { type Error = Infallible; }
/// impl InputPin for Released {
///     fn is_high(&mut self) -> Result<bool, Infallible> { Ok(true) }
///     fn is_low(&mut self) -> Result<bool, Infallible> { Ok(false) }
/// }
///
/// let counter = StepCounter::new();
/// let mut decoder =
///     EdgeDecoder::new(Released, Released, &counter, DecoderConfig::default()).unwrap();
///
/// // A spurious interrupt with no level change never counts.
/// decoder.on_edge(Channel::A).unwrap();
/// assert_eq!(counter.load(), 0);
/// ```
pub struct EdgeDecoder<'a, A, B> {
    pin_a: A,
    pin_b: B,
    config: DecoderConfig,
    tracker: EdgeTracker,
    counter: &'a StepCounter,
    stats: EdgeStats,
}

impl<'a, A, B, E> EdgeDecoder<'a, A, B>
where
    A: InputPin<Error = E>,
    B: InputPin<Error = E>,
{
    /// Take ownership of the channel pins and seed the tracker with the
    /// phase they show right now, so enabling the interrupts afterwards
    /// does not produce a spurious first transition.
    ///
    /// # Errors
    /// [`DecoderError::Pin`] if either pin cannot be read.
    pub fn new(
        mut pin_a: A,
        mut pin_b: B,
        counter: &'a StepCounter,
        config: DecoderConfig,
    ) -> Result<Self, DecoderError<E>> {
        let initial = read_phase(&mut pin_a, &mut pin_b, config.polarity)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("edge decoder seeded at phase {=u8:b}", initial.bits());

        Ok(Self {
            pin_a,
            pin_b,
            config,
            tracker: EdgeTracker::new(initial),
            counter,
            stats: EdgeStats::default(),
        })
    }

    /// Service a pin-change interrupt on `channel`.
    ///
    /// Reads both channels, advances the detent tracker and commits at most
    /// one step. Bounded time, never blocks; safe to call from interrupt
    /// context. `channel` only identifies the interrupt source for logging;
    /// both pins are always read.
    ///
    /// # Errors
    /// [`DecoderError::Pin`] if either pin cannot be read. The tracker is
    /// left untouched in that case.
    pub fn on_edge(&mut self, channel: Channel) -> Result<EdgeOutcome, DecoderError<E>> {
        let current = read_phase(&mut self.pin_a, &mut self.pin_b, self.config.polarity)?;
        let outcome = self.tracker.update(current);
        self.stats.edges = self.stats.edges.wrapping_add(1);

        match outcome {
            EdgeOutcome::Unchanged => {
                self.stats.duplicates = self.stats.duplicates.wrapping_add(1);
            }
            EdgeOutcome::Tracking => {}
            EdgeOutcome::Committed(direction) => {
                let direction = if self.config.invert_direction {
                    direction.reversed()
                } else {
                    direction
                };
                let _count = self.counter.advance(direction);
                self.stats.committed = self.stats.committed.wrapping_add(1);

                #[cfg(feature = "defmt")]
                defmt::trace!("detent {} via {}, count={}", direction, channel, _count);
            }
            EdgeOutcome::Rejected(_evidence) => {
                self.stats.rejected = self.stats.rejected.wrapping_add(1);

                #[cfg(feature = "defmt")]
                defmt::trace!(
                    "detent rejected via {}, evidence={=u8:b}",
                    channel,
                    _evidence.bits()
                );
            }
        }

        #[cfg(not(feature = "defmt"))]
        let _ = channel;

        Ok(outcome)
    }

    /// Mutable access to the channel pins, e.g. to await edges on them
    /// between calls to [`on_edge()`](Self::on_edge).
    pub fn pins_mut(&mut self) -> (&mut A, &mut B) {
        (&mut self.pin_a, &mut self.pin_b)
    }

    /// Running totals since construction.
    pub fn stats(&self) -> EdgeStats {
        self.stats
    }

    /// The detent state machine, for inspection.
    pub fn tracker(&self) -> &EdgeTracker {
        &self.tracker
    }

    /// Give the pins back.
    pub fn free(self) -> (A, B) {
        (self.pin_a, self.pin_b)
    }
}

impl<A, B> QuadratureDecoder for EdgeDecoder<'_, A, B> {
    const COUNTS_PER_DETENT: i32 = 1;

    fn counter(&self) -> &StepCounter {
        self.counter
    }
}
