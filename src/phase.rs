//! Encoder phase, channel and direction primitives.
//!
//! An [`EncoderPhase`] packs the engaged state of channel A (bit 0) and
//! channel B (bit 1). Phases are logical: polarity has already been applied,
//! so `1` always means "channel engaged" regardless of the wiring.
//!
//! ```text
//! clockwise:         00 -> 01 -> 11 -> 10 -> 00
//! counter-clockwise: 00 -> 10 -> 11 -> 01 -> 00
//! ```

use embedded_hal::digital::InputPin;

use crate::config::Polarity;
use crate::error::DecoderError;

/// One of the two encoder channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
}

impl Channel {
    /// Bit mask of this channel within an [`EncoderPhase`].
    pub const fn mask(self) -> u8 {
        match self {
            Channel::A => 0b01,
            Channel::B => 0b10,
        }
    }

    /// The other channel.
    pub const fn other(self) -> Channel {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }
}

/// Direction of rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Channel A leads; counts up.
    Clockwise,
    /// Channel B leads; counts down.
    CounterClockwise,
}

impl Direction {
    /// Signed contribution of one step in this direction.
    pub const fn delta(self) -> i32 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    /// The opposite direction.
    pub const fn reversed(self) -> Direction {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// Instantaneous 2-bit state of the encoder channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderPhase(u8);

impl EncoderPhase {
    /// Both channels released. Mechanical detents rest here.
    pub const IDLE: EncoderPhase = EncoderPhase(0b00);
    /// Only channel A engaged.
    pub const A_ONLY: EncoderPhase = EncoderPhase(0b01);
    /// Only channel B engaged.
    pub const B_ONLY: EncoderPhase = EncoderPhase(0b10);
    /// Both channels engaged; the midpoint of a detent.
    pub const ENGAGED: EncoderPhase = EncoderPhase(0b11);

    /// Build a phase from the raw bits; anything above bit 1 is dropped.
    pub const fn from_bits(bits: u8) -> EncoderPhase {
        EncoderPhase(bits & 0b11)
    }

    /// Build a phase from the logical (already polarity-corrected) levels.
    pub const fn from_levels(a: bool, b: bool) -> EncoderPhase {
        EncoderPhase((a as u8) | ((b as u8) << 1))
    }

    /// Bit 0 is channel A, bit 1 is channel B.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether `channel` is engaged in this phase.
    pub const fn is_engaged(self, channel: Channel) -> bool {
        self.0 & channel.mask() != 0
    }

    /// Whether `other` differs from `self` in exactly one channel.
    ///
    /// Only adjacent phases describe a single physical edge; a jump between
    /// `IDLE` and `ENGAGED` means an edge was missed.
    pub const fn is_adjacent(self, other: EncoderPhase) -> bool {
        (self.0 ^ other.0).count_ones() == 1
    }

    /// The phase that follows this one when rotating in `direction`.
    pub const fn next(self, direction: Direction) -> EncoderPhase {
        match (direction, self.0) {
            (Direction::Clockwise, 0b00) => Self::A_ONLY,
            (Direction::Clockwise, 0b01) => Self::ENGAGED,
            (Direction::Clockwise, 0b11) => Self::B_ONLY,
            (Direction::Clockwise, _) => Self::IDLE,
            (Direction::CounterClockwise, 0b00) => Self::B_ONLY,
            (Direction::CounterClockwise, 0b10) => Self::ENGAGED,
            (Direction::CounterClockwise, 0b11) => Self::A_ONLY,
            (Direction::CounterClockwise, _) => Self::IDLE,
        }
    }
}

/// Read both channel pins and form the current phase.
///
/// This is the pin-level primitive both the interrupt path and
/// initialisation use. Channel A is read first.
pub fn read_phase<A, B, E>(
    pin_a: &mut A,
    pin_b: &mut B,
    polarity: Polarity,
) -> Result<EncoderPhase, DecoderError<E>>
where
    A: InputPin<Error = E>,
    B: InputPin<Error = E>,
{
    let a = polarity.is_engaged(pin_a.is_high()?);
    let b = polarity.is_engaged(pin_b.is_high()?);
    Ok(EncoderPhase::from_levels(a, b))
}

/// Iterator over the phases produced by turning the knob a number of
/// quarter-detents in one direction.
///
/// The starting phase is not yielded. Used to synthesise rotation for
/// simulation and tests.
///
/// ```
/// use qei_decoder::{Direction, EncoderPhase, Rotation};
///
/// let mut phases = Rotation::detents(EncoderPhase::IDLE, Direction::Clockwise, 1);
/// assert_eq!(phases.next(), Some(EncoderPhase::A_ONLY));
/// assert_eq!(phases.next(), Some(EncoderPhase::ENGAGED));
/// assert_eq!(phases.next(), Some(EncoderPhase::B_ONLY));
/// assert_eq!(phases.next(), Some(EncoderPhase::IDLE));
/// assert_eq!(phases.next(), None);
/// ```
#[derive(Debug, Clone)]
pub struct Rotation {
    phase: EncoderPhase,
    direction: Direction,
    remaining: u32,
}

impl Rotation {
    /// Rotate by `quarters` single edges.
    pub fn edges(start: EncoderPhase, direction: Direction, quarters: u32) -> Self {
        Self {
            phase: start,
            direction,
            remaining: quarters,
        }
    }

    /// Rotate by whole detents (4 edges each).
    pub fn detents(start: EncoderPhase, direction: Direction, detents: u32) -> Self {
        Self::edges(start, direction, detents.saturating_mul(4))
    }
}

impl Iterator for Rotation {
    type Item = EncoderPhase;

    fn next(&mut self) -> Option<EncoderPhase> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.phase = self.phase.next(self.direction);
        Some(self.phase)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Rotation {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Levels, TestPin};

    #[test]
    fn levels_map_to_bits() {
        assert_eq!(EncoderPhase::from_levels(false, false), EncoderPhase::IDLE);
        assert_eq!(EncoderPhase::from_levels(true, false), EncoderPhase::A_ONLY);
        assert_eq!(EncoderPhase::from_levels(false, true), EncoderPhase::B_ONLY);
        assert_eq!(EncoderPhase::from_levels(true, true), EncoderPhase::ENGAGED);
        assert_eq!(EncoderPhase::from_bits(0xFE), EncoderPhase::B_ONLY);
    }

    #[test]
    fn adjacency_is_gray_code() {
        assert!(EncoderPhase::IDLE.is_adjacent(EncoderPhase::A_ONLY));
        assert!(EncoderPhase::A_ONLY.is_adjacent(EncoderPhase::ENGAGED));
        assert!(!EncoderPhase::IDLE.is_adjacent(EncoderPhase::ENGAGED));
        assert!(!EncoderPhase::A_ONLY.is_adjacent(EncoderPhase::B_ONLY));
        assert!(!EncoderPhase::IDLE.is_adjacent(EncoderPhase::IDLE));
    }

    #[test]
    fn next_walks_full_cycle_both_ways() {
        for direction in [Direction::Clockwise, Direction::CounterClockwise] {
            let mut phase = EncoderPhase::IDLE;
            for _ in 0..4 {
                let next = phase.next(direction);
                assert!(phase.is_adjacent(next));
                phase = next;
            }
            assert_eq!(phase, EncoderPhase::IDLE);
        }
        assert_eq!(
            EncoderPhase::IDLE.next(Direction::CounterClockwise),
            EncoderPhase::B_ONLY
        );
    }

    #[test]
    fn rotation_yields_requested_edges() {
        let rotation = Rotation::detents(EncoderPhase::IDLE, Direction::CounterClockwise, 3);
        assert_eq!(rotation.len(), 12);
        assert_eq!(rotation.last(), Some(EncoderPhase::IDLE));

        let mut half = Rotation::edges(EncoderPhase::IDLE, Direction::CounterClockwise, 2);
        assert_eq!(half.next(), Some(EncoderPhase::B_ONLY));
        assert_eq!(half.next(), Some(EncoderPhase::ENGAGED));
        assert_eq!(half.next(), None);
    }

    #[test]
    fn read_phase_applies_polarity() {
        let levels = Levels::new();
        let (mut a, mut b) = (TestPin::a(&levels), TestPin::b(&levels));

        // Pull-ups idle high: nothing engaged.
        levels.set_pins(true, true);
        assert_eq!(
            read_phase(&mut a, &mut b, Polarity::ActiveLow),
            Ok(EncoderPhase::IDLE)
        );

        levels.set_pins(false, true);
        assert_eq!(
            read_phase(&mut a, &mut b, Polarity::ActiveLow),
            Ok(EncoderPhase::A_ONLY)
        );
        assert_eq!(
            read_phase(&mut a, &mut b, Polarity::ActiveHigh),
            Ok(EncoderPhase::B_ONLY)
        );
    }

    #[test]
    fn read_phase_propagates_pin_error() {
        let levels = Levels::new();
        let (mut a, mut b) = (TestPin::a(&levels), TestPin::b(&levels));
        levels.fail_reads(true);
        assert!(matches!(
            read_phase(&mut a, &mut b, Polarity::ActiveLow),
            Err(DecoderError::Pin(_))
        ));
    }
}
