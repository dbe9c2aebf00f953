//! The state graph programmed into the event engine.
//!
//! Four states mirror the four encoder phases. Each state enables exactly
//! two events, one per channel, that move to the Gray-code neighbour and
//! drive the direction output:
//!
//! ```text
//! event  state       trigger   next        output
//! 0      Idle        A rise    MidForward  clear (cw)
//! 1      Idle        B rise    MidReverse  set   (ccw)
//! 2      MidForward  A fall    Idle        set   (ccw)
//! 3      MidForward  B rise    Engaged     clear (cw)
//! 4      MidReverse  A rise    Engaged     set   (ccw)
//! 5      MidReverse  B fall    Idle        clear (cw)
//! 6      Engaged     A fall    MidReverse  clear (cw)
//! 7      Engaged     B fall    MidForward  set   (ccw)
//! ```

use crate::phase::{Channel, Direction, EncoderPhase};

/// Engine state; one per encoder phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SequencerState {
    /// Phase 00.
    Idle = 0,
    /// Phase 01: only A engaged; entered first when turning clockwise.
    MidForward = 1,
    /// Phase 10: only B engaged; entered first when turning counter-clockwise.
    MidReverse = 2,
    /// Phase 11.
    Engaged = 3,
}

impl SequencerState {
    /// The state matching a live input phase; used to seed the engine.
    pub const fn from_phase(phase: EncoderPhase) -> SequencerState {
        match phase.bits() {
            0b00 => SequencerState::Idle,
            0b01 => SequencerState::MidForward,
            0b10 => SequencerState::MidReverse,
            _ => SequencerState::Engaged,
        }
    }

    /// The input phase this state stands for.
    pub const fn phase(self) -> EncoderPhase {
        EncoderPhase::from_bits(self as u8)
    }
}

/// Input edge polarity, in logical (engaged = high) terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Channel becomes engaged.
    Rising,
    /// Channel is released.
    Falling,
}

/// The input condition that fires an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Trigger {
    pub channel: Channel,
    pub edge: Edge,
}

impl Trigger {
    /// Fire on `edge` of `channel`.
    pub const fn new(channel: Channel, edge: Edge) -> Self {
        Self { channel, edge }
    }
}

/// What an event does to the direction indicator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputAction {
    /// Drive the output low: forward / clockwise.
    Clear,
    /// Drive the output high: reverse / counter-clockwise.
    Set,
}

impl OutputAction {
    /// Output level after the action.
    pub const fn level(self) -> bool {
        matches!(self, OutputAction::Set)
    }

    /// The action that reports `direction`.
    pub const fn for_direction(direction: Direction) -> OutputAction {
        match direction {
            Direction::Clockwise => OutputAction::Clear,
            Direction::CounterClockwise => OutputAction::Set,
        }
    }

    /// Direction encoded by an output level.
    pub const fn direction_of(level: bool) -> Direction {
        if level {
            Direction::CounterClockwise
        } else {
            Direction::Clockwise
        }
    }
}

/// One programmed transition of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerEvent {
    pub trigger: Trigger,
    /// Only enabled while the engine is in this state.
    pub from: SequencerState,
    pub to: SequencerState,
    pub action: OutputAction,
}

impl SequencerEvent {
    const fn new(
        channel: Channel,
        edge: Edge,
        from: SequencerState,
        to: SequencerState,
        direction: Direction,
    ) -> Self {
        Self {
            trigger: Trigger::new(channel, edge),
            from,
            to,
            action: OutputAction::for_direction(direction),
        }
    }

    /// Whether this event fires for `trigger` while the engine is in `state`.
    pub fn fires_on(&self, state: SequencerState, trigger: Trigger) -> bool {
        self.from == state && self.trigger == trigger
    }

    /// Direction this event reports.
    pub const fn direction(&self) -> Direction {
        OutputAction::direction_of(self.action.level())
    }
}

/// Number of events in the quadrature graph.
pub const EVENT_COUNT: usize = 8;

/// The full event table, indexed by engine event number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerGraph {
    pub events: [SequencerEvent; EVENT_COUNT],
}

impl SequencerGraph {
    /// Mask with one bit per programmed event.
    pub const fn event_mask(&self) -> u8 {
        ((1u16 << EVENT_COUNT) - 1) as u8
    }

    /// Events with their slot index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SequencerEvent)> {
        self.events.iter().enumerate()
    }
}

use Channel::{A, B};
use Direction::{Clockwise as Fwd, CounterClockwise as Rev};
use Edge::{Falling, Rising};
use SequencerState::{Engaged, Idle, MidForward, MidReverse};

/// Quadrature graph: 4 states, 8 edge-triggered transitions.
pub const SEQUENCER_GRAPH: SequencerGraph = SequencerGraph {
    events: [
        SequencerEvent::new(A, Rising, Idle, MidForward, Fwd),
        SequencerEvent::new(B, Rising, Idle, MidReverse, Rev),
        SequencerEvent::new(A, Falling, MidForward, Idle, Rev),
        SequencerEvent::new(B, Rising, MidForward, Engaged, Fwd),
        SequencerEvent::new(A, Rising, MidReverse, Engaged, Rev),
        SequencerEvent::new(B, Falling, MidReverse, Idle, Fwd),
        SequencerEvent::new(A, Falling, Engaged, MidReverse, Fwd),
        SequencerEvent::new(B, Falling, Engaged, MidForward, Rev),
    ],
};
