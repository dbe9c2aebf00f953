//! Software model of a state/event engine.
//!
//! Behaves like the peripheral the graph is written for: events are only
//! enabled in their `from` state, a matching input edge moves the engine to
//! the `to` state, applies the output action and latches the event flag.
//! Used for host simulation and to drive the sequencer backend in tests.

use super::graph::{Edge, SequencerEvent, SequencerState, Trigger, EVENT_COUNT};
use super::SequencerPeripheral;
use crate::phase::{Channel, EncoderPhase};

#[derive(Debug, Clone)]
pub struct EventEngine {
    events: [Option<SequencerEvent>; EVENT_COUNT],
    state: SequencerState,
    inputs: EncoderPhase,
    output: bool,
    pending: u8,
    enabled: u8,
    running: bool,
}

impl EventEngine {
    /// A halted, unprogrammed engine with both inputs released.
    pub const fn new() -> Self {
        Self::at(EncoderPhase::IDLE)
    }

    /// A halted, unprogrammed engine whose inputs start at `inputs`.
    pub const fn at(inputs: EncoderPhase) -> Self {
        Self {
            events: [None; EVENT_COUNT],
            state: SequencerState::Idle,
            inputs,
            output: false,
            pending: 0,
            enabled: 0,
            running: false,
        }
    }

    /// Present new input levels to the engine.
    ///
    /// Edges are evaluated channel A first, then channel B, each against the
    /// state left by the previous one. Returns the number of transitions
    /// that requested the completion interrupt; the caller services each
    /// one. When both inputs change at once the two transitions always run
    /// in the same direction, so the output level is valid for both.
    pub fn drive(&mut self, inputs: EncoderPhase) -> u8 {
        let previous = self.inputs;
        self.inputs = inputs;
        if !self.running {
            return 0;
        }

        let mut requested = 0;
        for channel in [Channel::A, Channel::B] {
            let was = previous.is_engaged(channel);
            let now = inputs.is_engaged(channel);
            if was == now {
                continue;
            }
            let edge = if now { Edge::Rising } else { Edge::Falling };
            if let Some(flag) = self.fire(Trigger::new(channel, edge)) {
                if flag & self.enabled != 0 {
                    requested += 1;
                }
            }
        }
        requested
    }

    /// Run the event enabled for `trigger` in the current state, if any,
    /// and return its flag bit.
    fn fire(&mut self, trigger: Trigger) -> Option<u8> {
        let state = self.state;
        let (index, event) = self
            .events
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|event| (index, event)))
            .find(|(_, event)| event.fires_on(state, trigger))?;

        let flag = 1 << index;
        self.state = event.to;
        self.output = event.action.level();
        self.pending |= flag;
        Some(flag)
    }

    /// Current engine state.
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Input levels last presented to [`drive()`](Self::drive).
    pub fn inputs(&self) -> EncoderPhase {
        self.inputs
    }

    /// Latched event flags.
    pub fn pending(&self) -> u8 {
        self.pending
    }

    /// Events allowed to raise the completion interrupt.
    pub fn enabled_interrupts(&self) -> u8 {
        self.enabled
    }

    /// Direction indicator level; high means counter-clockwise.
    pub fn output_level(&self) -> bool {
        self.output
    }

    /// Whether the engine reacts to input edges.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The event programmed in slot `index`, if any.
    pub fn event(&self, index: usize) -> Option<&SequencerEvent> {
        self.events.get(index).and_then(Option::as_ref)
    }
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerPeripheral for EventEngine {
    fn halt(&mut self) {
        self.running = false;
        self.enabled = 0;
    }

    fn program_event(&mut self, index: usize, event: &SequencerEvent) {
        if let Some(slot) = self.events.get_mut(index) {
            *slot = Some(*event);
        }
    }

    fn input_phase(&mut self) -> EncoderPhase {
        self.inputs
    }

    fn set_state(&mut self, state: SequencerState) {
        self.state = state;
    }

    fn set_direction_output(&mut self, level: bool) {
        self.output = level;
    }

    fn direction_output(&mut self) -> bool {
        self.output
    }

    fn clear_event_flags(&mut self) {
        self.pending = 0;
    }

    fn enable_event_interrupts(&mut self, mask: u8) {
        self.enabled = mask;
    }

    fn start(&mut self) {
        self.running = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::SEQUENCER_GRAPH;

    fn programmed() -> EventEngine {
        programmed_at(EncoderPhase::IDLE)
    }

    fn programmed_at(inputs: EncoderPhase) -> EventEngine {
        let mut engine = EventEngine::at(inputs);
        engine.set_state(SequencerState::from_phase(inputs));
        for (index, event) in SEQUENCER_GRAPH.iter() {
            engine.program_event(index, event);
        }
        engine.enable_event_interrupts(SEQUENCER_GRAPH.event_mask());
        engine.start();
        engine
    }

    #[test]
    fn halted_engine_only_tracks_inputs() {
        let mut engine = EventEngine::new();
        assert_eq!(engine.drive(EncoderPhase::A_ONLY), 0);
        assert_eq!(engine.inputs(), EncoderPhase::A_ONLY);
        assert_eq!(engine.state(), SequencerState::Idle);
        assert_eq!(engine.pending(), 0);
    }

    #[test]
    fn clockwise_edge_latches_event_and_clears_output() {
        let mut engine = programmed();
        engine.set_direction_output(true);

        assert_eq!(engine.drive(EncoderPhase::A_ONLY), 1);
        assert_eq!(engine.state(), SequencerState::MidForward);
        assert_eq!(engine.pending(), 1 << 0);
        assert!(!engine.output_level());
    }

    #[test]
    fn counter_clockwise_edge_sets_output() {
        let mut engine = programmed();
        assert_eq!(engine.drive(EncoderPhase::B_ONLY), 1);
        assert_eq!(engine.state(), SequencerState::MidReverse);
        assert_eq!(engine.pending(), 1 << 1);
        assert!(engine.output_level());
    }

    #[test]
    fn event_outside_its_state_does_not_fire() {
        let mut engine = programmed();
        engine.set_state(SequencerState::Engaged);

        // A rising is only enabled in Idle and MidReverse.
        assert_eq!(engine.drive(EncoderPhase::A_ONLY), 0);
        assert_eq!(engine.state(), SequencerState::Engaged);
        assert_eq!(engine.pending(), 0);
    }

    #[test]
    fn masked_events_latch_without_interrupt() {
        let mut engine = programmed();
        engine.enable_event_interrupts(0);
        assert_eq!(engine.drive(EncoderPhase::A_ONLY), 0);
        assert_eq!(engine.pending(), 1);
    }

    #[test]
    fn double_edge_requests_both_transitions() {
        let mut engine = programmed();
        assert_eq!(engine.drive(EncoderPhase::ENGAGED), 2);
        assert_eq!(engine.state(), SequencerState::Engaged);
        assert_eq!(engine.pending(), (1 << 0) | (1 << 3));
    }

    #[test]
    fn double_edge_transitions_share_a_direction() {
        for bits in 0..4 {
            let start = EncoderPhase::from_bits(bits);
            let target = EncoderPhase::from_bits(bits ^ 0b11);
            let mut engine = programmed_at(start);

            let levels = [Channel::A, Channel::B].map(|channel| {
                let edge = if start.is_engaged(channel) {
                    Edge::Falling
                } else {
                    Edge::Rising
                };
                assert!(engine.fire(Trigger::new(channel, edge)).is_some());
                engine.output_level()
            });
            assert_eq!(levels[0], levels[1]);
            assert_eq!(engine.state().phase(), target);
        }
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut engine = EventEngine::new();
        engine.program_event(EVENT_COUNT, &SEQUENCER_GRAPH.events[0]);
        assert!((0..EVENT_COUNT).all(|i| engine.event(i).is_none()));
        assert_eq!(engine.event(EVENT_COUNT), None);
    }
}
