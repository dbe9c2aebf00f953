//! Hardware-sequencer decoder.
//!
//! A programmable state/event peripheral tracks the encoder phase on its
//! own: it is loaded once with [`SEQUENCER_GRAPH`], follows the input edges
//! without CPU involvement and drives a direction output on every
//! transition. The CPU only services the completion interrupt, reading that
//! output and folding one count into the [`StepCounter`].
//!
//! Every transition counts, so this backend reports 4 counts per detent and
//! has no bounce rejection: noise that forms a valid-looking transition is
//! counted.

mod engine;
mod graph;

pub use engine::EventEngine;
pub use graph::{
    Edge, OutputAction, SequencerEvent, SequencerGraph, SequencerState, Trigger, EVENT_COUNT,
    SEQUENCER_GRAPH,
};

use crate::config::DecoderConfig;
use crate::counter::StepCounter;
use crate::decoder::QuadratureDecoder;
use crate::phase::{Direction, EncoderPhase};

/// Register-level access to a state/event engine peripheral.
///
/// Implementations map these onto the device's registers; inputs must be
/// routed so that a logical "rising" edge means the channel engages.
/// Register writes cannot fail, so the methods are infallible.
pub trait SequencerPeripheral {
    /// Stop the engine and mask all event interrupts.
    fn halt(&mut self);

    /// Program event slot `index` with `event`.
    fn program_event(&mut self, index: usize, event: &SequencerEvent);

    /// Current logical levels of the two inputs.
    fn input_phase(&mut self) -> EncoderPhase;

    /// Force the engine's current state.
    fn set_state(&mut self, state: SequencerState);

    /// Force the direction indicator output level.
    fn set_direction_output(&mut self, level: bool);

    /// Read back the direction indicator output level.
    fn direction_output(&mut self) -> bool;

    /// Acknowledge all pending event flags.
    fn clear_event_flags(&mut self);

    /// Raise the completion interrupt for the events in `mask`.
    fn enable_event_interrupts(&mut self, mask: u8);

    /// Let the engine run.
    fn start(&mut self);
}

/// Quadrature decoder backed by a [`SequencerPeripheral`].
///
/// # Example
///
/// ```
/// use qei_decoder::{
///     DecoderConfig, Direction, EncoderPhase, EventEngine, Rotation, SequencerDecoder,
///     StepCounter, Steps,
/// };
///
/// let counter = StepCounter::new();
/// let mut decoder =
///     SequencerDecoder::configure(EventEngine::new(), &counter, DecoderConfig::default());
/// let mut steps = Steps::for_backend::<SequencerDecoder<EventEngine>>(&counter);
///
/// for phase in Rotation::detents(EncoderPhase::IDLE, Direction::Clockwise, 2) {
///     for _ in 0..decoder.peripheral_mut().drive(phase) {
///         decoder.on_transition_complete();
///     }
/// }
/// assert_eq!(counter.load(), 8);
/// assert_eq!(steps.offset_step(), 2);
/// ```
pub struct SequencerDecoder<'a, P> {
    peripheral: P,
    config: DecoderConfig,
    counter: &'a StepCounter,
    interrupts: u32,
}

impl<'a, P> SequencerDecoder<'a, P>
where
    P: SequencerPeripheral,
{
    /// One-time setup of the peripheral.
    ///
    /// Programs the eight transitions of [`SEQUENCER_GRAPH`], seeds the
    /// engine state from the live inputs so start-up does not look like a
    /// transition, assumes forward on the direction output, clears stale
    /// event flags and arms the completion interrupt for every event.
    pub fn configure(mut peripheral: P, counter: &'a StepCounter, config: DecoderConfig) -> Self {
        peripheral.halt();

        for (index, event) in SEQUENCER_GRAPH.iter() {
            peripheral.program_event(index, event);
        }

        let initial = peripheral.input_phase();
        let state = SequencerState::from_phase(initial);
        peripheral.set_state(state);
        peripheral.set_direction_output(OutputAction::Clear.level());

        peripheral.clear_event_flags();
        peripheral.enable_event_interrupts(SEQUENCER_GRAPH.event_mask());
        peripheral.start();

        #[cfg(feature = "defmt")]
        defmt::debug!("sequencer configured, initial state {}", state);

        Self {
            peripheral,
            config,
            counter,
            interrupts: 0,
        }
    }

    /// Service the completion interrupt, once per executed transition.
    ///
    /// Acknowledges the event flags first, so a spurious re-entry finds
    /// nothing pending, then counts one step in the direction the output
    /// reports. Returns the direction counted.
    pub fn on_transition_complete(&mut self) -> Direction {
        self.peripheral.clear_event_flags();
        self.interrupts = self.interrupts.wrapping_add(1);

        let mut direction = OutputAction::direction_of(self.peripheral.direction_output());
        if self.config.invert_direction {
            direction = direction.reversed();
        }
        let _count = self.counter.advance(direction);

        #[cfg(feature = "defmt")]
        defmt::trace!("sequencer transition {}, count={}", direction, _count);

        direction
    }

    /// Completion interrupts serviced so far.
    pub fn interrupts(&self) -> u32 {
        self.interrupts
    }

    /// The underlying peripheral.
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Mutable access to the peripheral, e.g. to feed a software model.
    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    /// Stop the engine and give the peripheral back.
    pub fn free(mut self) -> P {
        self.peripheral.halt();
        self.peripheral
    }
}

impl<P> QuadratureDecoder for SequencerDecoder<'_, P> {
    const COUNTS_PER_DETENT: i32 = 4;

    fn counter(&self) -> &StepCounter {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Rotation;
    use crate::steps::Steps;

    fn turn(
        decoder: &mut SequencerDecoder<'_, EventEngine>,
        phases: impl IntoIterator<Item = EncoderPhase>,
    ) {
        for phase in phases {
            for _ in 0..decoder.peripheral_mut().drive(phase) {
                decoder.on_transition_complete();
            }
        }
    }

    fn configured(counter: &StepCounter, start: EncoderPhase) -> SequencerDecoder<'_, EventEngine> {
        let config = DecoderConfig::default();
        SequencerDecoder::configure(EventEngine::at(start), counter, config)
    }

    #[test]
    fn configure_programs_the_graph_and_arms_interrupts() {
        let counter = StepCounter::new();
        let decoder = configured(&counter, EncoderPhase::IDLE);
        let engine = decoder.peripheral();

        for (index, event) in SEQUENCER_GRAPH.iter() {
            assert_eq!(engine.event(index), Some(event));
        }
        assert_eq!(engine.enabled_interrupts(), 0xFF);
        assert_eq!(engine.pending(), 0);
        assert!(engine.is_running());
        assert!(!engine.output_level());
    }

    #[test]
    fn configure_seeds_state_from_inputs() {
        let counter = StepCounter::new();
        let mut decoder = configured(&counter, EncoderPhase::ENGAGED);
        assert_eq!(decoder.peripheral().state(), SequencerState::Engaged);

        // Finishing the detent from the midpoint: two clockwise transitions.
        turn(&mut decoder, [EncoderPhase::B_ONLY, EncoderPhase::IDLE]);
        assert_eq!(counter.load(), 2);
        assert_eq!(decoder.interrupts(), 2);
    }

    #[test]
    fn counts_four_per_detent() {
        let counter = StepCounter::new();
        let mut decoder = configured(&counter, EncoderPhase::IDLE);

        turn(&mut decoder, Rotation::detents(EncoderPhase::IDLE, Direction::Clockwise, 3));
        assert_eq!(counter.load(), 12);

        turn(&mut decoder, Rotation::detents(EncoderPhase::IDLE, Direction::CounterClockwise, 5));
        assert_eq!(counter.load(), -8);
        assert_eq!(decoder.raw_count(), -8);
    }

    #[test]
    fn steps_api_reports_detents() {
        let counter = StepCounter::new();
        let mut decoder = configured(&counter, EncoderPhase::IDLE);
        let mut steps = Steps::for_backend::<SequencerDecoder<EventEngine>>(&counter);

        turn(&mut decoder, Rotation::detents(EncoderPhase::IDLE, Direction::Clockwise, 3));
        assert_eq!(steps.absolute_step(), 3);
        assert_eq!(steps.offset_step(), 3);

        turn(&mut decoder, Rotation::detents(EncoderPhase::IDLE, Direction::CounterClockwise, 1));
        assert_eq!(steps.absolute_step(), 2);
        assert_eq!(steps.offset_step(), -1);
        assert_eq!(steps.offset_step(), 0);

        steps.reset_step(5);
        assert_eq!(steps.absolute_step(), 5);
        assert_eq!(counter.load(), 20);
        assert_eq!(steps.offset_step(), 0);
    }

    #[test]
    fn merged_edges_still_count_every_transition() {
        let counter = StepCounter::new();
        let mut decoder = configured(&counter, EncoderPhase::IDLE);
        let mut steps = Steps::for_backend::<SequencerDecoder<EventEngine>>(&counter);

        // Clockwise detent whose first two edges arrive together.
        turn(&mut decoder, [EncoderPhase::ENGAGED, EncoderPhase::B_ONLY, EncoderPhase::IDLE]);
        assert_eq!(decoder.peripheral().state(), SequencerState::Idle);
        assert_eq!(decoder.interrupts(), 4);
        assert_eq!(counter.load(), 4);
        assert_eq!(steps.absolute_step(), 1);
        assert_eq!(steps.offset_step(), 1);

        // Counter-clockwise, last two edges together.
        turn(&mut decoder, [EncoderPhase::B_ONLY, EncoderPhase::A_ONLY, EncoderPhase::IDLE]);
        assert_eq!(counter.load(), 0);
        assert_eq!(steps.offset_step(), -1);
    }

    #[test]
    fn bounce_is_counted_but_nets_out() {
        let counter = StepCounter::new();
        let mut decoder = configured(&counter, EncoderPhase::IDLE);

        // A chatters: rise (cw), fall (ccw), rise (cw).
        turn(&mut decoder, [EncoderPhase::A_ONLY, EncoderPhase::IDLE, EncoderPhase::A_ONLY]);
        assert_eq!(decoder.interrupts(), 3);
        assert_eq!(counter.load(), 1);
    }

    #[test]
    fn spurious_reentry_still_reads_output() {
        let counter = StepCounter::new();
        let mut decoder = configured(&counter, EncoderPhase::IDLE);

        turn(&mut decoder, [EncoderPhase::B_ONLY]);
        assert_eq!(counter.load(), -1);
        assert_eq!(decoder.peripheral().pending(), 0);

        // Flags already clear; nothing new is pending in the engine.
        assert_eq!(decoder.peripheral_mut().drive(EncoderPhase::B_ONLY), 0);
        assert_eq!(counter.load(), -1);
    }

    #[test]
    fn inverted_direction_counts_down_for_clockwise() {
        let counter = StepCounter::new();
        let config = DecoderConfig {
            invert_direction: true,
            ..DecoderConfig::default()
        };
        let mut decoder = SequencerDecoder::configure(EventEngine::new(), &counter, config);
        turn(&mut decoder, Rotation::detents(EncoderPhase::IDLE, Direction::Clockwise, 1));
        assert_eq!(counter.load(), -4);
    }

    #[test]
    fn free_halts_the_engine() {
        let counter = StepCounter::new();
        let decoder = configured(&counter, EncoderPhase::IDLE);
        let mut engine = decoder.free();
        assert!(!engine.is_running());
        assert_eq!(engine.drive(EncoderPhase::A_ONLY), 0);
    }
}
