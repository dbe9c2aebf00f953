//! Glitch-tolerant quadrature decoding for mechanical rotary encoders.
//!
//! Two interchangeable backends turn the A/B channels of an encoder into a
//! signed step count:
//!
//! - [`EdgeDecoder`]: software decoder driven by pin-change interrupts.
//!   Collects edge evidence across one detent and commits a single step only
//!   when the sequence is consistent, rejecting contact bounce.
//! - [`SequencerDecoder`]: programs a state/event peripheral
//!   ([`SequencerPeripheral`]) with a 4-state graph and folds each completed
//!   transition into the count. No bounce rejection; 4 counts per detent.
//!
//! Both write into a shared [`StepCounter`] and implement
//! [`QuadratureDecoder`]. The application loop reads the count through
//! [`Steps`], which scales either backend to whole detents.
//!
//! # Quick start
//!
//! ```ignore
//! use qei_decoder::{Channel, DecoderConfig, EdgeDecoder, StepCounter, Steps};
//!
//! static COUNTER: StepCounter = StepCounter::new();
//!
//! // Seeds the previous phase from the live pins.
//! let mut decoder = EdgeDecoder::new(pin_a, pin_b, &COUNTER, DecoderConfig::default())?;
//!
//! // Interrupt path:
//! decoder.on_edge(Channel::A)?;
//!
//! // Application loop:
//! let mut steps = Steps::for_backend::<EdgeDecoder<_, _>>(&COUNTER);
//! let delta = steps.offset_step();
//! ```
//!
//! # Features
//!
//! - **`defmt`**: `defmt::Format` on public types and trace logging of
//!   detent decisions.

#![no_std]

pub use config::{DecoderConfig, Polarity};
pub use counter::StepCounter;
pub use decoder::QuadratureDecoder;
pub use edge::{EdgeDecoder, EdgeEvidence, EdgeOutcome, EdgeStats, EdgeTracker};
pub use error::DecoderError;
pub use phase::{read_phase, Channel, Direction, EncoderPhase, Rotation};
pub use sequencer::{
    Edge, EventEngine, OutputAction, SequencerDecoder, SequencerEvent, SequencerGraph,
    SequencerPeripheral, SequencerState, Trigger, EVENT_COUNT, SEQUENCER_GRAPH,
};
pub use steps::Steps;

mod config;
mod counter;
mod decoder;
mod edge;
mod error;
mod phase;
mod sequencer;
mod steps;

#[cfg(test)]
mod testing;
