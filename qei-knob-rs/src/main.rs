//! qei-knob
//!
//! Rotary-encoder knob firmware for the Raspberry Pi Pico 2. Wires one of
//! the `qei-decoder` backends to two GPIO inputs and reports the position:
//!
//! 1. The knob is turned and the A/B channels change level.
//! 2. The decoder task wakes on the pin edge and feeds the backend, which
//!    folds committed steps into the shared `StepCounter`.
//! 3. The readout task wakes on its frame ticker, polls the step API and
//!    logs the absolute position and the last non-zero offset.
//! 4. Pressing the push-button re-zeroes the position.
//!
//! The default build uses the edge-interrupt backend (one count per
//! detent). With `--features sequencer` the knob is decoded by the event
//! engine backend instead (four counts per detent, scaled back to detents
//! by the step API).
//!
//! The RP2350 has no state/event peripheral wired to these pins, so the
//! `sequencer` build runs the graph in the software `EventEngine`: the CPU
//! still wakes on every edge and nothing is offloaded to hardware. It
//! exercises the sequencer backend end to end, but a real offload needs a
//! `SequencerPeripheral` backed by hardware, for example a PIO state
//! machine.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Input, Pull};
use embassy_time::{Duration, Ticker, Timer};
use {defmt_rtt as _, panic_probe as _};

use qei_decoder::{DecoderConfig, Polarity, StepCounter, Steps};

#[cfg(not(feature = "sequencer"))]
use qei_decoder::{Channel, EdgeDecoder, EdgeOutcome};
#[cfg(feature = "sequencer")]
use qei_decoder::{read_phase, EventEngine, SequencerDecoder};

// ---------------------------------------------------------------------------
// Boot block
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Common-to-ground encoder on pull-ups.
const DECODER_CONFIG: DecoderConfig = DecoderConfig {
    polarity: Polarity::ActiveLow,
    invert_direction: false,
};

/// One readout frame.
const READOUT_PERIOD: Duration = Duration::from_millis(50);

/// How long the button must stay down to count as a press.
const BUTTON_DEBOUNCE: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

/// Step count shared between the decoder task and the readout task.
static STEP_COUNTER: StepCounter = StepCounter::new();

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Backend built into this image.
#[cfg(not(feature = "sequencer"))]
type Backend = EdgeDecoder<'static, Input<'static>, Input<'static>>;
#[cfg(feature = "sequencer")]
type Backend = SequencerDecoder<'static, EventEngine>;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Edge-interrupt decoding.
///
/// Waits for a level change on either channel and hands it to the decoder,
/// which reads both pins and commits at most one step per detent.
#[cfg(not(feature = "sequencer"))]
#[embassy_executor::task]
async fn decoder_task(mut decoder: Backend) {
    info!("Edge decoder task started");

    loop {
        let channel = {
            let (pin_a, pin_b) = decoder.pins_mut();
            match select(pin_a.wait_for_any_edge(), pin_b.wait_for_any_edge()).await {
                Either::First(()) => Channel::A,
                Either::Second(()) => Channel::B,
            }
        };

        match decoder.on_edge(channel) {
            Ok(EdgeOutcome::Rejected(_)) => {
                debug!("Detent rejected, {} so far", decoder.stats().rejected);
            }
            Ok(_) => {}
            Err(e) => error!("{}", e),
        }
    }
}

/// Event-engine decoding.
///
/// Presents every input change to the engine and services the completion
/// interrupt once for each transition it ran. One wake can carry two edges
/// when both channels change before the task polls.
#[cfg(feature = "sequencer")]
#[embassy_executor::task]
async fn decoder_task(
    mut pin_a: Input<'static>,
    mut pin_b: Input<'static>,
    mut decoder: Backend,
) {
    info!("Sequencer decoder task started");

    loop {
        select(pin_a.wait_for_any_edge(), pin_b.wait_for_any_edge()).await;

        let phase = match read_phase(&mut pin_a, &mut pin_b, DECODER_CONFIG.polarity) {
            Ok(phase) => phase,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        for _ in 0..decoder.peripheral_mut().drive(phase) {
            decoder.on_transition_complete();
        }
    }
}

/// Application loop: one step-API poll per frame, plus the reset button.
///
/// Only this task owns a `Steps`, so the offset cursor has a single
/// consumer.
#[embassy_executor::task]
async fn readout_task(mut button: Input<'static>) {
    info!("Readout task started");

    let mut steps = Steps::for_backend::<Backend>(&STEP_COUNTER);
    let mut ticker = Ticker::every(READOUT_PERIOD);
    let mut last_offset = 0;

    loop {
        match select(ticker.next(), button.wait_for_falling_edge()).await {
            Either::First(()) => {
                let offset = steps.offset_step();
                if offset == 0 {
                    continue;
                }
                last_offset = offset;
                info!("ABS {}  OFFSET {}", steps.absolute_step(), last_offset);
            }
            Either::Second(()) => {
                Timer::after(BUTTON_DEBOUNCE).await;
                if button.is_high() {
                    // Bounce, not a press.
                    continue;
                }

                steps.reset_step_to_zero();
                info!("ABS {}  OFFSET {} (reset)", steps.absolute_step(), last_offset);
                last_offset = 0;

                button.wait_for_high().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("qei-knob starting");

    // —— Pin assignments ————————————————————————————————————————————————————
    // ENC_A  → GP2  (p.PIN_2)  active-low, pull-up enabled
    // ENC_B  → GP3  (p.PIN_3)  active-low, pull-up enabled
    // BUTTON → GP4  (p.PIN_4)  active-low, pull-up enabled
    // ———————————————————————————————————————————————————————————————————————

    let pin_a = Input::new(p.PIN_2, Pull::Up);
    let pin_b = Input::new(p.PIN_3, Pull::Up);
    let button = Input::new(p.PIN_4, Pull::Up);

    // —— Decoder initialisation —————————————————————————————————————————————

    #[cfg(not(feature = "sequencer"))]
    {
        // Seeds the tracker from the live pins so the first edge after boot
        // is judged against the real resting phase.
        let decoder = unwrap!(EdgeDecoder::new(pin_a, pin_b, &STEP_COUNTER, DECODER_CONFIG));
        info!("Edge decoder seeded at phase {}", decoder.tracker().previous());
        spawner.spawn(unwrap!(decoder_task(decoder)));
    }

    #[cfg(feature = "sequencer")]
    {
        let (mut pin_a, mut pin_b) = (pin_a, pin_b);
        let inputs = unwrap!(read_phase(&mut pin_a, &mut pin_b, DECODER_CONFIG.polarity));
        let decoder =
            SequencerDecoder::configure(EventEngine::at(inputs), &STEP_COUNTER, DECODER_CONFIG);
        info!("Event engine configured in state {}", decoder.peripheral().state());
        spawner.spawn(unwrap!(decoder_task(pin_a, pin_b, decoder)));
    }

    // —— Spawn readout ——————————————————————————————————————————————————————

    spawner.spawn(unwrap!(readout_task(button)));

    info!("All tasks spawned");
}
