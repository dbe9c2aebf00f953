//! Host-side pin doubles shared by the unit tests.

use core::cell::Cell;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};

use crate::phase::{Channel, EncoderPhase};

/// Raw pin levels of both encoder channels, shared with the pins.
pub struct Levels {
    a_high: Cell<bool>,
    b_high: Cell<bool>,
    fail: Cell<bool>,
}

impl Levels {
    /// Both pins idle high (pull-ups, nothing engaged).
    pub fn new() -> Self {
        Self {
            a_high: Cell::new(true),
            b_high: Cell::new(true),
            fail: Cell::new(false),
        }
    }

    pub fn set_pins(&self, a_high: bool, b_high: bool) {
        self.a_high.set(a_high);
        self.b_high.set(b_high);
    }

    /// Drive the pins so an active-low reader sees `phase`.
    pub fn set_phase(&self, phase: EncoderPhase) {
        self.set_pins(
            !phase.is_engaged(Channel::A),
            !phase.is_engaged(Channel::B),
        );
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail.set(fail);
    }
}

/// An input pin reading one channel of [`Levels`].
pub struct TestPin<'a> {
    levels: &'a Levels,
    channel: Channel,
}

impl<'a> TestPin<'a> {
    pub fn a(levels: &'a Levels) -> Self {
        Self {
            levels,
            channel: Channel::A,
        }
    }

    pub fn b(levels: &'a Levels) -> Self {
        Self {
            levels,
            channel: Channel::B,
        }
    }
}

impl ErrorType for TestPin<'_> {
    type Error = ErrorKind;
}

impl InputPin for TestPin<'_> {
    fn is_high(&mut self) -> Result<bool, ErrorKind> {
        if self.levels.fail.get() {
            return Err(ErrorKind::Other);
        }
        Ok(match self.channel {
            Channel::A => self.levels.a_high.get(),
            Channel::B => self.levels.b_high.get(),
        })
    }

    fn is_low(&mut self) -> Result<bool, ErrorKind> {
        self.is_high().map(|high| !high)
    }
}
