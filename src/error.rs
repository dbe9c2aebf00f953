//! Error types for the decoder.

use core::fmt;

/// Errors surfaced by the decoder backends.
///
/// Bounce, duplicate interrupts and counter overflow are handled inside the
/// decoding algorithm and never show up here. The only failure is the HAL
/// refusing to report a pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderError<E> {
    /// Reading an encoder channel pin failed.
    Pin(E),
}

// Allow ergonomic `?` propagation from raw pin errors.
impl<E> From<E> for DecoderError<E> {
    fn from(error: E) -> Self {
        DecoderError::Pin(error)
    }
}

impl<E: fmt::Debug> fmt::Display for DecoderError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecoderError::Pin(e) => write!(f, "Encoder pin read error: {:?}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for DecoderError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            DecoderError::Pin(e) => defmt::write!(f, "Encoder pin read error: {}", e),
        }
    }
}
