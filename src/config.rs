//! Decoder configuration.

/// Electrical polarity of the encoder channel inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// A channel is engaged when its pin reads LOW (common-to-ground
    /// encoder with pull-ups).
    #[default]
    ActiveLow,
    /// A channel is engaged when its pin reads HIGH.
    ActiveHigh,
}

impl Polarity {
    /// Translate a raw pin level into "channel engaged".
    pub fn is_engaged(self, pin_high: bool) -> bool {
        match self {
            Polarity::ActiveLow => !pin_high,
            Polarity::ActiveHigh => pin_high,
        }
    }
}

/// Settings shared by both decoder backends.
///
/// The default matches the reference board: active-low channels, clockwise
/// counts up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderConfig {
    /// Pin polarity, used by backends that read the channels directly.
    pub polarity: Polarity,
    /// Swap clockwise and counter-clockwise (mirrored A/B wiring).
    pub invert_direction: bool,
}
