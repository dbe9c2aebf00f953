//! The contract shared by both decoder backends.

use crate::counter::StepCounter;

/// A quadrature decoder backend.
///
/// Backends own their interrupt-side state and write committed steps into a
/// [`StepCounter`]. The application never calls into the backend directly;
/// it reads the counter through [`Steps`](crate::Steps), which uses
/// [`COUNTS_PER_DETENT`](Self::COUNTS_PER_DETENT) to report whole detents
/// whichever backend was built in.
pub trait QuadratureDecoder {
    /// Raw counts this backend commits for one mechanical detent.
    const COUNTS_PER_DETENT: i32;

    /// The counter this backend writes into.
    fn counter(&self) -> &StepCounter;

    /// Current raw count, at this backend's native resolution.
    fn raw_count(&self) -> i32 {
        self.counter().load()
    }
}
