//! Free-running tick counter

/// Monotonic, free-running hardware counter
///
/// The counter wraps at `u32::MAX`; consumers only ever look at differences
/// taken with `wrapping_sub`, so a wrap between two readings is harmless as
/// long as less than one full period elapses.
pub trait TickCounter {
    /// Current counter reading
    fn now(&self) -> u32;

    /// Counter rate in ticks per second (non-zero)
    fn ticks_per_second(&self) -> u32;
}

impl<T: TickCounter + ?Sized> TickCounter for &T {
    fn now(&self) -> u32 {
        (**self).now()
    }

    fn ticks_per_second(&self) -> u32 {
        (**self).ticks_per_second()
    }
}
