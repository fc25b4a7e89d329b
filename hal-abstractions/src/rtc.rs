//! Battery-backed RTC chip capability

use crate::DateTime;

/// Square-wave output frequency of an RTC chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWave {
    /// Output disabled (pin used as alarm interrupt, or left idle)
    Off,
    /// 1 Hz, one edge per second
    Hz1,
    /// 1.024 kHz
    Hz1024,
    /// 4.096 kHz
    Hz4096,
    /// 8.192 kHz
    Hz8192,
}

/// Bus-attached real-time clock
///
/// Every method is a bus transaction. Whole seconds only; the chip has no
/// notion of a sub-second phase, so `millis` is ignored on write and zero on
/// read.
pub trait RtcDevice {
    /// Bus or device error
    type Error: core::fmt::Debug;

    /// Check the chip answers on the bus
    fn probe(&mut self) -> Result<(), Self::Error>;

    /// Read the current whole-second time
    fn datetime(&mut self) -> Result<DateTime, Self::Error>;

    /// Set the time and clear the power-loss flag
    fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), Self::Error>;

    /// Whether the oscillator stopped (backup power lost) since the last `set_datetime`
    fn lost_power(&mut self) -> Result<bool, Self::Error>;

    /// Program the square-wave output
    fn set_square_wave(&mut self, frequency: SquareWave) -> Result<(), Self::Error>;
}
