//! Clock error types

/// Clock operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// RTC absent, unresponsive, or no edge within the bind timeout
    NoDevice,
    /// Provider or clock not started
    NotStarted,
    /// RTC bus transaction failed
    Bus,
    /// Edge interrupt could not be attached
    Interrupt,
    /// Date/time fields out of range
    InvalidTime,
    /// No correction source configured
    CorrectionUnavailable,
    /// Correction source returned no time
    CorrectionFailed,
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoDevice => write!(f, "RTC not available"),
            Self::NotStarted => write!(f, "Clock not started"),
            Self::Bus => write!(f, "RTC bus error"),
            Self::Interrupt => write!(f, "Edge interrupt unavailable"),
            Self::InvalidTime => write!(f, "Invalid date/time"),
            Self::CorrectionUnavailable => write!(f, "No correction source"),
            Self::CorrectionFailed => write!(f, "Correction fetch failed"),
        }
    }
}

impl core::error::Error for ClockError {}
