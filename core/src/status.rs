//! Provider health and selection

/// Provider health
///
/// Advisory only: queries stay callable in every state and report their own
/// failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeStatus {
    /// Serving valid time
    Ok,
    /// `start()` has not succeeded yet
    #[default]
    NotStarted,
    /// RTC reported backup power loss; sticky until the next successful `adjust()`
    LostPower,
    /// RTC absent, unresponsive, or never delivered a required edge
    NoDevice,
}

impl TimeStatus {
    /// Healthy and serving time
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Serving time, possibly of doubtful accuracy
    pub fn serves_time(self) -> bool {
        matches!(self, Self::Ok | Self::LostPower)
    }
}

/// Which provider a [`WallClock`](crate::WallClock) selected at start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProviderKind {
    /// Not started
    #[default]
    None,
    /// RTC with square-wave edge binding
    Rtc,
    /// Free-running tick counter
    Uptime,
}
