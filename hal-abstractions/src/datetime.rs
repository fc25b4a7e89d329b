//! Calendar timestamp shared by drivers, providers and callers
//!
//! Always UTC. There is no timezone field and no day-of-week; drivers that
//! need a weekday register derive it themselves.

/// Calendar date and time with an optional millisecond phase
///
/// `millis == 0` means the sub-second phase is unknown or was not provided.
/// Plain value type: copy it around, nothing owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    /// Absolute year, e.g. 2025
    pub year: u16,
    /// Month (1-12)
    pub month: u8,
    /// Day of month (1-31, depending on month and leap year)
    pub day: u8,
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
    /// Millisecond phase (0-999, 0 = not provided)
    pub millis: u16,
}

impl DateTime {
    /// Base used by free-running clocks before any correction: 2000-01-01 00:00:00.000
    pub const DEFAULT_EPOCH: DateTime = DateTime::new(2000, 1, 1, 0, 0, 0);

    /// Create a whole-second timestamp (millisecond phase 0)
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millis: 0,
        }
    }

    /// Same date and time with the given millisecond phase
    pub const fn with_millis(mut self, millis: u16) -> Self {
        self.millis = millis;
        self
    }

    /// Same date and time with the sub-second phase dropped
    pub const fn whole_seconds(self) -> Self {
        self.with_millis(0)
    }
}

impl Default for DateTime {
    fn default() -> Self {
        Self::DEFAULT_EPOCH
    }
}

impl core::fmt::Display for DateTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.millis
        )
    }
}
