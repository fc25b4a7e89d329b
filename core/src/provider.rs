//! Common time provider interface

use crate::{ClockError, DateTime, TimeStatus};

/// A source of UTC wall-clock time
///
/// Implemented by [`EdgeProvider`](crate::EdgeProvider),
/// [`UptimeProvider`](crate::UptimeProvider) and the
/// [`WallClock`](crate::WallClock) facade itself.
pub trait TimeProvider {
    /// Bring the provider up; may block while binding to a hardware edge
    fn start(&mut self) -> Result<(), ClockError>;

    /// Current UTC time, with the millisecond phase when known
    fn now(&mut self) -> Result<DateTime, ClockError>;

    /// Set the current time
    fn adjust(&mut self, datetime: &DateTime) -> Result<(), ClockError>;

    /// Health of the provider
    fn status(&self) -> TimeStatus;
}
