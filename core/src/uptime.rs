//! Free-running time provider
//!
//! Time is a software base plus the ticks elapsed since the base was anchored
//! to the counter. Whole seconds are folded into the base on every `now()`.
//!
//! Elapsed time is one `wrapping_sub` of the counter, so `now()` must be
//! called at least once per counter wrap: about 71.6 minutes at 1 MHz, about
//! 49.7 days at 1 kHz. Time past a missed wrap is lost. [`WallClock`] can
//! give this provider a slower counter than the RTC provider for that reason
//! (see [`WallClock::with_uptime_counter`]).
//!
//! [`WallClock`]: crate::WallClock
//! [`WallClock::with_uptime_counter`]: crate::WallClock::with_uptime_counter

use crate::provider::TimeProvider;
use crate::{calendar, debug, info};
use crate::{ClockError, DateTime, TickCounter, TimeStatus};

pub struct UptimeProvider<C: TickCounter> {
    counter: C,
    base: DateTime,
    anchor: u32,
    started: bool,
    status: TimeStatus,
}

impl<C: TickCounter> UptimeProvider<C> {
    pub fn new(counter: C) -> Self {
        Self {
            counter,
            base: DateTime::DEFAULT_EPOCH,
            anchor: 0,
            started: false,
            status: TimeStatus::NotStarted,
        }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    fn anchor_to(&mut self, base: DateTime) {
        self.base = base;
        self.anchor = self.counter.now();
        self.started = true;
        self.status = TimeStatus::Ok;
    }
}

impl<C: TickCounter> TimeProvider for UptimeProvider<C> {
    /// Never fails
    fn start(&mut self) -> Result<(), ClockError> {
        self.anchor_to(DateTime::DEFAULT_EPOCH);
        info!("uptime provider started at {}", self.base);
        Ok(())
    }

    fn now(&mut self) -> Result<DateTime, ClockError> {
        if !self.started {
            return Err(ClockError::NotStarted);
        }

        let tps = self.counter.ticks_per_second().max(1);
        let elapsed = self.counter.now().wrapping_sub(self.anchor);
        let secs = elapsed / tps;
        let rem = elapsed % tps;
        if secs > 0 {
            self.base = calendar::add_seconds(&self.base, secs);
            self.anchor = self.anchor.wrapping_add(secs * tps);
        }
        let millis = (u64::from(rem) * 1000 / u64::from(tps)) as u16;
        Ok(self.base.with_millis(millis))
    }

    /// Starts the provider if needed; the millisecond phase is dropped
    fn adjust(&mut self, datetime: &DateTime) -> Result<(), ClockError> {
        if !calendar::is_valid(datetime) {
            return Err(ClockError::InvalidTime);
        }
        if datetime.millis > 999 {
            debug!("ignoring out-of-range millis {}", datetime.millis);
        }
        self.anchor_to(datetime.whole_seconds());
        debug!("uptime provider adjusted to {}", self.base);
        Ok(())
    }

    fn status(&self) -> TimeStatus {
        self.status
    }
}
