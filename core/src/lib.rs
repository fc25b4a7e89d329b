//! Platform-agnostic UTC timekeeping for microcontrollers
//!
//! Serves a continuously available, monotonically progressing UTC
//! [`DateTime`] from one of two sources:
//!
//! - [`EdgeProvider`]: a battery-backed RTC whose 1 Hz square-wave edge is
//!   bound to a fast tick counter. After the bind, the current time including
//!   the millisecond phase is reconstructed from the counter alone; the RTC
//!   bus is only touched on bind, on adjust, and in seconds-only soft mode.
//! - [`UptimeProvider`]: the tick counter alone, advanced from a software
//!   base with full calendar rollover.
//!
//! [`WallClock`] picks one of them at start (RTC first, uptime as fallback),
//! optionally applies an external correction (e.g. SNTP) and then delegates.
//!
//! This crate has NO board dependencies; boards implement the traits from
//! `edge-clock-hal` and provide a `critical-section` implementation.
//!
//! ## Usage
//! ```no_run
//! # use edge_clock_core::*;
//! # fn demo<R, I, D, C>(rtc: R, irq: I, delay: D, counter: C)
//! # where R: RtcDevice, I: EdgeInterrupt, D: DelayNs, C: TickCounter + Clone {
//! static SQW_BINDING: EdgeBinding = EdgeBinding::new();
//!
//! let hardware = EdgeHardware { rtc, irq, delay, binding: &SQW_BINDING };
//! let mut clock = WallClock::new(counter, ClockConfig::default(), Some(hardware), None::<NoCorrection>);
//! clock.start().ok();
//! if let Ok(now) = clock.now() {
//!     // now.millis is the sub-second phase once the edge is bound
//! }
//! # }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), deny(warnings))]

pub mod binding;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod edge;
pub mod error;
pub mod provider;
pub mod status;
pub mod uptime;

#[cfg(test)]
mod sim;

pub use binding::{BindingSnapshot, EdgeBinding, EdgeStats};
pub use clock::{Absent, CorrectionSource, EdgeHardware, NoCorrection, SyncTelemetry, UptimeClock, WallClock};
pub use config::{ClockConfig, EdgeProviderConfig};
pub use edge::EdgeProvider;
pub use error::ClockError;
pub use provider::TimeProvider;
pub use status::{ProviderKind, TimeStatus};
pub use uptime::UptimeProvider;

pub use edge_clock_hal::{
    DateTime, EdgeHandler, EdgeInterrupt, EdgeTrigger, RtcDevice, SquareWave, TickCounter,
};
pub use embedded_hal::delay::DelayNs;

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        pub(crate) use log::{debug, info, warn};
    } else if #[cfg(feature = "defmt")] {
        pub(crate) use defmt::{debug, info, warn};
    } else {
        // named apart from the built-in `warn` lint attribute
        macro_rules! discard_log {
            ($($arg:tt)*) => {{ let _ = ::core::format_args!($($arg)*); }};
        }
        pub(crate) use discard_log as debug;
        pub(crate) use discard_log as info;
        pub(crate) use discard_log as warn;
    }
}
