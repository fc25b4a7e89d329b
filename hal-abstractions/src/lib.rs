//! Hardware abstraction traits for the edge-clock time engine
//!
//! This crate defines the capabilities the time engine consumes from a board:
//! a battery-backed RTC chip, a free-running tick counter and an interrupt
//! line wired to the RTC's square-wave output. BSPs implement these traits.
//!
//! It also carries the calendar value type shared by every layer, an
//! edge-source registration table for use from interrupt handlers, and a
//! DS3231 driver over `embedded-hal` I2C.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), deny(warnings))]

pub mod counter;
pub mod datetime;
pub mod ds3231;
pub mod irq;
pub mod rtc;

pub use counter::TickCounter;
pub use datetime::DateTime;
pub use ds3231::{Ds3231, Ds3231Error};
pub use irq::{
    EdgeHandler, EdgeInterrupt, EdgeRegistry, EdgeSource, EdgeTrigger, RegistryEdge, RegistryError,
};
pub use rtc::{RtcDevice, SquareWave};
