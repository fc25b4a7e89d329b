//! Wall clock facade
//!
//! [`WallClock`] picks its provider once, at the first successful
//! [`start`](WallClock::start): the RTC edge provider when hardware was
//! supplied and it comes up, the free-running uptime provider otherwise.
//! Every later call is forwarded to that provider. An optional
//! [`CorrectionSource`] (typically an SNTP exchange, see
//! [`calendar::from_ntp`]) can be applied with [`WallClock::sync`].

use core::convert::Infallible;
use embedded_hal::delay::DelayNs;

use crate::binding::{EdgeBinding, EdgeStats};
use crate::config::ClockConfig;
use crate::edge::EdgeProvider;
use crate::provider::TimeProvider;
use crate::uptime::UptimeProvider;
use crate::{calendar, info, warn};
use crate::{
    ClockError, DateTime, EdgeHandler, EdgeInterrupt, EdgeTrigger, ProviderKind, RtcDevice,
    SquareWave, TickCounter, TimeStatus,
};

/// External reference time, e.g. the result of an SNTP exchange
///
/// Must not block indefinitely.
pub trait CorrectionSource {
    /// Current UTC time, or `None` if it could not be obtained
    fn fetch_utc(&mut self) -> Option<DateTime>;
}

impl<F> CorrectionSource for F
where
    F: FnMut() -> Option<DateTime>,
{
    fn fetch_utc(&mut self) -> Option<DateTime> {
        self()
    }
}

/// Correction type for clocks without a correction source
pub type NoCorrection = fn() -> Option<DateTime>;

/// Placeholder hardware type for clocks built without an RTC
///
/// Uninhabited: no value of it can exist, so none of its methods can run.
#[derive(Debug)]
pub enum Absent {}

impl RtcDevice for Absent {
    type Error = Infallible;

    fn probe(&mut self) -> Result<(), Self::Error> {
        match *self {}
    }

    fn datetime(&mut self) -> Result<DateTime, Self::Error> {
        match *self {}
    }

    fn set_datetime(&mut self, _datetime: &DateTime) -> Result<(), Self::Error> {
        match *self {}
    }

    fn lost_power(&mut self) -> Result<bool, Self::Error> {
        match *self {}
    }

    fn set_square_wave(&mut self, _frequency: SquareWave) -> Result<(), Self::Error> {
        match *self {}
    }
}

impl EdgeInterrupt for Absent {
    type Error = Infallible;

    fn attach(
        &mut self,
        _handler: &'static dyn EdgeHandler,
        _trigger: EdgeTrigger,
    ) -> Result<(), Self::Error> {
        match *self {}
    }

    fn detach(&mut self) {
        match *self {}
    }
}

impl DelayNs for Absent {
    fn delay_ns(&mut self, _ns: u32) {
        match *self {}
    }
}

/// Everything the RTC edge provider needs besides the tick counter
pub struct EdgeHardware<R, I, D> {
    pub rtc: R,
    pub irq: I,
    /// Used for the bind poll
    pub delay: D,
    pub binding: &'static EdgeBinding,
}

/// Correction sync bookkeeping
///
/// Timestamps are raw readings of the uptime provider's counter. Use a
/// millisecond counter there (see [`WallClock::with_uptime_counter`]) to keep
/// them unambiguous for about 49.7 days instead of one fast-counter wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncTelemetry {
    pub ever_synced: bool,
    pub last_ok: bool,
    pub last_attempt: Option<u32>,
    pub last_success: Option<u32>,
}

/// Provider-selecting facade
///
/// `C` drives the RTC edge provider and wants a fast rate for the millisecond
/// phase. `U` drives the uptime fallback and the sync telemetry; it defaults
/// to `C` but a slow counter wraps far less often.
pub struct WallClock<R, I, D, C, F, U = C>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter + Clone,
    F: CorrectionSource,
    U: TickCounter,
{
    config: ClockConfig,
    counter: C,
    hardware: Option<EdgeHardware<R, I, D>>,
    rtc: Option<EdgeProvider<R, I, D, C>>,
    uptime: UptimeProvider<U>,
    active: ProviderKind,
    correction: Option<F>,
    telemetry: SyncTelemetry,
}

/// Wall clock without RTC hardware
pub type UptimeClock<C, F = NoCorrection> = WallClock<Absent, Absent, Absent, C, F>;

impl<R, I, D, C, F> WallClock<R, I, D, C, F>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter + Clone,
    F: CorrectionSource,
{
    /// One counter for both providers
    pub fn new(
        counter: C,
        config: ClockConfig,
        hardware: Option<EdgeHardware<R, I, D>>,
        correction: Option<F>,
    ) -> Self {
        let uptime_counter = counter.clone();
        Self::with_uptime_counter(counter, uptime_counter, config, hardware, correction)
    }
}

impl<R, I, D, C, F, U> WallClock<R, I, D, C, F, U>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter + Clone,
    F: CorrectionSource,
    U: TickCounter,
{
    /// Separate counter for the uptime fallback and the sync telemetry
    pub fn with_uptime_counter(
        counter: C,
        uptime_counter: U,
        config: ClockConfig,
        hardware: Option<EdgeHardware<R, I, D>>,
        correction: Option<F>,
    ) -> Self {
        Self {
            config,
            uptime: UptimeProvider::new(uptime_counter),
            counter,
            hardware,
            rtc: None,
            active: ProviderKind::None,
            correction,
            telemetry: SyncTelemetry::default(),
        }
    }

    /// Select and start a provider, then optionally sync once
    ///
    /// Only fails if no provider could be started, which the uptime fallback
    /// rules out. Calls after the first success return `Ok` immediately.
    pub fn start(&mut self) -> Result<(), ClockError> {
        if self.active != ProviderKind::None {
            return Ok(());
        }

        if self.rtc.is_none() {
            if let Some(hw) = self.hardware.take() {
                self.rtc = Some(EdgeProvider::new(
                    hw.rtc,
                    hw.irq,
                    hw.delay,
                    self.counter.clone(),
                    hw.binding,
                    self.config.edge,
                ));
            }
        }

        let rtc_started = match self.rtc.as_mut() {
            Some(rtc) => match rtc.start() {
                Ok(()) => true,
                Err(err) => {
                    warn!("RTC provider failed to start: {:?}", err);
                    false
                }
            },
            None => false,
        };

        if rtc_started {
            self.active = ProviderKind::Rtc;
        } else {
            self.uptime.start()?;
            self.active = ProviderKind::Uptime;
        }
        info!("wall clock using {:?} provider", self.active);

        if self.config.sync_on_start && self.correction.is_some() {
            // start() succeeds regardless of the correction outcome
            let _ = self.sync();
        }
        Ok(())
    }

    pub fn now(&mut self) -> Result<DateTime, ClockError> {
        match self.active {
            ProviderKind::Rtc => self.rtc.as_mut().ok_or(ClockError::NotStarted)?.now(),
            ProviderKind::Uptime => self.uptime.now(),
            ProviderKind::None => Err(ClockError::NotStarted),
        }
    }

    pub fn adjust(&mut self, datetime: &DateTime) -> Result<(), ClockError> {
        match self.active {
            ProviderKind::Rtc => self
                .rtc
                .as_mut()
                .ok_or(ClockError::NotStarted)?
                .adjust(datetime),
            ProviderKind::Uptime => self.uptime.adjust(datetime),
            ProviderKind::None => Err(ClockError::NotStarted),
        }
    }

    pub fn status(&self) -> TimeStatus {
        match (self.active, self.rtc.as_ref()) {
            (ProviderKind::Rtc, Some(rtc)) => rtc.status(),
            (ProviderKind::Uptime, _) => self.uptime.status(),
            _ => TimeStatus::NotStarted,
        }
    }

    /// Fetch a reference time from the correction source and apply it
    ///
    /// A fetched time that the active provider rejects still counts as a
    /// failed attempt.
    pub fn sync(&mut self) -> Result<(), ClockError> {
        if self.active == ProviderKind::None {
            return Err(ClockError::NotStarted);
        }
        let Some(correction) = self.correction.as_mut() else {
            return Err(ClockError::CorrectionUnavailable);
        };

        let attempt = self.uptime.counter().now();
        self.telemetry.last_attempt = Some(attempt);

        let Some(reference) = correction.fetch_utc() else {
            self.telemetry.last_ok = false;
            warn!("correction source returned no time");
            return Err(ClockError::CorrectionFailed);
        };

        if let Err(err) = self.adjust(&reference) {
            self.telemetry.last_ok = false;
            warn!("applying correction {} failed: {:?}", reference, err);
            return Err(err);
        }

        self.telemetry.ever_synced = true;
        self.telemetry.last_ok = true;
        self.telemetry.last_success = Some(attempt);
        info!("clock corrected to {}", reference);
        Ok(())
    }

    pub fn active_provider(&self) -> ProviderKind {
        self.active
    }

    pub fn telemetry(&self) -> SyncTelemetry {
        self.telemetry
    }

    /// True only while the RTC provider is active and edge-bound
    pub fn is_bound(&self) -> bool {
        match (self.active, self.rtc.as_ref()) {
            (ProviderKind::Rtc, Some(rtc)) => rtc.is_bound(),
            _ => false,
        }
    }

    /// Edge counters of the RTC provider, if one was constructed
    pub fn edge_stats(&self) -> Option<EdgeStats> {
        self.rtc.as_ref().map(EdgeProvider::edge_stats)
    }

    /// Seconds since 1970-01-01 UTC
    pub fn now_unix(&mut self) -> Result<u64, ClockError> {
        self.now().map(|t| calendar::to_unix(&t))
    }
}

impl<C, F> WallClock<Absent, Absent, Absent, C, F>
where
    C: TickCounter + Clone,
    F: CorrectionSource,
{
    /// Clock that always runs from the tick counter
    pub fn uptime_only(counter: C, config: ClockConfig, correction: Option<F>) -> Self {
        Self::new(counter, config, None, correction)
    }
}

impl<R, I, D, C, F, U> TimeProvider for WallClock<R, I, D, C, F, U>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter + Clone,
    F: CorrectionSource,
    U: TickCounter,
{
    fn start(&mut self) -> Result<(), ClockError> {
        WallClock::start(self)
    }

    fn now(&mut self) -> Result<DateTime, ClockError> {
        WallClock::now(self)
    }

    fn adjust(&mut self, datetime: &DateTime) -> Result<(), ClockError> {
        WallClock::adjust(self, datetime)
    }

    fn status(&self) -> TimeStatus {
        WallClock::status(self)
    }
}
