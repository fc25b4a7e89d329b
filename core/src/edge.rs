//! RTC time provider bound to the square-wave edge
//!
//! # Binding
//!
//! The RTC is programmed for a 1 Hz square wave and the edge interrupt is
//! routed to an [`EdgeBinding`]. `start()` and `adjust()` wait for one edge,
//! read the RTC seconds once over the bus and pair them with the counter
//! reading the ISR captured at that edge. From then on the ISR keeps the pair
//! current and [`EdgeProvider::now`] reconstructs time, including the
//! millisecond phase, from the tick counter alone.
//!
//! # Soft start
//!
//! With `require_bind == false`, a bind timeout is not fatal. The provider
//! serves whole seconds read over the bus on every `now()` until an edge
//! shows up, then binds on the next `now()`. A started provider whose rebind
//! in `adjust()` times out reports `NoDevice` and keeps serving the same way.

use embedded_hal::delay::DelayNs;

use crate::binding::{EdgeBinding, EdgeStats};
use crate::config::EdgeProviderConfig;
use crate::provider::TimeProvider;
use crate::{calendar, debug, info, warn};
use crate::{ClockError, DateTime, EdgeInterrupt, RtcDevice, SquareWave, TickCounter, TimeStatus};

/// Bind poll interval
const BIND_POLL_MS: u32 = 1;

/// Outcome of a blocking bind attempt
enum Bind {
    Bound,
    TimedOut,
}

/// Hardware-edge time provider
///
/// The interrupt is attached on the first successful `start()` and detached
/// on drop.
pub struct EdgeProvider<R, I, D, C>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter,
{
    rtc: R,
    irq: I,
    delay: D,
    counter: C,
    binding: &'static EdgeBinding,
    config: EdgeProviderConfig,
    status: TimeStatus,
    attached: bool,
    started: bool,
    /// Edge sequence number when soft start began
    soft_seq: u32,
}

impl<R, I, D, C> EdgeProvider<R, I, D, C>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter,
{
    pub fn new(
        rtc: R,
        irq: I,
        delay: D,
        counter: C,
        binding: &'static EdgeBinding,
        config: EdgeProviderConfig,
    ) -> Self {
        Self {
            rtc,
            irq,
            delay,
            counter,
            binding,
            config,
            status: TimeStatus::NotStarted,
            attached: false,
            started: false,
            soft_seq: 0,
        }
    }

    /// Whether `now()` is reconstructing time from the edge binding
    pub fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }

    pub fn edge_stats(&self) -> EdgeStats {
        self.binding.stats()
    }

    pub fn config(&self) -> &EdgeProviderConfig {
        &self.config
    }

    fn fail(&mut self, err: ClockError) -> ClockError {
        self.status = TimeStatus::NoDevice;
        err
    }

    /// Wait for an edge, then bind it to the RTC second read right after it
    ///
    /// Retries the read if another edge lands before the binding is
    /// committed, so the pair always describes one edge.
    fn bind(&mut self) -> Result<Bind, ClockError> {
        let tps = self.counter.ticks_per_second().max(1);
        let timeout_ticks = u64::from(self.config.bind_timeout_ms) * u64::from(tps) / 1000;
        let seen = self.binding.snapshot().edge_seq;
        // summed per poll: the timeout may span more than one counter wrap
        let mut waited: u64 = 0;
        let mut last = self.counter.now();

        loop {
            let snap = self.binding.snapshot();
            if snap.edge_seq != seen {
                let datetime = self.rtc.datetime().map_err(|_| ClockError::Bus)?;
                let unix = calendar::to_unix(&datetime);
                if self.binding.bind(snap.edge_seq, unix, snap.last_edge_ticks) {
                    debug!("edge bound at {} ({} edges)", datetime, snap.edge_seq);
                    return Ok(Bind::Bound);
                }
                continue;
            }

            let now = self.counter.now();
            waited += u64::from(now.wrapping_sub(last));
            last = now;
            if self.config.bind_timeout_ms != 0 && waited >= timeout_ticks {
                return Ok(Bind::TimedOut);
            }
            self.delay.delay_ms(BIND_POLL_MS);
        }
    }

    /// Blocking bind followed by the bind policy
    fn bind_or_soft(&mut self) -> Result<(), ClockError> {
        match self.bind()? {
            Bind::Bound => Ok(()),
            Bind::TimedOut => {
                // either way `now()` falls back to bus reads until an edge shows up
                self.soft_seq = self.binding.snapshot().edge_seq;
                if self.config.require_bind {
                    warn!(
                        "no square-wave edge within {} ms",
                        self.config.bind_timeout_ms
                    );
                    Err(ClockError::NoDevice)
                } else {
                    info!("soft start: serving whole seconds from the RTC bus");
                    Ok(())
                }
            }
        }
    }

    /// Late bind from the soft-start read path
    ///
    /// `unix` was read over the bus after edge `before_seq` was observed.
    /// Binding needs an edge since soft start, no edge during the read and a
    /// last edge less than a second old.
    fn try_late_bind(&mut self, before_seq: u32, before_ticks: u32, unix: u64) -> bool {
        if before_seq == self.soft_seq {
            return false;
        }
        let after = self.binding.snapshot();
        if after.edge_seq != before_seq {
            return false;
        }
        let since_edge = self.counter.now().wrapping_sub(before_ticks);
        if since_edge >= after.ticks_per_second {
            return false;
        }
        let bound = self.binding.bind(before_seq, unix, before_ticks);
        if bound {
            info!("late edge bind after soft start");
            if self.status == TimeStatus::NoDevice {
                self.status = TimeStatus::Ok;
            }
        }
        bound
    }
}

impl<R, I, D, C> TimeProvider for EdgeProvider<R, I, D, C>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter,
{
    fn start(&mut self) -> Result<(), ClockError> {
        if self.rtc.probe().is_err() {
            warn!("RTC did not answer probe");
            return Err(self.fail(ClockError::NoDevice));
        }

        if self.config.enable_square_wave && self.rtc.set_square_wave(SquareWave::Hz1).is_err() {
            return Err(self.fail(ClockError::Bus));
        }

        self.binding.reset(self.counter.ticks_per_second());

        if !self.attached {
            if self.irq.attach(self.binding, self.config.trigger).is_err() {
                warn!("square-wave interrupt attach failed");
                return Err(self.fail(ClockError::Interrupt));
            }
            self.attached = true;
        }

        if let Err(err) = self.bind_or_soft() {
            return Err(self.fail(err));
        }

        let lost_power = match self.rtc.lost_power() {
            Ok(lost) => lost,
            Err(_) => return Err(self.fail(ClockError::Bus)),
        };
        self.status = if lost_power {
            warn!("RTC lost power; time is unreliable until adjusted");
            TimeStatus::LostPower
        } else {
            TimeStatus::Ok
        };
        self.started = true;
        info!(
            "RTC provider started (bound: {}, status: {:?})",
            self.is_bound(),
            self.status
        );
        Ok(())
    }

    fn now(&mut self) -> Result<DateTime, ClockError> {
        if !self.started {
            return Err(ClockError::NotStarted);
        }

        let snap = self.binding.snapshot();
        if let Some((unix, millis)) = snap.time_at(self.counter.now()) {
            return Ok(calendar::from_unix(unix).with_millis(millis));
        }

        // soft start: one bus read, no sub-second phase
        let datetime = self
            .rtc
            .datetime()
            .map_err(|_| ClockError::Bus)?
            .whole_seconds();
        let unix = calendar::to_unix(&datetime);
        if self.try_late_bind(snap.edge_seq, snap.last_edge_ticks, unix) {
            if let Some((unix, millis)) = self.binding.snapshot().time_at(self.counter.now()) {
                return Ok(calendar::from_unix(unix).with_millis(millis));
            }
        }
        Ok(datetime)
    }

    fn adjust(&mut self, datetime: &DateTime) -> Result<(), ClockError> {
        if !calendar::is_valid(datetime) {
            return Err(ClockError::InvalidTime);
        }
        if !self.attached {
            return Err(ClockError::NotStarted);
        }

        self.rtc
            .set_datetime(&datetime.whole_seconds())
            .map_err(|_| ClockError::Bus)?;
        self.binding.unbind();

        // a failed rebind leaves a started provider serving bus reads
        if let Err(err) = self.bind_or_soft() {
            return Err(self.fail(err));
        }
        self.status = TimeStatus::Ok;
        self.started = true;
        info!("RTC adjusted to {}", datetime.whole_seconds());
        Ok(())
    }

    fn status(&self) -> TimeStatus {
        self.status
    }
}

impl<R, I, D, C> Drop for EdgeProvider<R, I, D, C>
where
    R: RtcDevice,
    I: EdgeInterrupt,
    D: DelayNs,
    C: TickCounter,
{
    fn drop(&mut self) {
        if self.attached {
            self.irq.detach();
        }
    }
}
