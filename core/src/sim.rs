//! Simulated board for host tests
//!
//! One shared [`Board`] holds a tick counter, a DS3231-like RTC and the edge
//! interrupt line. Time only moves when a test (or a provider through
//! [`SimDelay`]) advances it; every whole RTC second fires the attached edge
//! handler when the 1 Hz square wave is enabled.

use std::boxed::Box;
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use edge_clock_hal::{
    DateTime, EdgeHandler, EdgeInterrupt, EdgeTrigger, RtcDevice, SquareWave, TickCounter,
};
use embedded_hal::delay::DelayNs;

use crate::binding::EdgeBinding;
use crate::calendar;

pub const TPS: u32 = 1_000_000;

/// 2025-06-30 12:00:00 UTC
pub const START_UNIX: u64 = 1_751_284_800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimIrqError;

pub struct Board {
    pub ticks: u32,
    pub tps: u32,
    pub rtc_unix: u64,
    /// Counter reading at which the RTC seconds register next increments
    pub next_second: u32,
    pub square_wave: SquareWave,
    pub handler: Option<&'static dyn EdgeHandler>,
    pub trigger: Option<EdgeTrigger>,
    pub rtc_present: bool,
    pub lost_power: bool,
    pub bus_accesses: u32,
    /// Edges to swallow, as if the ISR was stalled
    pub swallow_edges: u32,
    pub attach_fails: bool,
    pub detaches: u32,
    /// Total ticks since the board was built, never wraps
    pub elapsed: u64,
    sub_ns: u64,
}

impl Board {
    pub fn advance(&mut self, ticks: u32) {
        self.elapsed += u64::from(ticks);
        let mut remaining = ticks;
        loop {
            let to_second = self.next_second.wrapping_sub(self.ticks);
            if remaining < to_second {
                self.ticks = self.ticks.wrapping_add(remaining);
                return;
            }
            remaining -= to_second;
            self.ticks = self.next_second;
            self.next_second = self.next_second.wrapping_add(self.tps);
            self.rtc_unix += 1;
            self.edge();
        }
    }

    fn edge(&mut self) {
        if self.square_wave != SquareWave::Hz1 {
            return;
        }
        if let Some(handler) = self.handler {
            if self.swallow_edges > 0 {
                self.swallow_edges -= 1;
            } else {
                handler.on_edge(self.ticks);
            }
        }
    }

    fn bus(&mut self) -> Result<(), SimBusError> {
        self.bus_accesses += 1;
        if self.rtc_present {
            Ok(())
        } else {
            Err(SimBusError)
        }
    }
}

#[derive(Clone)]
pub struct Sim {
    board: Rc<RefCell<Board>>,
}

impl Sim {
    /// RTC at [`START_UNIX`], square wave off, next second `phase_ms` away
    pub fn new(phase_ms: u32) -> Self {
        Self::with_ticks(0, phase_ms)
    }

    pub fn with_ticks(ticks: u32, phase_ms: u32) -> Self {
        Self::build(ticks, TPS, phase_ms)
    }

    /// Counter running at `tps` instead of 1 MHz
    pub fn with_rate(tps: u32, phase_ms: u32) -> Self {
        Self::build(0, tps, phase_ms)
    }

    fn build(ticks: u32, tps: u32, phase_ms: u32) -> Self {
        let board = Board {
            ticks,
            tps,
            rtc_unix: START_UNIX,
            next_second: ticks.wrapping_add(phase_ms * (tps / 1000)),
            square_wave: SquareWave::Off,
            handler: None,
            trigger: None,
            rtc_present: true,
            lost_power: false,
            bus_accesses: 0,
            swallow_edges: 0,
            attach_fails: false,
            detaches: 0,
            elapsed: 0,
            sub_ns: 0,
        };
        Self {
            board: Rc::new(RefCell::new(board)),
        }
    }

    pub fn board(&self) -> RefMut<'_, Board> {
        self.board.borrow_mut()
    }

    pub fn advance_ms(&self, ms: u32) {
        let mut board = self.board();
        let ticks = ms * (board.tps / 1000);
        board.advance(ticks);
    }

    pub fn ticks(&self) -> u32 {
        self.board.borrow().ticks
    }

    pub fn bus_accesses(&self) -> u32 {
        self.board.borrow().bus_accesses
    }

    pub fn counter(&self) -> SimCounter {
        SimCounter(self.board.clone())
    }

    pub fn rtc(&self) -> SimRtc {
        SimRtc(self.board.clone())
    }

    pub fn irq(&self) -> SimIrq {
        SimIrq(self.board.clone())
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.board.clone())
    }

    pub fn millis(&self) -> SimMillis {
        SimMillis(self.board.clone())
    }
}

pub fn leak_binding() -> &'static EdgeBinding {
    Box::leak(Box::new(EdgeBinding::new()))
}

#[derive(Clone)]
pub struct SimCounter(Rc<RefCell<Board>>);

impl TickCounter for SimCounter {
    fn now(&self) -> u32 {
        self.0.borrow().ticks
    }

    fn ticks_per_second(&self) -> u32 {
        self.0.borrow().tps
    }
}

/// 1 kHz counter derived from the board's total elapsed time
#[derive(Clone)]
pub struct SimMillis(Rc<RefCell<Board>>);

impl TickCounter for SimMillis {
    fn now(&self) -> u32 {
        let board = self.0.borrow();
        (board.elapsed * 1000 / u64::from(board.tps)) as u32
    }

    fn ticks_per_second(&self) -> u32 {
        1000
    }
}

pub struct SimRtc(Rc<RefCell<Board>>);

impl RtcDevice for SimRtc {
    type Error = SimBusError;

    fn probe(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().bus()
    }

    fn datetime(&mut self) -> Result<DateTime, Self::Error> {
        let mut board = self.0.borrow_mut();
        board.bus()?;
        Ok(calendar::from_unix(board.rtc_unix))
    }

    fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), Self::Error> {
        let mut board = self.0.borrow_mut();
        board.bus()?;
        board.rtc_unix = calendar::to_unix(datetime);
        board.lost_power = false;
        // writing the seconds register restarts the countdown chain
        board.next_second = board.ticks.wrapping_add(board.tps);
        Ok(())
    }

    fn lost_power(&mut self) -> Result<bool, Self::Error> {
        let mut board = self.0.borrow_mut();
        board.bus()?;
        Ok(board.lost_power)
    }

    fn set_square_wave(&mut self, frequency: SquareWave) -> Result<(), Self::Error> {
        let mut board = self.0.borrow_mut();
        board.bus()?;
        board.square_wave = frequency;
        Ok(())
    }
}

pub struct SimIrq(Rc<RefCell<Board>>);

impl EdgeInterrupt for SimIrq {
    type Error = SimIrqError;

    fn attach(
        &mut self,
        handler: &'static dyn EdgeHandler,
        trigger: EdgeTrigger,
    ) -> Result<(), Self::Error> {
        let mut board = self.0.borrow_mut();
        if board.attach_fails {
            return Err(SimIrqError);
        }
        board.handler = Some(handler);
        board.trigger = Some(trigger);
        Ok(())
    }

    fn detach(&mut self) {
        let mut board = self.0.borrow_mut();
        board.handler = None;
        board.trigger = None;
        board.detaches += 1;
    }
}

pub struct SimDelay(Rc<RefCell<Board>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let mut board = self.0.borrow_mut();
        let total = board.sub_ns + u64::from(ns) * u64::from(board.tps);
        board.sub_ns = total % 1_000_000_000;
        let ticks = (total / 1_000_000_000) as u32;
        board.advance(ticks);
    }
}
