//! Square-wave edge binding shared between the edge ISR and normal context
//!
//! The binding ties a whole UTC second (as Unix seconds) to the tick counter
//! reading captured at the RTC edge that started that second. The ISR keeps it
//! current on every edge; normal context reads it to reconstruct time without
//! touching the RTC bus.
//!
//! The snapshot is wider than any single atomic on the targets this runs on,
//! so every read and write goes through a `critical_section::Mutex`.

use core::cell::Cell;
use critical_section::Mutex;
use edge_clock_hal::EdgeHandler;

/// Consistent copy of the binding state
///
/// Either unbound (`bound == false`, only the edge counters are meaningful)
/// or fully bound, with `base_unix` being the second that began at the edge
/// whose counter reading is `base_ticks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BindingSnapshot {
    pub bound: bool,
    pub base_unix: u64,
    pub base_ticks: u32,
    /// Incremented on every edge, bound or not
    pub edge_seq: u32,
    /// Counter reading at the most recent edge (diagnostic)
    pub last_edge_ticks: u32,
    pub ticks_per_second: u32,
}

impl BindingSnapshot {
    const UNBOUND: Self = Self {
        bound: false,
        base_unix: 0,
        base_ticks: 0,
        edge_seq: 0,
        last_edge_ticks: 0,
        ticks_per_second: 1,
    };

    /// Unix seconds and millisecond phase at counter reading `now_ticks`
    ///
    /// `None` while unbound.
    pub fn time_at(&self, now_ticks: u32) -> Option<(u64, u16)> {
        if !self.bound {
            return None;
        }
        let elapsed = now_ticks.wrapping_sub(self.base_ticks);
        let secs = elapsed / self.ticks_per_second;
        let rem = elapsed % self.ticks_per_second;
        let millis = (u64::from(rem) * 1000 / u64::from(self.ticks_per_second)) as u16;
        Some((self.base_unix + u64::from(secs), millis.min(999)))
    }
}

/// Edge counters for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeStats {
    /// Edges seen since the last reset
    pub edges: u32,
    pub last_edge_ticks: u32,
}

/// Interrupt-shared edge binding
///
/// Place one in a `static` per edge source and hand it to the edge provider;
/// the provider attaches it to the platform interrupt as its [`EdgeHandler`].
pub struct EdgeBinding {
    state: Mutex<Cell<BindingSnapshot>>,
}

impl EdgeBinding {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(BindingSnapshot::UNBOUND)),
        }
    }

    /// Read the whole binding under a brief critical section
    pub fn snapshot(&self) -> BindingSnapshot {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    /// Read-modify-write under a brief critical section
    fn update<T>(&self, f: impl FnOnce(&mut BindingSnapshot) -> T) -> T {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            let out = f(&mut state);
            cell.set(state);
            out
        })
    }

    /// Forget everything and set the counter rate
    pub fn reset(&self, ticks_per_second: u32) {
        self.update(|s| {
            *s = BindingSnapshot {
                ticks_per_second: ticks_per_second.max(1),
                ..BindingSnapshot::UNBOUND
            }
        });
    }

    /// Drop the binding, keep the edge counters
    pub fn unbind(&self) {
        self.update(|s| {
            s.bound = false;
            s.base_unix = 0;
            s.base_ticks = 0;
        });
    }

    /// Bind `unix` to counter reading `ticks`, unless an edge arrived after
    /// `expected_seq` was observed
    ///
    /// Returns whether the binding was committed.
    pub fn bind(&self, expected_seq: u32, unix: u64, ticks: u32) -> bool {
        self.update(|s| {
            if s.edge_seq != expected_seq {
                return false;
            }
            s.bound = true;
            s.base_unix = unix;
            s.base_ticks = ticks;
            true
        })
    }

    /// Edge bookkeeping, the body of the edge ISR
    ///
    /// Whole seconds since the bound edge are floored and clamped to at least
    /// one, so stalled interrupts absorb missed edges and early jitter never
    /// stalls the clock. The base is then re-anchored to this edge.
    pub fn record_edge(&self, ticks: u32) {
        self.update(|s| {
            s.edge_seq = s.edge_seq.wrapping_add(1);
            s.last_edge_ticks = ticks;
            if s.bound {
                let elapsed = ticks.wrapping_sub(s.base_ticks);
                let n = (elapsed / s.ticks_per_second).max(1);
                s.base_unix += u64::from(n);
                s.base_ticks = ticks;
            }
        });
    }

    pub fn is_bound(&self) -> bool {
        self.snapshot().bound
    }

    pub fn stats(&self) -> EdgeStats {
        let s = self.snapshot();
        EdgeStats {
            edges: s.edge_seq,
            last_edge_ticks: s.last_edge_ticks,
        }
    }
}

impl Default for EdgeBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeHandler for EdgeBinding {
    fn on_edge(&self, ticks: u32) {
        self.record_edge(ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TPS: u32 = 1_000_000;

    fn bound_at(unix: u64, ticks: u32) -> EdgeBinding {
        let binding = EdgeBinding::new();
        binding.reset(TPS);
        assert!(binding.bind(0, unix, ticks));
        binding
    }

    #[test]
    fn test_unbound_has_no_time() {
        let binding = EdgeBinding::new();
        binding.reset(TPS);
        assert_eq!(binding.snapshot().time_at(123), None);
        assert!(!binding.is_bound());
    }

    #[test]
    fn test_time_at_splits_seconds_and_millis() {
        let binding = bound_at(1_000, 5_000);
        let snap = binding.snapshot();
        assert_eq!(snap.time_at(5_000), Some((1_000, 0)));
        assert_eq!(snap.time_at(5_000 + 250_000), Some((1_000, 250)));
        assert_eq!(snap.time_at(5_000 + 999_999), Some((1_000, 999)));
        assert_eq!(snap.time_at(5_000 + 1_000_000), Some((1_001, 0)));
    }

    #[test]
    fn test_time_at_across_counter_wrap() {
        let binding = bound_at(50, u32::MAX - 99_999);
        // 100_000 ticks to the wrap, then 400_000 more
        assert_eq!(binding.snapshot().time_at(400_000), Some((50, 500)));
    }

    #[test]
    fn test_edge_advances_by_one() {
        let binding = bound_at(100, 0);
        binding.record_edge(TPS);
        let snap = binding.snapshot();
        assert_eq!(snap.base_unix, 101);
        assert_eq!(snap.base_ticks, TPS);
        assert_eq!(snap.edge_seq, 1);
    }

    #[test]
    fn test_missed_edge_advances_by_two() {
        let binding = bound_at(100, 0);
        binding.record_edge(2 * TPS);
        assert_eq!(binding.snapshot().base_unix, 102);
    }

    #[test]
    fn test_early_edge_clamped_to_one_second() {
        let binding = bound_at(100, 0);
        binding.record_edge(TPS - 40);
        let snap = binding.snapshot();
        assert_eq!(snap.base_unix, 101);
        assert_eq!(snap.base_ticks, TPS - 40);
    }

    #[test]
    fn test_bind_rejected_after_new_edge() {
        let binding = EdgeBinding::new();
        binding.reset(TPS);
        binding.record_edge(10);
        let seen = binding.snapshot().edge_seq;
        binding.record_edge(10 + TPS);
        assert!(!binding.bind(seen, 7, 10));
        assert!(!binding.is_bound());
        assert!(binding.bind(seen + 1, 7, 10 + TPS));
    }

    #[test]
    fn test_unbind_keeps_edge_counters() {
        let binding = bound_at(100, 0);
        binding.on_edge(TPS);
        binding.unbind();
        assert!(!binding.is_bound());
        assert_eq!(
            binding.stats(),
            EdgeStats {
                edges: 1,
                last_edge_ticks: TPS
            }
        );
        // unbound edges only count
        binding.record_edge(2 * TPS);
        assert_eq!(binding.snapshot().base_unix, 0);
        assert_eq!(binding.stats().edges, 2);
    }

    #[test]
    fn test_reset_clamps_rate() {
        let binding = EdgeBinding::new();
        binding.reset(0);
        assert_eq!(binding.snapshot().ticks_per_second, 1);
    }
}
