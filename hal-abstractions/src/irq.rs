//! Edge interrupt plumbing
//!
//! An RTC square-wave pin fires an interrupt on every edge. The interrupt
//! handler must not touch the RTC bus; all it does is hand the current tick
//! counter reading to whatever [`EdgeHandler`] is attached to that pin.
//!
//! Instead of a single hidden global slot, handlers are handed to the
//! platform explicitly through [`EdgeInterrupt::attach`]. Boards that route
//! several edge sources through one vector can keep them in an
//! [`EdgeRegistry`], keyed by [`EdgeSource`], and call
//! [`EdgeRegistry::dispatch`] from the ISR.
//!
//! ```no_run
//! # use edge_clock_hal::{EdgeRegistry, EdgeSource};
//! static EDGES: EdgeRegistry<2> = EdgeRegistry::new();
//! const SQW_PIN: EdgeSource = EdgeSource(2);
//!
//! // inside the EXTI2 handler
//! # let ticks = 0u32;
//! EDGES.dispatch(SQW_PIN, ticks);
//! ```

use core::cell::RefCell;
use critical_section::Mutex;
use heapless::Vec;

/// Receives hardware edges, called from interrupt context
///
/// Implementations must be short and must not block or perform bus I/O.
pub trait EdgeHandler: Sync {
    /// An edge occurred; `ticks` is the tick counter captured by the ISR
    fn on_edge(&self, ticks: u32);
}

/// Which transition of the square wave counts as the edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeTrigger {
    /// Low-to-high transition
    #[default]
    Rising,
    /// High-to-low transition
    Falling,
}

/// Platform interrupt attach/detach for one edge source
pub trait EdgeInterrupt {
    /// Attach failure (pin not interrupt capable, source already taken, ...)
    type Error: core::fmt::Debug;

    /// Route edges of this source to `handler` and enable the interrupt
    fn attach(
        &mut self,
        handler: &'static dyn EdgeHandler,
        trigger: EdgeTrigger,
    ) -> Result<(), Self::Error>;

    /// Disable the interrupt and forget the handler
    fn detach(&mut self);
}

/// Identity of an edge source (EXTI line, GPIO number, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeSource(pub u8);

/// Registry operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// A handler is already registered for this source
    SourceBusy,
    /// No free slot left
    Full,
}

impl core::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SourceBusy => write!(f, "Edge source already has a handler"),
            Self::Full => write!(f, "Edge registry full"),
        }
    }
}

impl core::error::Error for RegistryError {}

type Slot = (EdgeSource, &'static dyn EdgeHandler);

/// Table of edge handlers keyed by source, safe to share with interrupt context
///
/// At most one handler per source.
pub struct EdgeRegistry<const N: usize> {
    slots: Mutex<RefCell<Vec<Slot, N>>>,
}

impl<const N: usize> EdgeRegistry<N> {
    /// Empty registry, usable in a `static`
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Register `handler` for `source`
    pub fn register(
        &self,
        source: EdgeSource,
        handler: &'static dyn EdgeHandler,
    ) -> Result<(), RegistryError> {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow(cs).borrow_mut();
            if slots.iter().any(|(s, _)| *s == source) {
                return Err(RegistryError::SourceBusy);
            }
            slots
                .push((source, handler))
                .map_err(|_| RegistryError::Full)
        })
    }

    /// Remove the handler for `source`; returns whether one was registered
    pub fn unregister(&self, source: EdgeSource) -> bool {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow(cs).borrow_mut();
            match slots.iter().position(|(s, _)| *s == source) {
                Some(index) => {
                    slots.swap_remove(index);
                    true
                }
                None => false,
            }
        })
    }

    /// Whether `source` has a handler
    pub fn is_registered(&self, source: EdgeSource) -> bool {
        critical_section::with(|cs| {
            self.slots
                .borrow(cs)
                .borrow()
                .iter()
                .any(|(s, _)| *s == source)
        })
    }

    /// Forward an edge to the handler for `source`; call this from the ISR
    ///
    /// Returns `false` if no handler is registered (the edge is dropped).
    pub fn dispatch(&self, source: EdgeSource, ticks: u32) -> bool {
        let handler = critical_section::with(|cs| {
            self.slots
                .borrow(cs)
                .borrow()
                .iter()
                .find(|(s, _)| *s == source)
                .map(|(_, h)| *h)
        });
        match handler {
            Some(handler) => {
                handler.on_edge(ticks);
                true
            }
            None => false,
        }
    }
}

impl<const N: usize> Default for EdgeRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// [`EdgeInterrupt`] backed by an [`EdgeRegistry`] slot
///
/// Attaching registers the handler under `source`; the board still enables
/// the pin interrupt with the requested polarity (see [`Self::trigger`]) and
/// calls [`EdgeRegistry::dispatch`] from its ISR.
pub struct RegistryEdge<const N: usize> {
    registry: &'static EdgeRegistry<N>,
    source: EdgeSource,
    trigger: Option<EdgeTrigger>,
}

impl<const N: usize> RegistryEdge<N> {
    pub const fn new(registry: &'static EdgeRegistry<N>, source: EdgeSource) -> Self {
        Self {
            registry,
            source,
            trigger: None,
        }
    }

    /// Polarity requested by the last successful attach
    pub fn trigger(&self) -> Option<EdgeTrigger> {
        self.trigger
    }

    pub fn source(&self) -> EdgeSource {
        self.source
    }
}

impl<const N: usize> EdgeInterrupt for RegistryEdge<N> {
    type Error = RegistryError;

    fn attach(
        &mut self,
        handler: &'static dyn EdgeHandler,
        trigger: EdgeTrigger,
    ) -> Result<(), Self::Error> {
        self.registry.register(self.source, handler)?;
        self.trigger = Some(trigger);
        Ok(())
    }

    fn detach(&mut self) {
        self.registry.unregister(self.source);
        self.trigger = None;
    }
}
