//! Clock configuration structures

use edge_clock_hal::EdgeTrigger;

/// RTC edge provider configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeProviderConfig {
    /// Square-wave transition the interrupt fires on
    pub trigger: EdgeTrigger,
    /// Program the RTC to a 1 Hz square wave on start
    pub enable_square_wave: bool,
    /// Maximum wait for an edge when binding, in milliseconds (0 = wait forever)
    pub bind_timeout_ms: u16,
    /// Fail start/adjust when no edge arrives in time (otherwise soft start)
    pub require_bind: bool,
}

impl Default for EdgeProviderConfig {
    fn default() -> Self {
        Self {
            trigger: EdgeTrigger::Rising,
            enable_square_wave: true,
            bind_timeout_ms: 1500,
            require_bind: true,
        }
    }
}

/// Wall clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Passed to the RTC provider when hardware is present
    pub edge: EdgeProviderConfig,
    /// Run one correction sync inside `start()` when a source is configured
    pub sync_on_start: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            edge: EdgeProviderConfig::default(),
            sync_on_start: true,
        }
    }
}
