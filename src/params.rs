//! Tunable simulation parameters.

use crate::consts::*;

use std::time::Duration;

use tracing::level_filters::LevelFilter;

/// Verbosity of the diagnostic [`tracing`] output.
///
/// The simulator emits events unconditionally; drivers translate this knob
/// into a subscriber filter with [`DebugLevel::level_filter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebugLevel {
    /// No diagnostic output.
    #[default]
    Off,
    /// Run-level milestones only.
    Basic,
    /// Per-cycle hazard and scheduling events.
    Detailed,
    /// Full slot and state dumps every cycle.
    Verbose,
}

impl DebugLevel {
    /// The `tracing` filter this level corresponds to.
    pub const fn level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Basic => LevelFilter::INFO,
            Self::Detailed => LevelFilter::DEBUG,
            Self::Verbose => LevelFilter::TRACE,
        }
    }
}

/// Configuration of a simulation and its shared memory controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params {
    /// Shared memory size in byte addresses.
    pub memory_size: usize,
    /// Number of cores, each running on its own worker.
    pub num_cores: usize,
    /// Number of pipelined threads scheduled round-robin within a core.
    pub threads_per_core: usize,
    /// Entry capacity of the write-through cache.
    pub cache_capacity: usize,
    /// Whether the controller counts reads, writes, and cache hits.
    pub stats_enabled: bool,
    /// Diagnostic verbosity.
    pub debug: DebugLevel,
    /// Delay inserted between cycles of each core worker.
    pub cycle_delay: Option<Duration>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            memory_size: MEMORY_SIZE,
            num_cores: NUM_CORES,
            threads_per_core: NUM_THREADS_PER_CORE,
            cache_capacity: CACHE_CAPACITY,
            stats_enabled: false,
            debug: DebugLevel::Off,
            cycle_delay: None,
        }
    }
}
