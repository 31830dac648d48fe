//! Tunables for heat accumulation and decay.

use std::time::Duration;

/// Heat at which tier-one bars are full and tier-two bars start growing.
pub const MAX_BYTES: f64 = 150_000.0;

/// Upper clamp for any entry's heat. Also the point where labels read `MAX`.
pub const MAX_HEAT: f64 = 1_000_000.0;

/// Heat removed from every entry on each decay tick.
pub const DECAY_RATE: f64 = 500.0;

/// Time between decay ticks.
pub const DECAY_INTERVAL: Duration = Duration::from_millis(500);

/// Time between chart redraws.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(5);

/// Interface captured when none is given on the command line.
pub const DEFAULT_INTERFACE: &str = "en0";

/// Bytes captured per frame.
pub const SNAP_LEN: usize = 1600;

/// Registry and decay settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatConfig {
    /// Clamp applied on every mutation.
    pub max_heat: f64,
    /// Heat subtracted per tick.
    pub decay_rate: f64,
    /// Tick period for the decay worker.
    pub decay_interval: Duration,
    /// Drop entries that sat at zero heat for this many consecutive ticks.
    /// `None` keeps every address for the life of the process.
    pub evict_after: Option<u32>,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            max_heat: MAX_HEAT,
            decay_rate: DECAY_RATE,
            decay_interval: DECAY_INTERVAL,
            evict_after: None,
        }
    }
}
