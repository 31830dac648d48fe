//! Periodic heat decay.
//!
//! The scheduler owns nothing but a handle to the registry; each tick is a
//! single [`HeatRegistry::decay_all`] pass, which locks one entry at a time.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::HeatConfig;
use crate::registry::HeatRegistry;

/// Longest uninterrupted sleep, so a stop request is noticed quickly.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Smallest accepted tick period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Largest accepted tick period. Keeps deadline arithmetic on `Instant` in range.
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Drives `decay_all(rate)` on a fixed cadence.
pub struct DecayScheduler {
    registry: Arc<HeatRegistry>,
    rate: f64,
    interval: Duration,
}

impl DecayScheduler {
    pub fn new(registry: Arc<HeatRegistry>, rate: f64, interval: Duration) -> Self {
        Self {
            registry,
            rate,
            interval: interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
        }
    }

    pub fn from_config(registry: Arc<HeatRegistry>, config: &HeatConfig) -> Self {
        Self::new(registry, config.decay_rate, config.decay_interval)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one decay pass now. Returns the number of evicted entries.
    pub fn tick(&self) -> usize {
        self.registry.decay_all(self.rate)
    }

    /// Start the decay worker thread. It runs until `stop` is set.
    pub fn spawn(self, stop: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("netheat-decay".into())
            .spawn(move || self.run(&stop))
    }

    fn deadline_after(&self, from: Instant) -> Instant {
        from.checked_add(self.interval)
            .or_else(|| from.checked_add(POLL_SLICE))
            .unwrap_or(from)
    }

    fn run(&self, stop: &AtomicBool) {
        log::debug!(
            "decay worker started: {} every {:?}",
            self.rate,
            self.interval
        );
        let mut next = self.deadline_after(Instant::now());
        while !stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next {
                thread::sleep((next - now).min(POLL_SLICE));
                continue;
            }
            self.tick();
            next = self.deadline_after(next);
            // Fell behind (suspended laptop, stalled thread): don't replay missed ticks.
            if next < now {
                next = self.deadline_after(now);
            }
        }
        log::debug!("decay worker stopped");
    }
}
