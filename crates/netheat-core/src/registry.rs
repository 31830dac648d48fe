//! Thread-safe per-address heat store.
//!
//! Locking:
//! 1. A coarse `RwLock` guards the key set. Only inserting a new address or
//!    evicting an idle one takes it exclusively.
//! 2. Each entry has its own `Mutex`, so updates to different addresses never
//!    wait on each other.
//! 3. Whole-map passes ([`HeatRegistry::decay_all`], [`HeatRegistry::snapshot`])
//!    clone the entry handles under the shared lock and release it before
//!    locking any entry. A first-sight insert waits for that copy only.
//!    Callers sort and format without holding any lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::config::HeatConfig;

/// One address and its heat at the moment a snapshot was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatEntry {
    pub address: String,
    pub heat: f64,
}

impl HeatEntry {
    pub fn new(address: impl Into<String>, heat: f64) -> Self {
        Self {
            address: address.into(),
            heat,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    heat: f64,
    /// Consecutive decay ticks spent at zero.
    idle_ticks: u32,
}

impl Slot {
    fn add(&mut self, amount: f64, cap: f64) {
        self.heat = (self.heat + amount).clamp(0.0, cap);
        self.idle_ticks = 0;
    }

    fn decay(&mut self, rate: f64) {
        self.heat = (self.heat - rate).max(0.0);
        if self.heat == 0.0 {
            self.idle_ticks = self.idle_ticks.saturating_add(1);
        } else {
            self.idle_ticks = 0;
        }
    }

    fn is_idle(&self, limit: u32) -> bool {
        self.heat == 0.0 && self.idle_ticks >= limit
    }
}

type SlotHandle = Arc<Mutex<Slot>>;

/// Shared map of address → heat, clamped to `[0, cap]`.
#[derive(Debug)]
pub struct HeatRegistry {
    entries: RwLock<HashMap<String, SlotHandle>>,
    cap: f64,
    evict_after: Option<u32>,
}

impl HeatRegistry {
    /// Create an empty registry. Entries are never evicted.
    pub fn new(cap: f64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            // NaN.max(0.0) is 0.0, so a garbage cap degrades to "always zero".
            cap: cap.max(0.0),
            evict_after: None,
        }
    }

    /// Create a registry from [`HeatConfig`], including its eviction policy.
    pub fn with_config(config: &HeatConfig) -> Self {
        Self::new(config.max_heat).evict_after(config.evict_after)
    }

    /// Remove entries that stay at zero heat for `ticks` consecutive decay passes.
    pub fn evict_after(mut self, ticks: Option<u32>) -> Self {
        self.evict_after = ticks.map(|t| t.max(1));
        self
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    /// Add `byte_count` to the heat of `address`, creating the entry on first sight.
    pub fn record_traffic(&self, address: &str, byte_count: u64) {
        let amount = byte_count as f64;
        {
            let map = self.read();
            if let Some(slot) = map.get(address) {
                lock(slot).add(amount, self.cap);
                return;
            }
        }

        // Another producer may have inserted between the two locks;
        // `entry` makes sure only one slot ever exists per address.
        let mut map = self.write();
        let slot = map
            .entry(address.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(Slot::default())));
        lock(slot).add(amount, self.cap);
    }

    /// Subtract `rate` from every entry, flooring at zero.
    ///
    /// Returns the number of entries evicted by this pass (always 0 when
    /// eviction is disabled).
    pub fn decay_all(&self, rate: f64) -> usize {
        let rate = rate.max(0.0);
        let mut idle = Vec::new();
        for (address, slot) in self.handles() {
            let mut slot = lock(&slot);
            slot.decay(rate);
            if self.evict_after.is_some_and(|limit| slot.is_idle(limit)) {
                idle.push(address);
            }
        }

        match self.evict_after {
            Some(limit) if !idle.is_empty() => self.evict(&idle, limit),
            _ => 0,
        }
    }

    fn evict(&self, candidates: &[String], limit: u32) -> usize {
        let mut map = self.write();
        let mut evicted = 0;
        for address in candidates {
            // Traffic may have revived the entry since the read pass.
            let still_idle = map
                .get(address)
                .is_some_and(|slot| lock(slot).is_idle(limit));
            if still_idle {
                map.remove(address);
                evicted += 1;
            }
        }
        if evicted > 0 {
            log::debug!("evicted {evicted} idle addresses");
        }
        evicted
    }

    /// Copy every entry out of the registry.
    ///
    /// The key set is read under one shared lock, so the result never holds
    /// duplicates or half-inserted entries. Order is unspecified.
    pub fn snapshot(&self) -> Vec<HeatEntry> {
        self.handles()
            .into_iter()
            .map(|(address, slot)| {
                let heat = lock(&slot).heat;
                HeatEntry::new(address, heat)
            })
            .collect()
    }

    /// Clone every entry handle, then drop the map lock.
    fn handles(&self) -> Vec<(String, SlotHandle)> {
        self.read()
            .iter()
            .map(|(address, slot)| (address.clone(), Arc::clone(slot)))
            .collect()
    }

    /// Current heat of a single address.
    pub fn heat(&self, address: &str) -> Option<f64> {
        self.read().get(address).map(|slot| lock(slot).heat)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SlotHandle>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SlotHandle>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
