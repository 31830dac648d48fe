//! Ingestion loop: packet source → registry.
//!
//! Each packet heats both ends of the flow by the full packet size.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crate::registry::HeatRegistry;
use crate::source::{PacketSource, SourceEvent};

/// Counters kept by the ingestion loop.
#[derive(Debug, Default)]
pub struct IngestStats {
    packets: AtomicU64,
    skipped: AtomicU64,
    bytes: AtomicU64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets that produced registry updates.
    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    /// Frames dropped for lack of a usable network-layer address.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Total size of all ingested packets.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Pull events from `source` into `registry` until the source runs dry or
/// `stop` is raised.
pub fn run_ingest<S: PacketSource + ?Sized>(
    source: &mut S,
    registry: &HeatRegistry,
    stop: &AtomicBool,
    stats: &IngestStats,
) {
    log::info!("ingesting from {}", source.name());
    while !stop.load(Ordering::Relaxed) {
        match source.next_event() {
            Some(SourceEvent::Packet(ev)) => {
                let size = ev.size as u64;
                registry.record_traffic(&ev.source.to_string(), size);
                registry.record_traffic(&ev.destination.to_string(), size);
                stats.packets.fetch_add(1, Ordering::Relaxed);
                stats.bytes.fetch_add(size, Ordering::Relaxed);
            }
            Some(SourceEvent::Skipped(reason)) => {
                log::trace!("skipped frame: {reason}");
                stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Some(SourceEvent::Idle) => {}
            None => {
                log::info!("{} exhausted", source.name());
                break;
            }
        }
    }
}

/// Run [`run_ingest`] on its own thread, taking ownership of the source.
pub fn spawn_ingest(
    mut source: Box<dyn PacketSource>,
    registry: Arc<HeatRegistry>,
    stop: Arc<AtomicBool>,
    stats: Arc<IngestStats>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("netheat-ingest".into())
        .spawn(move || run_ingest(&mut source, &registry, &stop, &stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{PacketEvent, SkipReason};
    use std::net::{IpAddr, Ipv4Addr};

    struct Scripted {
        events: Vec<SourceEvent>,
    }

    impl PacketSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn next_event(&mut self) -> Option<SourceEvent> {
            if self.events.is_empty() {
                None
            } else {
                Some(self.events.remove(0))
            }
        }
    }

    fn v4(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn packet(src: u8, dst: u8, size: usize) -> SourceEvent {
        SourceEvent::Packet(PacketEvent::new(v4(src), v4(dst), size))
    }

    #[test]
    fn packets_heat_both_ends() {
        let reg = HeatRegistry::new(1_000_000.0);
        let stats = IngestStats::new();
        let mut src = Scripted {
            events: vec![packet(1, 2, 100), packet(1, 3, 50)],
        };
        run_ingest(&mut src, &reg, &AtomicBool::new(false), &stats);

        assert_eq!(reg.heat("10.0.0.1"), Some(150.0));
        assert_eq!(reg.heat("10.0.0.2"), Some(100.0));
        assert_eq!(reg.heat("10.0.0.3"), Some(50.0));
        assert_eq!(stats.packets(), 2);
        assert_eq!(stats.bytes(), 150);
    }

    #[test]
    fn skipped_and_idle_events_do_not_touch_registry() {
        let reg = HeatRegistry::new(1_000_000.0);
        let stats = IngestStats::new();
        let mut src = Scripted {
            events: vec![
                SourceEvent::Skipped(SkipReason::NotIp),
                SourceEvent::Idle,
                SourceEvent::Skipped(SkipReason::Truncated),
            ],
        };
        run_ingest(&mut src, &reg, &AtomicBool::new(false), &stats);
        assert!(reg.is_empty());
        assert_eq!(stats.skipped(), 2);
        assert_eq!(stats.packets(), 0);
    }

    #[test]
    fn self_traffic_counts_twice() {
        let reg = HeatRegistry::new(1_000_000.0);
        let mut src = Scripted {
            events: vec![packet(7, 7, 10)],
        };
        run_ingest(&mut src, &reg, &AtomicBool::new(false), &IngestStats::new());
        assert_eq!(reg.heat("10.0.0.7"), Some(20.0));
    }

    #[test]
    fn raised_stop_flag_prevents_reads() {
        let reg = HeatRegistry::new(1_000_000.0);
        let mut src = Scripted {
            events: vec![packet(1, 2, 100)],
        };
        run_ingest(&mut src, &reg, &AtomicBool::new(true), &IngestStats::new());
        assert!(reg.is_empty());
        assert_eq!(src.events.len(), 1);
    }

    #[test]
    fn spawned_ingest_finishes_with_source() {
        let reg = Arc::new(HeatRegistry::new(1_000_000.0));
        let stats = Arc::new(IngestStats::new());
        let handle = spawn_ingest(
            Box::new(Scripted {
                events: vec![packet(1, 2, 64); 10],
            }),
            Arc::clone(&reg),
            Arc::new(AtomicBool::new(false)),
            Arc::clone(&stats),
        )
        .unwrap();
        handle.join().unwrap();
        assert_eq!(stats.packets(), 10);
        assert_eq!(reg.heat("10.0.0.2"), Some(640.0));
    }
}
