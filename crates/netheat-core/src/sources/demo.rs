//! Synthetic traffic for running the chart without capture privileges.
//!
//! A handful of LAN hosts talk to a handful of remote hosts. Remote hosts are
//! picked with skewed weights so the chart shows a stable leader, a few
//! mid-range talkers and a long tail. Every so often a burst of full-size
//! frames pushes one flow past the tier-one threshold.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::source::{PacketEvent, PacketSource, SourceEvent};

const LAN_HOSTS: [Ipv4Addr; 4] = [
    Ipv4Addr::new(192, 168, 1, 10),
    Ipv4Addr::new(192, 168, 1, 23),
    Ipv4Addr::new(192, 168, 1, 101),
    Ipv4Addr::new(192, 168, 1, 254),
];

/// Remote peers with their relative pick weight.
const REMOTE_HOSTS: [(IpAddr, u32); 7] = [
    (IpAddr::V4(Ipv4Addr::new(142, 250, 74, 46)), 40),
    (IpAddr::V4(Ipv4Addr::new(151, 101, 1, 69)), 20),
    (IpAddr::V4(Ipv4Addr::new(104, 16, 132, 229)), 12),
    (IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 6),
    (IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 4),
    (IpAddr::V4(Ipv4Addr::new(17, 253, 144, 10)), 3),
    (
        IpAddr::V6(Ipv6Addr::new(0x2606, 0x4700, 0, 0, 0, 0, 0x6810, 0x84e5)),
        2,
    ),
];

/// Frames per burst.
const BURST_LEN: u32 = 400;

/// One in this many packets starts a burst.
const BURST_ODDS: u32 = 5000;

const ETHERNET_MTU_FRAME: usize = 1514;

pub struct DemoSource {
    rng: StdRng,
    pace: Duration,
    burst: Option<(IpAddr, IpAddr, u32)>,
}

impl DemoSource {
    /// Synthetic source emitting one packet every `pace`.
    pub fn new(pace: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), pace)
    }

    /// Deterministic source for tests.
    pub fn seeded(seed: u64, pace: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), pace)
    }

    fn with_rng(rng: StdRng, pace: Duration) -> Self {
        Self {
            rng,
            pace,
            burst: None,
        }
    }

    fn pick_remote(&mut self) -> IpAddr {
        let total: u32 = REMOTE_HOSTS.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.random_range(0..total);
        for (addr, weight) in REMOTE_HOSTS {
            if roll < weight {
                return addr;
            }
            roll -= weight;
        }
        REMOTE_HOSTS[0].0
    }

    fn next_packet(&mut self) -> PacketEvent {
        if let Some((src, dst, left)) = self.burst {
            self.burst = (left > 1).then_some((src, dst, left - 1));
            return PacketEvent::new(src, dst, ETHERNET_MTU_FRAME);
        }

        let lan = IpAddr::V4(LAN_HOSTS[self.rng.random_range(0..LAN_HOSTS.len())]);
        let remote = self.pick_remote();

        if self.rng.random_range(0..BURST_ODDS) == 0 {
            self.burst = Some((remote, lan, BURST_LEN));
        }

        let size = self.rng.random_range(60..=ETHERNET_MTU_FRAME);
        if self.rng.random_bool(0.5) {
            PacketEvent::new(lan, remote, size)
        } else {
            PacketEvent::new(remote, lan, size)
        }
    }
}

impl PacketSource for DemoSource {
    fn name(&self) -> &str {
        "demo"
    }

    fn next_event(&mut self) -> Option<SourceEvent> {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
        Some(SourceEvent::Packet(self.next_packet()))
    }
}
