//! Packet source trait and the events it produces.
//!
//! Every packet source implements [`PacketSource`]. Sources block until the
//! next event is available; ingestion runs them on their own thread.

use std::fmt;
use std::net::IpAddr;

/// Addresses and size of one observed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketEvent {
    pub source: IpAddr,
    pub destination: IpAddr,
    /// Captured frame length in bytes.
    pub size: usize,
}

impl PacketEvent {
    pub fn new(source: IpAddr, destination: IpAddr, size: usize) -> Self {
        Self {
            source,
            destination,
            size,
        }
    }
}

/// Why a frame produced no packet event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Frame carries something other than IPv4/IPv6 (ARP, LLDP, ...).
    NotIp,
    /// Header shorter than its protocol requires.
    Truncated,
    /// Replay line that does not parse.
    Malformed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotIp => write!(f, "not-ip"),
            Self::Truncated => write!(f, "truncated"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// One step of a packet source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    Packet(PacketEvent),
    /// Something was read but carried no usable network-layer addresses.
    Skipped(SkipReason),
    /// Nothing arrived within the source's poll window.
    Idle,
}

/// A blocking producer of packet events.
pub trait PacketSource: Send {
    /// Human-readable name, e.g. `capture:eth0`.
    fn name(&self) -> &str;

    /// Wait for the next event. `None` means the source is exhausted or broken.
    fn next_event(&mut self) -> Option<SourceEvent>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_event(&mut self) -> Option<SourceEvent> {
        (**self).next_event()
    }
}
