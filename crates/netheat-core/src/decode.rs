//! Network-layer address extraction from captured Ethernet frames.
//!
//! Only enough of each header is parsed to find the source and destination
//! address. Anything else about the packet is ignored.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::source::{PacketEvent, SkipReason, SourceEvent};

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88A8;

/// Decode an Ethernet II frame (optionally VLAN tagged).
///
/// The event size is the whole frame length, link header included.
pub fn decode_frame(frame: &[u8]) -> SourceEvent {
    if frame.len() < ETHERNET_HEADER_LEN {
        return SourceEvent::Skipped(SkipReason::Truncated);
    }
    let mut ethertype = be16(frame, 12);
    let mut offset = ETHERNET_HEADER_LEN;

    while ethertype == ETHERTYPE_VLAN || ethertype == ETHERTYPE_QINQ {
        if frame.len() < offset + VLAN_TAG_LEN {
            return SourceEvent::Skipped(SkipReason::Truncated);
        }
        ethertype = be16(frame, offset + 2);
        offset += VLAN_TAG_LEN;
    }

    match ethertype {
        ETHERTYPE_IPV4 | ETHERTYPE_IPV6 => decode_ip(&frame[offset..], frame.len()),
        _ => SourceEvent::Skipped(SkipReason::NotIp),
    }
}

/// Decode a bare IP packet, picking the version from the first nibble.
///
/// `size` is what gets reported as the event size.
pub fn decode_ip(packet: &[u8], size: usize) -> SourceEvent {
    let Some(first) = packet.first() else {
        return SourceEvent::Skipped(SkipReason::Truncated);
    };
    match first >> 4 {
        4 => {
            if packet.len() < IPV4_MIN_HEADER_LEN {
                return SourceEvent::Skipped(SkipReason::Truncated);
            }
            let src = Ipv4Addr::new(packet[12], packet[13], packet[14], packet[15]);
            let dst = Ipv4Addr::new(packet[16], packet[17], packet[18], packet[19]);
            packet_event(src.into(), dst.into(), size)
        }
        6 => {
            if packet.len() < IPV6_HEADER_LEN {
                return SourceEvent::Skipped(SkipReason::Truncated);
            }
            let src = ipv6_at(packet, 8);
            let dst = ipv6_at(packet, 24);
            packet_event(src.into(), dst.into(), size)
        }
        _ => SourceEvent::Skipped(SkipReason::NotIp),
    }
}

fn packet_event(source: IpAddr, destination: IpAddr, size: usize) -> SourceEvent {
    SourceEvent::Packet(PacketEvent::new(source, destination, size))
}

fn be16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

fn ipv6_at(buf: &[u8], at: usize) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&buf[at..at + 16]);
    Ipv6Addr::from(octets)
}
