//! Decoded view of one captured frame.
//!
//! Frames come off the wire as raw link-layer bytes; `CapturedPacket` peels
//! Ethernet, an optional 802.1Q tag and IPv4/IPv6 to reach the TCP segment.
//! Anything that is not TCP decodes to `None` and is skipped upstream.

use bincode::{Decode, Encode};
use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::{TcpFlags, TcpPacket};
use pnet::packet::vlan::VlanPacket;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

/// Identity of one reassembly unit: the TCP acknowledgment number shared by
/// every packet of one logical request.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey(pub u32);

impl Display for FlowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CapturedPacket {
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
    pub seq: u32,
    pub ack: u32,
    pub payload: Vec<u8>,
    pub timestamp: SystemTime,
}

impl CapturedPacket {
    pub fn from_frame(frame: &[u8], timestamp: SystemTime) -> Option<Self> {
        let ethernet = EthernetPacket::new(frame)?;
        match ethernet.get_ethertype() {
            EtherTypes::Ipv4 => Self::from_ipv4(ethernet.payload(), timestamp),
            EtherTypes::Ipv6 => Self::from_ipv6(ethernet.payload(), timestamp),
            EtherTypes::Vlan => {
                let vlan = VlanPacket::new(ethernet.payload())?;
                match vlan.get_ethertype() {
                    EtherTypes::Ipv4 => Self::from_ipv4(vlan.payload(), timestamp),
                    EtherTypes::Ipv6 => Self::from_ipv6(vlan.payload(), timestamp),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn from_ipv4(data: &[u8], timestamp: SystemTime) -> Option<Self> {
        let ip = Ipv4Packet::new(data)?;
        if ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
            return None;
        }
        Self::from_segment(ip.payload(), timestamp)
    }

    fn from_ipv6(data: &[u8], timestamp: SystemTime) -> Option<Self> {
        let ip = Ipv6Packet::new(data)?;
        if ip.get_next_header() != IpNextHeaderProtocols::Tcp {
            return None;
        }
        Self::from_segment(ip.payload(), timestamp)
    }

    fn from_segment(segment: &[u8], timestamp: SystemTime) -> Option<Self> {
        let tcp = TcpPacket::new(segment)?;
        Some(Self {
            src_port: tcp.get_source(),
            dst_port: tcp.get_destination(),
            flags: tcp.get_flags(),
            seq: tcp.get_sequence(),
            ack: tcp.get_acknowledgement(),
            payload: tcp.payload().to_vec(),
            timestamp,
        })
    }

    pub fn flow_key(&self) -> FlowKey {
        FlowKey(self.ack)
    }

    pub fn has_push(&self) -> bool {
        self.flags & TcpFlags::PSH != 0
    }
}
