use std::fmt;

use pnet_packet::icmp::{IcmpType, IcmpTypes};
use pnet_packet::icmpv6::{Icmpv6Type, Icmpv6Types};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

use crate::error::{Error, Result};

pub mod icmpv4;
pub mod icmpv6;

/// Length of the fixed ICMP echo header: type, code, checksum, identifier, sequence.
pub const ECHO_HEADER_LEN: usize = 8;

/// An ICMP message type, tagged with the protocol it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    V4(IcmpType),
    V6(Icmpv6Type),
}

impl MessageType {
    /// Whether a reply of this type counts as an answer to an echo request.
    ///
    /// Router advertisements are tolerated as well: some paths answer an
    /// ICMPv6 probe with one instead of an echo reply.
    pub fn is_reply(&self) -> bool {
        match *self {
            MessageType::V4(ty) => ty == IcmpTypes::EchoReply,
            MessageType::V6(ty) => {
                ty == Icmpv6Types::EchoReply || ty == Icmpv6Types::RouterAdvert
            }
        }
    }

    fn name(&self) -> Option<&'static str> {
        match *self {
            MessageType::V4(ty) => match ty.0 {
                0 => Some("echo reply"),
                3 => Some("destination unreachable"),
                5 => Some("redirect"),
                8 => Some("echo request"),
                11 => Some("time exceeded"),
                12 => Some("parameter problem"),
                _ => None,
            },
            MessageType::V6(ty) => match ty.0 {
                1 => Some("destination unreachable"),
                2 => Some("packet too big"),
                3 => Some("time exceeded"),
                4 => Some("parameter problem"),
                128 => Some("echo request"),
                129 => Some("echo reply"),
                133 => Some("router solicitation"),
                134 => Some("router advertisement"),
                _ => None,
            },
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (proto, code) = match *self {
            MessageType::V4(ty) => ("icmp", ty.0),
            MessageType::V6(ty) => ("icmpv6", ty.0),
        };
        match self.name() {
            Some(name) => write!(f, "{} {} (type {})", proto, name, code),
            None => write!(f, "{} type {}", proto, code),
        }
    }
}

/// Identifier, sequence and data carried by echo request and echo reply messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Echo {
    pub identifier: u16,
    pub sequence: u16,
    pub data: Vec<u8>,
}

/// A decoded ICMP or ICMPv6 message, without the IP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub icmp_type: MessageType,
    pub code: u8,
    pub checksum: u16,
    /// Present for echo requests and echo replies.
    pub echo: Option<Echo>,
}

pub fn make_echo_packet(
    echo_type: MessageType,
    idt: u16,
    seq: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    match echo_type {
        MessageType::V4(ty) => icmpv4::make_echo_packet(ty, idt, seq, payload),
        MessageType::V6(ty) => icmpv6::make_echo_packet(ty, idt, seq, payload),
    }
}

/// Decodes a bare ICMP message using the grammar selected by `protocol`.
pub fn parse_message(protocol: IpNextHeaderProtocol, buf: &[u8]) -> Result<IcmpMessage> {
    if protocol == IpNextHeaderProtocols::Icmp {
        icmpv4::decode(buf)
    } else if protocol == IpNextHeaderProtocols::Icmpv6 {
        icmpv6::decode(buf)
    } else {
        Err(Error::UnsupportedProtocol(protocol.0))
    }
}
