use pnet_packet::icmp::echo_request::IcmpCodes;
use pnet_packet::icmp::{self, IcmpType, IcmpTypes};
use pnet_packet::{ipv4, Packet};

use super::{Echo, IcmpMessage, MessageType, ECHO_HEADER_LEN};
use crate::error::{Error, MalformedPacketError, Result};

const MIN_IPV4_HEADER_LEN: usize = 20;

pub fn make_echo_packet(
    icmp_type: IcmpType,
    idt: u16,
    seq: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut buf = vec![0; ECHO_HEADER_LEN + payload.len()];
    let mut packet = icmp::echo_request::MutableEchoRequestPacket::new(&mut buf)
        .ok_or(Error::IncorrectBufferSize)?;

    packet.set_icmp_type(icmp_type);
    packet.set_icmp_code(IcmpCodes::NoCode);
    packet.set_identifier(idt);
    packet.set_sequence_number(seq);
    packet.set_payload(payload);

    let icmp_packet = icmp::IcmpPacket::new(packet.packet()).ok_or(Error::IncorrectBufferSize)?;
    let checksum = icmp::checksum(&icmp_packet);
    packet.set_checksum(checksum);

    Ok(buf)
}

/// Length of the IPv4 header a raw socket puts in front of every datagram.
pub fn ip_header_len(buf: &[u8]) -> Result<usize> {
    let ipv4_packet = ipv4::Ipv4Packet::new(buf)
        .ok_or_else(|| Error::from(MalformedPacketError::NotIpv4Packet))?;
    if ipv4_packet.get_version() != 4 {
        return Err(MalformedPacketError::NotIpv4Packet.into());
    }
    let len = ipv4_packet.get_header_length() as usize * 4;
    if len < MIN_IPV4_HEADER_LEN || len > buf.len() {
        return Err(MalformedPacketError::NotIpv4Packet.into());
    }
    Ok(len)
}

pub fn decode(buf: &[u8]) -> Result<IcmpMessage> {
    if buf.len() < ECHO_HEADER_LEN {
        return Err(MalformedPacketError::PayloadTooShort {
            got: buf.len(),
            want: ECHO_HEADER_LEN,
        }
        .into());
    }
    let icmp_packet = icmp::IcmpPacket::new(buf)
        .ok_or_else(|| Error::from(MalformedPacketError::NotIcmpv4Packet))?;

    // Replies that fail the checksum are rejected rather than parsed.
    let want = icmp::checksum(&icmp_packet);
    let got = icmp_packet.get_checksum();
    if got != want {
        return Err(MalformedPacketError::BadChecksum { got, want }.into());
    }

    let icmp_type = icmp_packet.get_icmp_type();
    let echo = if icmp_type == IcmpTypes::EchoReply || icmp_type == IcmpTypes::EchoRequest {
        let echo_packet = icmp::echo_reply::EchoReplyPacket::new(buf)
            .ok_or_else(|| Error::from(MalformedPacketError::NotIcmpv4Packet))?;
        Some(Echo {
            identifier: echo_packet.get_identifier(),
            sequence: echo_packet.get_sequence_number(),
            data: echo_packet.payload().to_vec(),
        })
    } else {
        None
    };

    Ok(IcmpMessage {
        icmp_type: MessageType::V4(icmp_type),
        code: icmp_packet.get_icmp_code().0,
        checksum: got,
        echo,
    })
}
