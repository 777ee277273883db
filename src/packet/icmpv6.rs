use pnet_packet::icmpv6::{self, Icmpv6Code, Icmpv6Type, Icmpv6Types};
use pnet_packet::Packet;

use super::{Echo, IcmpMessage, MessageType, ECHO_HEADER_LEN};
use crate::error::{Error, MalformedPacketError, Result};

pub fn make_echo_packet(
    icmp_type: Icmpv6Type,
    idt: u16,
    seq: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut buf = vec![0; ECHO_HEADER_LEN + payload.len()];
    let mut packet =
        icmpv6::MutableIcmpv6Packet::new(&mut buf).ok_or(Error::IncorrectBufferSize)?;

    packet.set_icmpv6_type(icmp_type);
    packet.set_icmpv6_code(Icmpv6Code(0));
    let mut payload_buf = Vec::with_capacity(4 + payload.len());
    payload_buf.extend_from_slice(&idt.to_be_bytes());
    payload_buf.extend_from_slice(&seq.to_be_bytes());
    payload_buf.extend_from_slice(payload);
    packet.set_payload(&payload_buf);

    // The kernel computes the ICMPv6 checksum over the pseudo header on raw sockets.
    Ok(buf)
}

pub fn decode(buf: &[u8]) -> Result<IcmpMessage> {
    let icmpv6_packet = icmpv6::Icmpv6Packet::new(buf)
        .ok_or_else(|| Error::from(MalformedPacketError::NotIcmpv6Packet))?;

    let icmp_type = icmpv6_packet.get_icmpv6_type();
    let echo = if icmp_type == Icmpv6Types::EchoReply || icmp_type == Icmpv6Types::EchoRequest {
        let icmpv6_payload = icmpv6_packet.payload();
        if icmpv6_payload.len() < 4 {
            return Err(MalformedPacketError::PayloadTooShort {
                got: buf.len(),
                want: ECHO_HEADER_LEN,
            }
            .into());
        }
        Some(Echo {
            identifier: u16::from_be_bytes([icmpv6_payload[0], icmpv6_payload[1]]),
            sequence: u16::from_be_bytes([icmpv6_payload[2], icmpv6_payload[3]]),
            data: icmpv6_payload[4..].to_vec(),
        })
    } else {
        None
    };

    Ok(IcmpMessage {
        icmp_type: MessageType::V6(icmp_type),
        code: icmpv6_packet.get_icmpv6_code().0,
        checksum: icmpv6_packet.get_checksum(),
        echo,
    })
}
