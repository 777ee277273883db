use std::net::IpAddr;
use std::time::Duration;

use crate::packet::MessageType;
use crate::protocol::AddressFamily;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("buffer size was too small")]
    IncorrectBufferSize,
    #[error("malformed packet: {0}")]
    MalformedPacket(#[from] MalformedPacketError),
    #[error("socket error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("short write: sent {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("Request timeout for icmp_seq {seq} after {after:?}")]
    Timeout { seq: u16, after: Duration },
    #[error("got {icmp_type} from {peer}; want echo reply")]
    UnexpectedReply { icmp_type: MessageType, peer: IpAddr },
    #[error("unable to resolve {host} as {family}: {reason}")]
    Unresolvable {
        host: String,
        family: AddressFamily,
        reason: String,
    },
    #[error("Invalid argument {0}: use 'ip4' or 'ip6'")]
    UnsupportedFamily(String),
    #[error("unsupported protocol number {0}")]
    UnsupportedProtocol(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum MalformedPacketError {
    #[error("expected an Ipv4Packet")]
    NotIpv4Packet,
    #[error("expected an Icmpv4Packet payload")]
    NotIcmpv4Packet,
    #[error("expected an Icmpv6Packet")]
    NotIcmpv6Packet,
    #[error("payload too short, got {got}, want {want}")]
    PayloadTooShort { got: usize, want: usize },
    #[error("bad checksum, got {got:#06x}, want {want:#06x}")]
    BadChecksum { got: u16, want: u16 },
}
