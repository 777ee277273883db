use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use pnet_packet::icmp::IcmpTypes;
use pnet_packet::icmpv6::Icmpv6Types;
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

use crate::error::{Error, Result};
use crate::packet::MessageType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// The other family, used when resolution under this one fails.
    pub fn flip(self) -> Self {
        match self {
            AddressFamily::V4 => AddressFamily::V6,
            AddressFamily::V6 => AddressFamily::V4,
        }
    }

    pub fn matches(self, addr: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for AddressFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ip4" => Ok(AddressFamily::V4),
            "ip6" => Ok(AddressFamily::V6),
            other => Err(Error::UnsupportedFamily(other.to_owned())),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("ip4"),
            AddressFamily::V6 => f.write_str("ip6"),
        }
    }
}

/// Everything needed to open a raw ICMP socket for one address family and
/// to interpret what comes back on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub family: AddressFamily,
    pub network: &'static str,
    pub source: IpAddr,
    pub echo_type: MessageType,
    pub protocol: IpNextHeaderProtocol,
}

impl ProtocolConfig {
    pub fn new(family: AddressFamily) -> Self {
        match family {
            AddressFamily::V4 => Self {
                family,
                network: "ip4:icmp",
                source: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                echo_type: MessageType::V4(IcmpTypes::EchoRequest),
                protocol: IpNextHeaderProtocols::Icmp,
            },
            AddressFamily::V6 => Self {
                family,
                network: "ip6:ipv6-icmp",
                source: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
                echo_type: MessageType::V6(Icmpv6Types::EchoRequest),
                protocol: IpNextHeaderProtocols::Icmpv6,
            },
        }
    }

    /// Looks up the configuration for a textual family preference.
    ///
    /// Anything other than `ip4` or `ip6` is a configuration error, and no
    /// socket may be opened for it.
    pub fn from_preference(preference: &str) -> Result<Self> {
        preference.parse().map(Self::new)
    }
}

impl From<AddressFamily> for ProtocolConfig {
    fn from(family: AddressFamily) -> Self {
        Self::new(family)
    }
}
