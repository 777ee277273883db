use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use log::debug;

use crate::channel::{self, Connector};
use crate::error::{Error, Result};
use crate::packet::{self, IcmpMessage};
use crate::protocol::{AddressFamily, ProtocolConfig};
use crate::settings::DEFAULT_READ_TIMEOUT;

/// The identifier carried in every echo request: the low 16 bits of the process id.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Sends single echo requests and classifies the replies.
#[derive(Debug)]
pub struct Pinger<C> {
    connector: C,
    idt: u16,
    timeout: Duration,
}

impl<C: Connector> Pinger<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            idt: process_identifier(),
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn identifier(mut self, idt: u16) -> Self {
        self.idt = idt;
        self
    }

    /// How long to wait for a reply after the request went out.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn get_identifier(&self) -> u16 {
        self.idt
    }

    /// Runs one probe against `dst` and returns the round-trip time.
    ///
    /// A channel is opened for the probe and closed before the reply is
    /// parsed, on every path out of this function. Replies that are not
    /// echo-reply shaped come back as [`Error::UnexpectedReply`].
    pub async fn ping(&self, dst: SocketAddr, family: AddressFamily, seq: u16) -> Result<Duration> {
        let config = ProtocolConfig::new(family);

        let exchange = {
            let endpoint = self.connector.open(&config)?;
            let packet = packet::make_echo_packet(config.echo_type, self.idt, seq, &[])?;
            channel::exchange(&endpoint, &packet, dst, seq, self.timeout).await?
        };

        let reply = packet::parse_message(config.protocol, &exchange.reply)?;
        log_reply(&reply, exchange.len, exchange.peer);

        if reply.icmp_type.is_reply() {
            Ok(exchange.elapsed)
        } else {
            Err(Error::UnexpectedReply {
                icmp_type: reply.icmp_type,
                peer: exchange.peer,
            })
        }
    }
}

fn log_reply(reply: &IcmpMessage, len: usize, peer: IpAddr) {
    match &reply.echo {
        Some(echo) => debug!(
            "{} bytes from {}: {} id={} seq={}",
            len, peer, reply.icmp_type, echo.identifier, echo.sequence
        ),
        None => debug!("{} bytes from {}: {} code={}", len, peer, reply.icmp_type, reply.code),
    }
}
