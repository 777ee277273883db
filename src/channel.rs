use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;
use tokio::time::{timeout, Instant};

use crate::error::{Error, Result};
use crate::packet::icmpv4;
use crate::protocol::{AddressFamily, ProtocolConfig};
use crate::socket;

/// Size of the receive buffer; one Ethernet MTU.
pub const MAX_DATAGRAM: usize = 1500;

/// One open ICMP endpoint.
///
/// `recv_from` yields bare ICMP messages; any IP header the transport
/// delivers is stripped before the bytes reach the caller.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn send_to(&self, buf: &[u8], dst: SocketAddr) -> Result<usize>;

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, IpAddr)>;
}

/// Opens a fresh [`Channel`] for each probe.
pub trait Connector: Send + Sync {
    type Channel: Channel;

    fn open(&self, config: &ProtocolConfig) -> Result<Self::Channel>;
}

#[derive(Debug)]
pub struct IcmpChannel {
    inner: AsyncFd<socket::Socket>,
    family: AddressFamily,
}

impl IcmpChannel {
    pub fn open(config: &ProtocolConfig) -> Result<Self> {
        let socket = socket::Socket::new(config)?;
        socket.set_nonblocking()?;
        Ok(Self {
            inner: AsyncFd::new(socket)?,
            family: config.family,
        })
    }
}

#[async_trait]
impl Channel for IcmpChannel {
    async fn send_to(&self, buf: &[u8], dst: SocketAddr) -> Result<usize> {
        loop {
            let mut guard = self.inner.writable().await?;

            match guard.try_io(|inner| inner.get_ref().send_to(buf, &dst)) {
                Ok(res) => return Ok(res?),
                Err(_would_block) => continue,
            }
        }
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, IpAddr)> {
        let (size, peer) = loop {
            let mut guard = self.inner.readable().await?;

            match guard.try_io(|inner| inner.get_ref().recv_from(buf)) {
                Ok(res) => break res?,
                Err(_would_block) => continue,
            }
        };

        match self.family {
            AddressFamily::V4 => Ok((strip_ipv4_header(buf, size)?, peer.ip())),
            AddressFamily::V6 => Ok((size, peer.ip())),
        }
    }
}

/// Moves the ICMP message in `buf[..size]` to the front of `buf`, dropping
/// the IPv4 header, and returns the message length.
fn strip_ipv4_header(buf: &mut [u8], size: usize) -> Result<usize> {
    let offset = icmpv4::ip_header_len(&buf[..size])?;
    buf.copy_within(offset..size, 0);
    Ok(size - offset)
}

/// Connector for real raw sockets. Needs `CAP_NET_RAW` or root.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawConnector;

impl Connector for RawConnector {
    type Channel = IcmpChannel;

    fn open(&self, config: &ProtocolConfig) -> Result<IcmpChannel> {
        IcmpChannel::open(config)
    }
}

/// The outcome of one send/receive round on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub reply: Vec<u8>,
    pub len: usize,
    pub elapsed: Duration,
    pub peer: IpAddr,
}

/// Sends `message` to `dst` and waits up to `deadline` for one datagram.
///
/// The first datagram is returned whatever it contains. Nothing is retried:
/// a failed or short write, a receive error and an expired deadline all end
/// the exchange.
pub async fn exchange<C>(
    channel: &C,
    message: &[u8],
    dst: SocketAddr,
    seq: u16,
    deadline: Duration,
) -> Result<Exchange>
where
    C: Channel + ?Sized,
{
    let start = Instant::now();
    let written = channel.send_to(message, dst).await?;
    if written != message.len() {
        return Err(Error::ShortWrite {
            written,
            expected: message.len(),
        });
    }

    let mut reply = vec![0; MAX_DATAGRAM];
    let (len, peer) = timeout(deadline, channel.recv_from(&mut reply))
        .await
        .map_err(|_| Error::Timeout {
            seq,
            after: deadline,
        })??;
    let elapsed = start.elapsed();
    reply.truncate(len);

    Ok(Exchange {
        reply,
        len,
        elapsed,
        peer,
    })
}
