#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pnet_packet::icmp::IcmpTypes;
use pnet_packet::icmpv6::Icmpv6Types;

use ping_probe::channel::{Channel, Connector};
use ping_probe::packet::{self, MessageType};
use ping_probe::protocol::{AddressFamily, ProtocolConfig};
use ping_probe::resolve::Resolve;
use ping_probe::Result;

/// What the mock network does with the next probe.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with these bytes after the delay, from the probed address.
    After(Duration, Vec<u8>),
    /// Swallow the request.
    Never,
    /// Fail the read.
    RecvError(io::ErrorKind),
    /// Accept one byte less than was sent.
    ShortWrite,
    /// Refuse to open the socket.
    OpenError(io::ErrorKind),
}

#[derive(Debug, Default)]
pub struct Network {
    script: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    configs: Mutex<Vec<ProtocolConfig>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Hands out channels that play back a script, one entry per opened channel.
/// An exhausted script swallows every further request.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    net: Arc<Network>,
}

impl MockConnector {
    pub fn new(script: Vec<Reply>) -> Self {
        let net = Network {
            script: Mutex::new(script.into()),
            ..Network::default()
        };
        Self { net: Arc::new(net) }
    }

    pub fn opened(&self) -> usize {
        self.net.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.net.closed.load(Ordering::SeqCst)
    }

    pub fn configs(&self) -> Vec<ProtocolConfig> {
        self.net.configs.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.net.sent.lock().unwrap().clone()
    }

    /// (identifier, sequence) of every echo request that went out.
    pub fn sent_echoes(&self) -> Vec<(u16, u16)> {
        self.sent()
            .iter()
            .map(|(buf, dst)| {
                let family = if dst.is_ipv4() {
                    AddressFamily::V4
                } else {
                    AddressFamily::V6
                };
                let config = ProtocolConfig::new(family);
                let message = packet::parse_message(config.protocol, buf).unwrap();
                assert_eq!(message.icmp_type, config.echo_type);
                let echo = message.echo.unwrap();
                (echo.identifier, echo.sequence)
            })
            .collect()
    }
}

impl Connector for MockConnector {
    type Channel = MockChannel;

    fn open(&self, config: &ProtocolConfig) -> Result<MockChannel> {
        self.net.configs.lock().unwrap().push(*config);
        let reply = self
            .net
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Never);
        if let Reply::OpenError(kind) = reply {
            return Err(io::Error::from(kind).into());
        }
        self.net.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockChannel {
            net: Arc::clone(&self.net),
            reply: Mutex::new(Some(reply)),
            peer: Mutex::new(None),
        })
    }
}

pub struct MockChannel {
    net: Arc<Network>,
    reply: Mutex<Option<Reply>>,
    peer: Mutex<Option<IpAddr>>,
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        self.net.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn send_to(&self, buf: &[u8], dst: SocketAddr) -> Result<usize> {
        self.net.sent.lock().unwrap().push((buf.to_vec(), dst));
        *self.peer.lock().unwrap() = Some(dst.ip());
        let short = matches!(*self.reply.lock().unwrap(), Some(Reply::ShortWrite));
        if short {
            Ok(buf.len() - 1)
        } else {
            Ok(buf.len())
        }
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, IpAddr)> {
        let reply = self.reply.lock().unwrap().take();
        let peer = self.peer.lock().unwrap().expect("recv before send");
        match reply {
            Some(Reply::After(delay, bytes)) => {
                tokio::time::sleep(delay).await;
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok((bytes.len(), peer))
            }
            Some(Reply::RecvError(kind)) => Err(io::Error::from(kind).into()),
            _ => std::future::pending().await,
        }
    }
}

/// A resolver with a fixed answer, counting lookups.
#[derive(Debug, Clone, Default)]
pub struct MockResolver {
    answer: Option<Vec<SocketAddr>>,
    lookups: Arc<AtomicUsize>,
}

impl MockResolver {
    pub fn answering(addrs: &[&str]) -> Self {
        let addrs = addrs
            .iter()
            .map(|addr| SocketAddr::new(addr.parse::<IpAddr>().unwrap(), 0))
            .collect();
        Self::answering_with(addrs)
    }

    pub fn answering_with(addrs: Vec<SocketAddr>) -> Self {
        Self {
            answer: Some(addrs),
            lookups: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolve for MockResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<SocketAddr>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some(addrs) => Ok(addrs.clone()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such host: {}", host),
            )),
        }
    }
}

pub fn echo_reply_v4(idt: u16, seq: u16) -> Vec<u8> {
    packet::make_echo_packet(MessageType::V4(IcmpTypes::EchoReply), idt, seq, &[]).unwrap()
}

pub fn unreachable_v4() -> Vec<u8> {
    packet::make_echo_packet(MessageType::V4(IcmpTypes::DestinationUnreachable), 0, 0, &[])
        .unwrap()
}

pub fn echo_reply_v6(idt: u16, seq: u16) -> Vec<u8> {
    packet::make_echo_packet(MessageType::V6(Icmpv6Types::EchoReply), idt, seq, &[]).unwrap()
}

pub fn router_advert_v6() -> Vec<u8> {
    let mut buf = vec![0; 16];
    buf[0] = Icmpv6Types::RouterAdvert.0;
    buf
}
