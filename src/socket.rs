use std::io;
use std::net::SocketAddr;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use libc::c_int;

use crate::protocol::{AddressFamily, ProtocolConfig};
use crate::sys;

/// A raw ICMP or ICMPv6 socket. The descriptor is closed on drop.
#[derive(Debug)]
pub struct Socket {
    inner: OwnedFd,
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl Socket {
    pub(crate) fn from_raw(raw: sys::Socket) -> Self {
        Self {
            inner: unsafe { OwnedFd::from_raw_fd(raw) },
        }
    }

    pub(crate) fn as_raw(&self) -> sys::Socket {
        self.inner.as_raw_fd()
    }
}

impl Socket {
    /// Opens a raw socket for `config` and binds it to the configured source address.
    pub fn new(config: &ProtocolConfig) -> io::Result<Self> {
        let domain = match config.family {
            AddressFamily::V4 => libc::AF_INET,
            AddressFamily::V6 => libc::AF_INET6,
        };
        let source = SocketAddr::new(config.source, 0);
        sys::socket(domain, libc::SOCK_RAW, config.protocol.0 as c_int)
            .map(Self::from_raw)
            .and_then(set_common_flags)
            .and_then(|sock| sock.bind(&source).map(|_| sock))
    }

    pub fn set_nonblocking(&self) -> io::Result<()> {
        sys::set_nonblocking(self.as_raw())
    }

    pub fn bind(&self, addr: &SocketAddr) -> io::Result<()> {
        sys::bind(self.as_raw(), addr)
    }

    pub fn send_to(&self, buf: &[u8], addr: &SocketAddr) -> io::Result<usize> {
        sys::sendto(self.as_raw(), buf, addr, 0)
    }

    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        sys::recvfrom(self.as_raw(), buf, 0)
    }
}

fn set_common_flags(socket: Socket) -> io::Result<Socket> {
    // On platforms that don't have `SOCK_CLOEXEC` use `FD_CLOEXEC`.
    #[cfg(not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "illumos",
        target_os = "linux",
        target_os = "netbsd",
        target_os = "openbsd",
    )))]
    sys::set_cloexec(socket.as_raw())?;

    // On Apple platforms set `NOSIGPIPE`.
    #[cfg(target_vendor = "apple")]
    sys::set_nosigpipe(socket.as_raw())?;

    Ok(socket)
}
