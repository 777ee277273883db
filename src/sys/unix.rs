use std::io;
use std::mem::{self, size_of, MaybeUninit};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr;

use libc::{c_int, sockaddr_storage, socklen_t};

pub(crate) type Socket = c_int;

macro_rules! syscall {
    ($fn:ident ($($args:expr),* $(,)*)) => {
        {
            let res = unsafe { libc::$fn($($args),*) };
            if res == -1 {
                Err(std::io::Error::last_os_error())
            } else {
                Ok(res)
            }
        }
    };
}

pub(crate) fn socket(family: c_int, ty: c_int, protocol: c_int) -> io::Result<Socket> {
    #[cfg(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "illumos",
        target_os = "linux",
        target_os = "netbsd",
        target_os = "openbsd",
    ))]
    let ty = ty | libc::SOCK_CLOEXEC;

    syscall!(socket(family, ty, protocol))
}

pub(crate) fn set_nonblocking(fd: Socket) -> io::Result<()> {
    fcntl_add(fd, libc::F_GETFL, libc::F_SETFL, libc::O_NONBLOCK)
}

#[cfg(not(any(
    target_os = "android",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "illumos",
    target_os = "linux",
    target_os = "netbsd",
    target_os = "openbsd",
)))]
pub(crate) fn set_cloexec(fd: Socket) -> io::Result<()> {
    fcntl_add(fd, libc::F_GETFD, libc::F_SETFD, libc::FD_CLOEXEC)
}

#[cfg(target_vendor = "apple")]
pub(crate) fn set_nosigpipe(fd: Socket) -> io::Result<()> {
    let on: c_int = 1;
    syscall!(setsockopt(
        fd,
        libc::SOL_SOCKET,
        libc::SO_NOSIGPIPE,
        (&on as *const c_int).cast(),
        size_of::<c_int>() as socklen_t
    ))
    .map(|_| ())
}

fn fcntl_add(fd: Socket, get_cmd: c_int, set_cmd: c_int, flag: c_int) -> io::Result<()> {
    let pre = syscall!(fcntl(fd, get_cmd))?;
    let new = pre | flag;
    if new != pre {
        syscall!(fcntl(fd, set_cmd, new)).map(|_| ())
    } else {
        Ok(())
    }
}

pub(crate) fn bind(sock: Socket, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = to_sockaddr(addr);
    syscall!(bind(sock, (&storage as *const sockaddr_storage).cast(), len)).map(|_| ())
}

pub(crate) fn sendto(
    sock: Socket,
    buf: &[u8],
    addr: &SocketAddr,
    flags: c_int,
) -> io::Result<usize> {
    let (storage, len) = to_sockaddr(addr);
    syscall!(sendto(
        sock,
        buf.as_ptr().cast(),
        buf.len(),
        flags,
        (&storage as *const sockaddr_storage).cast(),
        len
    ))
    .map(|n| n as usize)
}

pub(crate) fn recvfrom(
    sock: Socket,
    buf: &mut [u8],
    flags: c_int,
) -> io::Result<(usize, SocketAddr)> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = size_of::<sockaddr_storage>() as socklen_t;
    let n = syscall!(recvfrom(
        sock,
        buf.as_mut_ptr().cast(),
        buf.len(),
        flags,
        (&mut storage as *mut sockaddr_storage).cast(),
        &mut len
    ))?;
    let addr = from_sockaddr(&storage)?;
    Ok((n as usize, addr))
}

fn to_sockaddr(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut sockaddr = MaybeUninit::<sockaddr_storage>::zeroed();
    unsafe {
        match addr {
            SocketAddr::V4(addr) => {
                let mut in_s: libc::sockaddr_in = mem::zeroed();
                in_s.sin_family = libc::AF_INET as libc::sa_family_t;
                in_s.sin_addr = to_in_addr(addr.ip());
                in_s.sin_port = addr.port().to_be();
                ptr::copy_nonoverlapping(&in_s, sockaddr.as_mut_ptr().cast(), 1);
                (
                    sockaddr.assume_init(),
                    size_of::<libc::sockaddr_in>() as socklen_t,
                )
            }
            SocketAddr::V6(addr) => {
                let mut in6_s: libc::sockaddr_in6 = mem::zeroed();
                in6_s.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                in6_s.sin6_addr = to_in6_addr(addr.ip());
                in6_s.sin6_port = addr.port().to_be();
                in6_s.sin6_flowinfo = addr.flowinfo();
                in6_s.sin6_scope_id = addr.scope_id();
                ptr::copy_nonoverlapping(&in6_s, sockaddr.as_mut_ptr().cast(), 1);
                (
                    sockaddr.assume_init(),
                    size_of::<libc::sockaddr_in6>() as socklen_t,
                )
            }
        }
    }
}

fn from_sockaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        libc::AF_INET => {
            let addr =
                unsafe { &*(storage as *const sockaddr_storage).cast::<libc::sockaddr_in>() };
            Ok(SocketAddr::V4(SocketAddrV4::new(
                from_in_addr(addr.sin_addr),
                u16::from_be(addr.sin_port),
            )))
        }
        libc::AF_INET6 => {
            let addr =
                unsafe { &*(storage as *const sockaddr_storage).cast::<libc::sockaddr_in6>() };
            Ok(SocketAddr::V6(SocketAddrV6::new(
                from_in6_addr(addr.sin6_addr),
                u16::from_be(addr.sin6_port),
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }
        family => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected address family {} from peer", family),
        )),
    }
}

pub(crate) fn to_in_addr(addr: &Ipv4Addr) -> libc::in_addr {
    libc::in_addr {
        s_addr: u32::from_ne_bytes(addr.octets()),
    }
}

pub(crate) fn from_in_addr(addr: libc::in_addr) -> Ipv4Addr {
    Ipv4Addr::from(addr.s_addr.to_ne_bytes())
}

pub(crate) fn to_in6_addr(addr: &Ipv6Addr) -> libc::in6_addr {
    let mut in6: libc::in6_addr = unsafe { mem::zeroed() };
    in6.s6_addr = addr.octets();
    in6
}

pub(crate) fn from_in6_addr(addr: libc::in6_addr) -> Ipv6Addr {
    Ipv6Addr::from(addr.s6_addr)
}
