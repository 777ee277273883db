use std::fmt;
use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::protocol::AddressFamily;

/// Name lookup, split out so the probe can run against a canned resolver.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Every address `host` resolves to. IPv6 answers keep their scope id.
    async fn lookup(&self, host: &str) -> io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the system's `getaddrinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<SocketAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.collect())
    }
}

/// A target name together with the address it resolved to.
///
/// `addr` is a socket address so that the zone of a link-local IPv6 target
/// reaches `sendto`. Its port is always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub host: String,
    pub family: AddressFamily,
    pub addr: SocketAddr,
}

impl ResolvedTarget {
    /// The address without its port, as `fe80::1%2` when it carries a zone.
    pub fn address(&self) -> Zoned<'_> {
        Zoned(&self.addr)
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.host, self.address())
    }
}

pub struct Zoned<'a>(&'a SocketAddr);

impl fmt::Display for Zoned<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            SocketAddr::V6(addr) if addr.scope_id() != 0 => {
                write!(f, "{}%{}", addr.ip(), addr.scope_id())
            }
            addr => write!(f, "{}", addr.ip()),
        }
    }
}

async fn resolve_as<R>(resolver: &R, family: AddressFamily, host: &str) -> Result<SocketAddr>
where
    R: Resolve + ?Sized,
{
    let unresolvable = |reason: String| Error::Unresolvable {
        host: host.to_owned(),
        family,
        reason,
    };
    let addrs = resolver
        .lookup(host)
        .await
        .map_err(|e| unresolvable(e.to_string()))?;
    addrs
        .into_iter()
        .find(|addr| family.matches(&addr.ip()))
        .ok_or_else(|| unresolvable("no address in this family".to_owned()))
}

/// Resolves `host` under `family`, falling back to the other family once.
///
/// The returned family is the one the caller must use from now on. A
/// fallback sticks even when the retry fails as well.
pub async fn resolve<R>(
    resolver: &R,
    family: AddressFamily,
    host: &str,
) -> (AddressFamily, Result<SocketAddr>)
where
    R: Resolve + ?Sized,
{
    let err = match resolve_as(resolver, family, host).await {
        Ok(addr) => return (family, Ok(addr)),
        Err(err) => err,
    };

    let fallback = family.flip();
    warn!(
        "Address {} could not be resolved with argument {} ({}): attempting to resolve as {}",
        host, family, err, fallback
    );
    let res = resolve_as(resolver, fallback, host).await;
    if res.is_ok() {
        info!("Successfully resolved {} with {}: continuing", host, fallback);
    }
    (fallback, res)
}
