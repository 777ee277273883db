use std::future::Future;
use std::time::Duration;

use log::{error, info, warn};

use crate::channel::Connector;
use crate::error::{Error, Result};
use crate::ping::Pinger;
use crate::protocol::AddressFamily;
use crate::resolve::{self, Resolve, ResolvedTarget};
use crate::settings::Settings;

/// How a single probe turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// An echo reply arrived. `exceeded_by` is set when the round trip was
    /// longer than the threshold.
    EchoReply {
        elapsed: Duration,
        exceeded_by: Option<Duration>,
    },
    /// Something came back, but not an echo reply.
    ProtocolError(String),
    /// Opening, writing to or reading from the socket failed.
    SocketError(String),
    Timeout,
    Unresolvable(String),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::EchoReply { .. })
    }
}

pub fn classify(result: &Result<Duration>, threshold: Duration) -> ProbeOutcome {
    match result {
        Ok(elapsed) => ProbeOutcome::EchoReply {
            elapsed: *elapsed,
            exceeded_by: elapsed.checked_sub(threshold).filter(|diff| !diff.is_zero()),
        },
        Err(err) => classify_error(err),
    }
}

fn classify_error(err: &Error) -> ProbeOutcome {
    match err {
        Error::Timeout { .. } => ProbeOutcome::Timeout,
        Error::Unresolvable { .. } => ProbeOutcome::Unresolvable(err.to_string()),
        Error::UnexpectedReply { .. }
        | Error::MalformedPacket(_)
        | Error::UnsupportedProtocol(_) => ProbeOutcome::ProtocolError(err.to_string()),
        _ => ProbeOutcome::SocketError(err.to_string()),
    }
}

/// Why the probe loop stopped.
#[derive(Debug)]
pub enum Exit {
    Cancelled,
    Unresolvable(Error),
    Failed { seq: u64, error: Error },
}

impl Exit {
    /// Process exit status for this way of stopping.
    pub fn code(&self) -> u8 {
        match self {
            Exit::Cancelled => 0,
            Exit::Unresolvable(_) | Exit::Failed { .. } => 1,
        }
    }
}

/// Probes one target forever: resolve once, then ping, report, sleep.
pub struct Driver<C, R> {
    host: String,
    family: AddressFamily,
    settings: Settings,
    pinger: Pinger<C>,
    resolver: R,
}

impl<C, R> Driver<C, R>
where
    C: Connector,
    R: Resolve,
{
    pub fn new(
        host: impl Into<String>,
        family: AddressFamily,
        settings: Settings,
        connector: C,
        resolver: R,
    ) -> Self {
        let pinger = Pinger::new(connector).timeout(settings.read_timeout);
        Self {
            host: host.into(),
            family,
            settings,
            pinger,
            resolver,
        }
    }

    pub async fn run<F>(self, shutdown: F) -> Exit
    where
        F: Future<Output = ()>,
    {
        self.run_with(shutdown, |_, _| {}).await
    }

    /// Like [`Driver::run`], handing every probe outcome to `observe` as well.
    ///
    /// A target that cannot be resolved is reported once as
    /// [`ProbeOutcome::Unresolvable`] with sequence 0.
    ///
    /// `shutdown` is polled alongside resolution, each probe and each pause,
    /// so a pending read or sleep is abandoned as soon as `shutdown` resolves.
    pub async fn run_with<F, O>(self, shutdown: F, mut observe: O) -> Exit
    where
        F: Future<Output = ()>,
        O: FnMut(u64, &ProbeOutcome),
    {
        tokio::pin!(shutdown);

        let (family, resolved) = tokio::select! {
            _ = &mut shutdown => return self.cancelled(),
            res = resolve::resolve(&self.resolver, self.family, &self.host) => res,
        };
        let target = match resolved {
            Ok(addr) => ResolvedTarget {
                host: self.host.clone(),
                family,
                addr,
            },
            Err(err) => {
                error!("Unable to resolve {}: {}", self.host, err);
                observe(0, &classify_error(&err));
                return Exit::Unresolvable(err);
            }
        };

        let max_failures = self.settings.max_consecutive_failures.max(1);
        let mut failures = 0;
        let mut seq: u64 = 1;
        loop {
            let res = tokio::select! {
                _ = &mut shutdown => return self.cancelled(),
                res = self.pinger.ping(target.addr, target.family, seq as u16) => res,
            };

            let outcome = classify(&res, self.settings.threshold);
            observe(seq, &outcome);
            match res {
                Ok(_) => {
                    failures = 0;
                    report(seq, &target, &outcome);
                }
                Err(error) => {
                    failures += 1;
                    if failures >= max_failures {
                        error!(
                            "Error pinging {}: {}. Exiting: try a different address.",
                            target, error
                        );
                        return Exit::Failed { seq, error };
                    }
                    warn!(
                        "({}) Error pinging {}: {} ({} of {} failures in a row)",
                        seq, target, error, failures, max_failures
                    );
                }
            }

            seq += 1;
            tokio::select! {
                _ = &mut shutdown => return self.cancelled(),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }

    fn cancelled(&self) -> Exit {
        info!("Stopped probing {}", self.host);
        Exit::Cancelled
    }
}

fn report(seq: u64, target: &ResolvedTarget, outcome: &ProbeOutcome) {
    if let ProbeOutcome::EchoReply {
        elapsed,
        exceeded_by,
    } = outcome
    {
        match exceeded_by {
            Some(diff) => warn!(
                "({}) Pinging {} @ ({}): TTL: {:?} ----- Time Exceeded by {:?}",
                seq, target.host, target.address(), elapsed, diff
            ),
            None => info!(
                "({}) Pinging {} @ ({}): TTL: {:?}",
                seq, target.host, target.address(), elapsed
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::MessageType;
    use pnet_packet::icmp::IcmpTypes;
    use std::io;

    const THRESHOLD: Duration = Duration::from_millis(100);

    #[test]
    fn reply_under_threshold() {
        let outcome = classify(&Ok(Duration::from_millis(50)), THRESHOLD);
        assert_eq!(
            outcome,
            ProbeOutcome::EchoReply {
                elapsed: Duration::from_millis(50),
                exceeded_by: None,
            }
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn reply_at_threshold_is_not_exceeded() {
        let outcome = classify(&Ok(THRESHOLD), THRESHOLD);
        assert_eq!(
            outcome,
            ProbeOutcome::EchoReply {
                elapsed: THRESHOLD,
                exceeded_by: None,
            }
        );
    }

    #[test]
    fn reply_over_threshold() {
        let outcome = classify(&Ok(Duration::from_millis(150)), THRESHOLD);
        assert_eq!(
            outcome,
            ProbeOutcome::EchoReply {
                elapsed: Duration::from_millis(150),
                exceeded_by: Some(Duration::from_millis(50)),
            }
        );
    }

    #[test]
    fn unexpected_reply_is_protocol_error() {
        let err = Error::UnexpectedReply {
            icmp_type: MessageType::V4(IcmpTypes::DestinationUnreachable),
            peer: "192.0.2.1".parse().unwrap(),
        };
        match classify(&Err(err), THRESHOLD) {
            ProbeOutcome::ProtocolError(detail) => {
                assert!(detail.contains("destination unreachable"), "{}", detail);
                assert!(detail.contains("192.0.2.1"), "{}", detail);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn failures_are_classified() {
        let timeout = Error::Timeout {
            seq: 1,
            after: Duration::from_secs(10),
        };
        assert_eq!(classify(&Err(timeout), THRESHOLD), ProbeOutcome::Timeout);

        let denied = Error::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(
            classify(&Err(denied), THRESHOLD),
            ProbeOutcome::SocketError(_)
        ));

        let short = Error::ShortWrite {
            written: 4,
            expected: 8,
        };
        assert!(matches!(
            classify(&Err(short), THRESHOLD),
            ProbeOutcome::SocketError(_)
        ));

        let unresolvable = Error::Unresolvable {
            host: "nowhere.invalid".to_owned(),
            family: AddressFamily::V6,
            reason: "no address".to_owned(),
        };
        assert!(matches!(
            classify(&Err(unresolvable), THRESHOLD),
            ProbeOutcome::Unresolvable(_)
        ));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Exit::Cancelled.code(), 0);
        let err = Error::UnsupportedFamily("ip5".to_owned());
        assert_eq!(Exit::Unresolvable(err).code(), 1);
        let failed = Exit::Failed {
            seq: 3,
            error: Error::IncorrectBufferSize,
        };
        assert_eq!(failed.code(), 1);
    }
}
