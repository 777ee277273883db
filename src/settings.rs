use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 1;

/// Knobs for the probe loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Round trips longer than this are reported as exceeded.
    pub threshold: Duration,
    /// Pause between the end of one probe and the start of the next.
    pub interval: Duration,
    /// How long each probe waits for its reply.
    pub read_timeout: Duration,
    /// Failed probes in a row after which the loop gives up. The default of
    /// one stops at the first failure.
    pub max_consecutive_failures: u32,
}

impl Settings {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: Duration::ZERO,
            interval: DEFAULT_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}
