#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::backoff::Backoff;

const DEFAULT_HEARTBEAT_INTERVAL_DURATION: Duration = Duration::from_secs(25);
const DEFAULT_HEARTBEAT_TIMEOUT_DURATION: Duration = Duration::from_secs(20);
const DEFAULT_CONNECT_TIMEOUT_DURATION: Duration = Duration::from_secs(20);
const DEFAULT_RECONNECT_DELAY_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RECONNECT_DELAY_DURATION: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Configuration for WebSocket client behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval between WebSocket ping frames
    pub heartbeat_interval: Duration,
    /// Maximum time to wait for the pong before treating the connection as dropped
    pub heartbeat_timeout: Duration,
    /// Maximum time a single handshake may take
    pub connect_timeout: Duration,
    /// Reconnection strategy configuration
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_DURATION,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT_DURATION,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_DURATION,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for automatic reconnection behavior.
///
/// Delays grow linearly: the n-th attempt waits `delay * n`, never more than `max_delay`.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts before giving up.
    /// `None` means infinite retries.
    pub max_attempts: Option<u32>,
    /// Delay before the first reconnection attempt, and the per-attempt increment
    pub delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_RECONNECT_ATTEMPTS),
            delay: DEFAULT_RECONNECT_DELAY_DURATION,
            max_delay: DEFAULT_MAX_RECONNECT_DELAY_DURATION,
        }
    }
}

impl ReconnectConfig {
    /// Whether `attempt` (1-based) is still within the configured budget.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Linear backoff with a floor and a ceiling.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    delay: Duration,
    max_delay: Duration,
    step: u32,
}

impl LinearBackoff {
    #[must_use]
    pub const fn new(delay: Duration, max_delay: Duration) -> Self {
        Self {
            delay,
            max_delay,
            step: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.step = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.step = self.step.saturating_add(1);
        let next = self
            .delay
            .checked_mul(self.step)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        Some(next.max(self.delay.min(self.max_delay)))
    }
}

impl From<ReconnectConfig> for LinearBackoff {
    fn from(config: ReconnectConfig) -> Self {
        LinearBackoff::new(config.delay, config.max_delay)
    }
}
