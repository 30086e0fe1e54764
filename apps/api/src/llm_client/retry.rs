//! Backoff policy and server retry-hint parsing.

use std::time::Duration;

use rand::Rng;

/// How many times each model is tried and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per model, including the first one.
    pub max_attempts: u32,
    /// Base of the exponential backoff; doubles with every attempt index.
    pub base_delay: Duration,
    /// Exclusive upper bound of the uniform jitter added to computed delays.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Exponential component for an attempt index: base, 2×base, 4×base, ...
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay before retrying after `attempt` failed.
    /// A server-suggested delay wins over the computed backoff.
    pub fn backoff_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint,
            None => self.base_delay_for(attempt).saturating_add(self.jitter()),
        }
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max))
    }
}

/// Parses a `Retry-After` header given in whole seconds.
/// HTTP-date values are not used by the Gemini API and yield `None`.
pub fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Parses a protobuf-style duration string such as `"13s"` or `"1.5s"`.
pub fn parse_retry_delay(value: &str) -> Option<Duration> {
    let seconds = value.trim().strip_suffix('s')?.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
