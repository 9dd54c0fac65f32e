use std::sync::Arc;
use std::time::Duration;

use crate::error::CoreError;

/// Upper bound for a single retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Whether an operation may be retried after a transient failure.
///
/// Only [`CoreError::Network`] counts as transient; a backend answer is a
/// definite decision and is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Never,
    /// Up to `retries` extra attempts, waiting `base_delay * 2^n` (capped
    /// at 30 s) before attempt `n + 1`.
    Transient { retries: u32, base_delay: Duration },
}

impl RetryPolicy {
    /// Default for reads: two retries starting at one second.
    pub const READS: Self = Self::Transient {
        retries: 2,
        base_delay: Duration::from_secs(1),
    };

    /// Delay before retry number `attempt` (zero-based), or `None` when the
    /// error or the policy rules out another try.
    pub fn next_delay(&self, attempt: u32, err: &CoreError) -> Option<Duration> {
        match *self {
            Self::Never => None,
            Self::Transient {
                retries,
                base_delay,
            } => {
                if attempt >= retries || !err.is_transient() {
                    return None;
                }
                let factor = 2u32.saturating_pow(attempt);
                Some(base_delay.saturating_mul(factor).min(MAX_RETRY_DELAY))
            }
        }
    }
}

/// Per-read cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a successful result is served without refetching.
    pub stale_time: Duration,
    pub retry: RetryPolicy,
    /// Disabled reads return an idle state without any I/O.
    pub enabled: bool,
}

impl QueryOptions {
    pub fn fresh_for(stale_time: Duration) -> Self {
        Self {
            stale_time,
            retry: RetryPolicy::READS,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::fresh_for(Duration::from_secs(5 * 60))
    }
}

/// What a read exposes to its caller.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    /// Last good result. Kept alongside an error from a later refetch.
    pub data: Option<Arc<T>>,
    pub is_loading: bool,
    pub error: Option<CoreError>,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.data.is_none() && !self.is_loading && self.error.is_none()
    }

    /// Prefer the error: a failed refetch is reported even if stale data
    /// is still around. `None` for an idle read.
    pub fn into_result(self) -> Option<Result<Arc<T>, CoreError>> {
        match (self.error, self.data) {
            (Some(e), _) => Some(Err(e)),
            (None, Some(d)) => Some(Ok(d)),
            (None, None) => None,
        }
    }
}

/// What a write exposes to its caller.
#[derive(Debug, Clone, Default)]
pub struct MutationState {
    pub is_pending: bool,
    pub error: Option<CoreError>,
}
