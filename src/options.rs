use std::time::Duration;

/// Statuses that count as a failed attempt and are retried.
pub const RETRYABLE_STATUSES: [u16; 6] = [502, 429, 425, 504, 408, 503];

/// Governs which failures are retried, how often, and with what delay.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total number of tries, the initial one included.
    pub max_attempts: usize,
    /// Fixed delay before every retry, in milliseconds. There is no backoff growth.
    pub base_delay_ms: u64,
    /// Response statuses treated as transient.
    pub retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    /// Policy that performs exactly one try.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub(crate) fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    pub(crate) fn delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2_000,
            retryable_statuses: RETRYABLE_STATUSES.to_vec(),
        }
    }
}

/// Configures HTTP timeout, default headers and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Value of the `user-agent` header sent with every request.
    pub user_agent: String,
    /// Retry behavior shared by every operation of a session.
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 100_000,
            user_agent: "kvs-client".to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}
