//! Endpoint configuration.

use core::time::Duration;
use ssp_crypto::CryptoSuite;

/// Default maximum nonce for a session.
pub const DEFAULT_MAX_NONCE: u16 = 32768;
/// Default maximum session duration.
pub const DEFAULT_MAX_SESSION_DURATION: Duration = Duration::from_secs(60 * 60);
/// Default largest SessionData payload.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1024;
/// Default largest reassembled message.
pub const DEFAULT_MAX_REASSEMBLY_SIZE: usize = 4096;

/// Delay growth between handshake retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Always wait `retry_timeout`.
    Constant,
    /// Double the delay after each failed attempt, up to `max`.
    Exponential {
        /// Upper bound on the delay.
        max: Duration,
    },
}

/// When and how often the Initiator retries a failed handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub retry_timeout: Duration,
    /// Give up after this many consecutive failures. `None` retries forever.
    pub max_retries: Option<u32>,
    /// Delay growth.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_timeout: Duration::from_secs(5),
            max_retries: None,
            backoff: Backoff::Constant,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), or `None` once retries
    /// are exhausted.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_retries {
            if attempt >= max {
                return None;
            }
        }
        match self.backoff {
            Backoff::Constant => Some(self.retry_timeout),
            Backoff::Exponential { max } => {
                let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
                Some(self.retry_timeout.saturating_mul(factor).min(max))
            }
        }
    }
}

/// Initiator settings.
#[derive(Debug, Clone)]
pub struct InitiatorConfig {
    /// Algorithms requested in RequestHandshakeBegin.
    pub suite: CryptoSuite,
    /// How long to wait for ReplyHandshakeBegin.
    pub response_timeout: Duration,
    /// Retry behaviour after a failed handshake.
    pub retry: RetryPolicy,
    /// Maximum nonce requested for the session.
    pub max_nonce: u16,
    /// Session lifetime requested.
    pub max_session_duration: Duration,
    /// Renegotiate once either nonce reaches this value.
    pub nonce_renegotiation_trigger: u16,
    /// Renegotiate once the session is this old.
    pub session_renegotiation_trigger: Duration,
}

impl Default for InitiatorConfig {
    fn default() -> Self {
        Self {
            suite: CryptoSuite::default(),
            response_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            max_nonce: DEFAULT_MAX_NONCE,
            max_session_duration: DEFAULT_MAX_SESSION_DURATION,
            nonce_renegotiation_trigger: DEFAULT_MAX_NONCE - 1024,
            session_renegotiation_trigger: DEFAULT_MAX_SESSION_DURATION
                - Duration::from_secs(10),
        }
    }
}

impl InitiatorConfig {
    /// Replace the requested algorithms.
    pub fn with_suite(mut self, suite: CryptoSuite) -> Self {
        self.suite = suite;
        self
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the maximum nonce; the renegotiation trigger follows it.
    pub fn with_max_nonce(mut self, max_nonce: u16) -> Self {
        self.max_nonce = max_nonce;
        self.nonce_renegotiation_trigger = max_nonce.saturating_sub(1024);
        self
    }

    /// Set the session duration; the renegotiation trigger follows it.
    pub fn with_max_session_duration(mut self, duration: Duration) -> Self {
        self.max_session_duration = duration;
        self.session_renegotiation_trigger = duration.saturating_sub(Duration::from_secs(10));
        self
    }

    /// Override the nonce renegotiation trigger.
    pub fn with_nonce_renegotiation_trigger(mut self, trigger: u16) -> Self {
        self.nonce_renegotiation_trigger = trigger;
        self
    }

    /// Override the session age renegotiation trigger.
    pub fn with_session_renegotiation_trigger(mut self, trigger: Duration) -> Self {
        self.session_renegotiation_trigger = trigger;
        self
    }

    /// Requested session duration in wire units, saturating at `u32::MAX` ms.
    pub fn max_session_duration_ms(&self) -> u32 {
        u32::try_from(self.max_session_duration.as_millis()).unwrap_or(u32::MAX)
    }
}

/// Responder limits applied to whatever the Initiator requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderConfig {
    /// Largest nonce the Responder will accept.
    pub max_nonce: u16,
    /// Longest session the Responder will accept.
    pub max_session_duration: Duration,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            max_nonce: DEFAULT_MAX_NONCE,
            max_session_duration: DEFAULT_MAX_SESSION_DURATION,
        }
    }
}

impl ResponderConfig {
    /// Set the nonce limit.
    pub fn with_max_nonce(mut self, max_nonce: u16) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    /// Set the duration limit.
    pub fn with_max_session_duration(mut self, duration: Duration) -> Self {
        self.max_session_duration = duration;
        self
    }
}

/// Per-message session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Largest SessionData payload produced (user data plus tag).
    pub max_payload_size: usize,
    /// In greater-than mode, how many nonces a message may skip over.
    /// `None` accepts any larger nonce.
    pub max_nonce_skip: Option<u16>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            max_nonce_skip: None,
        }
    }
}

impl SessionConfig {
    /// Set the payload limit.
    pub fn with_max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Bound nonce skips in greater-than mode.
    pub fn with_max_nonce_skip(mut self, skip: u16) -> Self {
        self.max_nonce_skip = Some(skip);
        self
    }
}

/// Layer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerConfig {
    /// Largest message reassembled from fragments.
    pub max_reassembly_size: usize,
    /// Session settings.
    pub session: SessionConfig,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_reassembly_size: DEFAULT_MAX_REASSEMBLY_SIZE,
            session: SessionConfig::default(),
        }
    }
}

impl LayerConfig {
    /// Set the reassembly limit.
    pub fn with_max_reassembly_size(mut self, size: usize) -> Self {
        self.max_reassembly_size = size;
        self
    }

    /// Replace the session settings.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}
