//! Capabilities that connect the protocol layer to its environment.
//!
//! The layer sits between a [`LowerLayer`] (a message-oriented transport it
//! consumes) and an [`UpperLayer`] (the application it serves). Time is read
//! through an [`Executor`]; timers are deadlines the run loop polls for.

use core::ops::Add;
use core::time::Duration;

/// Message transport beneath the protocol layer.
///
/// Framing, addressing and integrity of the link belong to the implementor.
pub trait LowerLayer {
    /// Queue one message for transmission.
    ///
    /// Returns `false` if a transmission is already pending. The lower layer
    /// signals completion by calling the protocol layer's `on_lower_tx_ready`.
    fn transmit(&mut self, data: &[u8]) -> bool;

    /// Request delivery of the next received message, if any.
    fn receive(&mut self);

    /// True when [`transmit`](Self::transmit) would accept a message.
    fn is_tx_ready(&self) -> bool;
}

/// Application above the protocol layer.
pub trait UpperLayer {
    /// A session is established and data may be sent.
    fn on_open(&mut self);

    /// The session is gone. No further data will be delivered.
    fn on_close(&mut self);

    /// The last message handed to the layer has been fully transmitted.
    fn on_tx_ready(&mut self);

    /// A complete application message arrived.
    ///
    /// Returns `false` if the message was not consumed; the layer keeps it and
    /// offers it again when the application calls `receive()`.
    fn on_rx_ready(&mut self, data: &[u8]) -> bool;
}

/// Clock source driving timeouts and session lifetime checks.
pub trait Executor {
    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Timestamp;

    /// Wall-clock seconds since the Unix epoch, used for certificate validity.
    fn unix_time(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Monotonic millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp from milliseconds since the clock origin.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds since the clock origin.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, or `None` if `earlier` is in the future.
    pub fn checked_since(self, earlier: Timestamp) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_millis)
    }

    /// Time elapsed since `earlier`, clamped at zero.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Move backwards by `duration`, clamped at the origin.
    pub fn saturating_sub(self, duration: Duration) -> Timestamp {
        Self(self.0.saturating_sub(duration_millis(duration)))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Self(self.0.saturating_add(duration_millis(rhs)))
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
