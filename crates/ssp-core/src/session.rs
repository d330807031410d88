//! Established session: nonce tracking and per-message protection.
//!
//! A session is installed from a [`SessionInit`] after each successful
//! handshake and replaced wholesale by the next one. Outbound payloads become
//! authenticated SessionData messages; inbound ones are checked in order:
//! nonce, nonce limit, session age, then the crypto mode.

use crate::algorithms::SessionAlgorithms;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::handshake::{SessionInit, SessionKeys, SessionParams};
use crate::message::{AuthMetadata, SessionData, SessionFlags};
use ssp_crypto::keys::SymmetricKey;
use ssp_crypto::suite::{SessionCryptoMode, SessionNonceMode};
use ssp_crypto::CryptoBackend;
use ssp_platform::Timestamp;
use tracing::{debug, trace, warn};

/// Length of the authentication tag for both session modes.
pub const TAG_LENGTH: usize = 16;

/// One outbound SessionData message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    /// Serialized SessionData.
    pub bytes: Vec<u8>,
    /// How many bytes of the user payload it carries.
    pub consumed: usize,
}

/// Counters of inbound message outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Messages accepted.
    pub num_success: u64,
    /// Messages failing tag verification.
    pub num_auth_fail: u64,
    /// Messages with a replayed, skipped or out-of-range nonce.
    pub num_nonce_fail: u64,
    /// Messages rejected because the session expired.
    pub num_expired: u64,
    /// Messages received with no session installed.
    pub num_no_session: u64,
}

struct ActiveSession {
    algorithms: SessionAlgorithms,
    params: SessionParams,
    keys: SessionKeys,
    rx_nonce: u16,
    tx_nonce: u16,
}

impl ActiveSession {
    fn is_expired(&self, now: Timestamp) -> bool {
        now.saturating_since(self.params.start_time) > self.params.max_session_duration
    }
}

/// Session state for one endpoint.
pub struct Session {
    config: SessionConfig,
    active: Option<ActiveSession>,
    statistics: Statistics,
}

impl Session {
    /// Session with no keys installed.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            active: None,
            statistics: Statistics::default(),
        }
    }

    /// Install keys from a completed handshake and reset both nonces.
    pub fn initialize(&mut self, init: SessionInit) {
        debug!(
            max_nonce = init.params.max_nonce,
            duration_ms = init.params.max_session_duration.as_millis() as u64,
            "session initialized"
        );
        self.active = Some(ActiveSession {
            algorithms: init.algorithms,
            params: init.params,
            keys: init.keys,
            rx_nonce: 0,
            tx_nonce: 0,
        });
    }

    /// Drop the keys.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// True while keys are installed.
    pub fn is_valid(&self) -> bool {
        self.active.is_some()
    }

    /// Last nonce sent.
    pub fn tx_nonce(&self) -> Option<u16> {
        self.active.as_ref().map(|s| s.tx_nonce)
    }

    /// Last nonce accepted.
    pub fn rx_nonce(&self) -> Option<u16> {
        self.active.as_ref().map(|s| s.rx_nonce)
    }

    /// Inbound counters.
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Settings in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Protect as much of `payload` as fits in one message.
    ///
    /// Exhausting the nonce space or outliving the session is fatal and
    /// drops the keys.
    pub fn format_session_message(
        &mut self,
        backend: &dyn CryptoBackend,
        is_first: bool,
        now: Timestamp,
        payload: &[u8],
    ) -> Result<FormattedMessage, SessionError> {
        let Some(active) = self.active.as_mut() else {
            return Err(SessionError::NoValidSession);
        };

        if active.tx_nonce >= active.params.max_nonce {
            warn!(nonce = active.tx_nonce, "tx nonce exhausted");
            self.active = None;
            return Err(SessionError::NonceExhausted);
        }
        if active.is_expired(now) {
            warn!("session expired on transmit");
            self.active = None;
            return Err(SessionError::SessionExpired);
        }

        let mode = active.algorithms.session_mode;
        let take = payload
            .len()
            .min(max_writable_user_data_length(mode, self.config.max_payload_size));
        if take == 0 && !payload.is_empty() {
            return Err(SessionError::BadBufferSize);
        }

        let nonce = active.tx_nonce + 1;
        let metadata = AuthMetadata {
            nonce,
            flags: SessionFlags {
                fir: is_first,
                fin: take == payload.len(),
            },
        };
        let protected =
            write_payload(backend, mode, &active.keys.tx_key, &metadata, &payload[..take])?;
        let bytes = SessionData {
            metadata,
            payload: protected,
        }
        .serialize()
        .map_err(|_| SessionError::BadBufferSize)?;

        active.tx_nonce = nonce;
        trace!(nonce, len = take, fin = metadata.flags.fin, "session message formatted");
        Ok(FormattedMessage {
            bytes,
            consumed: take,
        })
    }

    /// Authenticate an inbound message and return its user data.
    ///
    /// The receive nonce only advances when every check passes.
    pub fn validate_message(
        &mut self,
        backend: &dyn CryptoBackend,
        msg: &SessionData,
        now: Timestamp,
    ) -> Result<Vec<u8>, SessionError> {
        let Some(active) = self.active.as_mut() else {
            self.statistics.num_no_session += 1;
            return Err(SessionError::NoValidSession);
        };
        let nonce = msg.metadata.nonce;

        if !verify_nonce(
            active.algorithms.nonce_mode,
            active.rx_nonce,
            nonce,
            self.config.max_nonce_skip,
        ) {
            debug!(last = active.rx_nonce, nonce, "nonce rejected");
            self.statistics.num_nonce_fail += 1;
            return Err(SessionError::NonceReplay);
        }
        if nonce > active.params.max_nonce {
            debug!(nonce, max = active.params.max_nonce, "nonce beyond session maximum");
            self.statistics.num_nonce_fail += 1;
            return Err(SessionError::MaxNonceExceeded);
        }
        if active.is_expired(now) {
            warn!("session expired on receive");
            self.statistics.num_expired += 1;
            self.active = None;
            return Err(SessionError::SessionExpired);
        }

        let data = read_payload(
            backend,
            active.algorithms.session_mode,
            &active.keys.rx_key,
            &msg.metadata,
            &msg.payload,
        )
        .map_err(|e| {
            if e == SessionError::AuthenticationFailure {
                self.statistics.num_auth_fail += 1;
            }
            e
        })?;

        active.rx_nonce = nonce;
        self.statistics.num_success += 1;
        Ok(data)
    }
}

/// Check a received nonce against the last accepted one.
///
/// `max_skip` bounds how many nonces a message in greater-than mode may skip
/// over; `Some(0)` behaves like strict increment.
pub fn verify_nonce(
    mode: SessionNonceMode,
    last: u16,
    nonce: u16,
    max_skip: Option<u16>,
) -> bool {
    match mode {
        SessionNonceMode::IncrementLastRx => last.checked_add(1) == Some(nonce),
        SessionNonceMode::GreaterThanLastRx => {
            nonce > last && max_skip.map_or(true, |skip| nonce - last - 1 <= skip)
        }
    }
}

/// Largest user data that fits a payload of `max_payload_size` bytes.
pub fn max_writable_user_data_length(mode: SessionCryptoMode, max_payload_size: usize) -> usize {
    match mode {
        SessionCryptoMode::HmacSha256Trunc16 | SessionCryptoMode::Aes256Gcm => {
            max_payload_size.saturating_sub(TAG_LENGTH)
        }
    }
}

fn write_payload(
    backend: &dyn CryptoBackend,
    mode: SessionCryptoMode,
    key: &SymmetricKey,
    metadata: &AuthMetadata,
    data: &[u8],
) -> Result<Vec<u8>, SessionError> {
    let ad = metadata.to_bytes();
    match mode {
        SessionCryptoMode::HmacSha256Trunc16 => {
            let mac = backend
                .hmac_sha256(&key[..], &[&ad[..], data])
                .map_err(|_| SessionError::CryptoFailure)?;
            let mut out = Vec::with_capacity(data.len() + TAG_LENGTH);
            out.extend_from_slice(data);
            out.extend_from_slice(&mac[..TAG_LENGTH]);
            Ok(out)
        }
        SessionCryptoMode::Aes256Gcm => backend
            .aes256_gcm_encrypt(key, metadata.nonce, &ad, data)
            .map_err(|_| SessionError::CryptoFailure),
    }
}

fn read_payload(
    backend: &dyn CryptoBackend,
    mode: SessionCryptoMode,
    key: &SymmetricKey,
    metadata: &AuthMetadata,
    payload: &[u8],
) -> Result<Vec<u8>, SessionError> {
    if payload.len() < TAG_LENGTH {
        return Err(SessionError::BadBufferSize);
    }
    let ad = metadata.to_bytes();
    match mode {
        SessionCryptoMode::HmacSha256Trunc16 => {
            let (data, tag) = payload.split_at(payload.len() - TAG_LENGTH);
            let mac = backend
                .hmac_sha256(&key[..], &[&ad[..], data])
                .map_err(|_| SessionError::CryptoFailure)?;
            if !backend.secure_equals(&mac[..TAG_LENGTH], tag) {
                return Err(SessionError::AuthenticationFailure);
            }
            Ok(data.to_vec())
        }
        SessionCryptoMode::Aes256Gcm => backend
            .aes256_gcm_decrypt(key, metadata.nonce, &ad, payload)
            .map_err(|_| SessionError::AuthenticationFailure),
    }
}
