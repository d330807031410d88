//! Outbound message held while its fragments are transmitted.

/// Progress of the application's current outbound message.
#[derive(Debug, Default)]
pub struct TxState {
    message: Option<Vec<u8>>,
    sent: usize,
    in_flight: Option<usize>,
}

impl TxState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new message. Returns `false` while another is still being sent.
    pub fn initialize(&mut self, data: &[u8]) -> bool {
        if self.message.is_some() {
            return false;
        }
        self.message = Some(data.to_vec());
        self.sent = 0;
        self.in_flight = None;
        true
    }

    /// True while a message is held.
    pub fn is_active(&self) -> bool {
        self.message.is_some()
    }

    /// True while a fragment awaits transmit completion.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True until the first fragment has gone out.
    pub fn is_first(&self) -> bool {
        self.sent == 0
    }

    /// Bytes not yet handed to the lower layer.
    pub fn remainder(&self) -> &[u8] {
        match &self.message {
            Some(message) => &message[self.sent..],
            None => &[],
        }
    }

    /// Record that a fragment of `consumed` bytes was handed to the lower layer.
    pub fn begin_transmit(&mut self, consumed: usize) {
        self.in_flight = Some(consumed);
    }

    /// The in-flight fragment finished. Returns `true` when the whole message
    /// has now been sent.
    pub fn on_tx_complete(&mut self) -> bool {
        let Some(consumed) = self.in_flight.take() else {
            return false;
        };
        self.sent += consumed;
        let done = self
            .message
            .as_ref()
            .map_or(false, |message| self.sent >= message.len());
        if done {
            self.message = None;
            self.sent = 0;
        }
        done
    }

    /// Restart the message from its first byte, e.g. after new session keys.
    ///
    /// No-op once the final fragment is in flight.
    pub fn rewind(&mut self) {
        let Some(message) = &self.message else {
            return;
        };
        let in_flight = self.in_flight.unwrap_or(0);
        if self.in_flight.is_some() && self.sent + in_flight >= message.len() {
            return;
        }
        self.sent = 0;
        self.in_flight = None;
    }

    /// Drop the message.
    pub fn reset(&mut self) {
        self.message = None;
        self.sent = 0;
        self.in_flight = None;
    }
}
