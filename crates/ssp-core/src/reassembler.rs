//! Reassembly of fragmented application messages.

use crate::error::ReassemblyError;

/// Outcome of feeding one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyResult {
    /// More fragments are needed.
    Partial,
    /// The message is complete and available from [`Reassembler::data`].
    Complete,
}

/// Joins FIR..FIN fragment runs with consecutive nonces.
#[derive(Debug)]
pub struct Reassembler {
    max_size: usize,
    buffer: Vec<u8>,
    last_nonce: Option<u16>,
    complete: bool,
}

impl Reassembler {
    /// Reassembler bounded to `max_size` bytes per message.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            buffer: Vec::new(),
            last_nonce: None,
            complete: false,
        }
    }

    /// Feed a fragment.
    ///
    /// A first fragment discards any partial message. Any error also discards
    /// the partial message.
    pub fn process(
        &mut self,
        is_first: bool,
        is_last: bool,
        nonce: u16,
        fragment: &[u8],
    ) -> Result<ReassemblyResult, ReassemblyError> {
        if is_first {
            self.reset();
        } else {
            let Some(last) = self.last_nonce else {
                self.reset();
                return Err(ReassemblyError::NoPriorFirst);
            };
            let expected = last.wrapping_add(1);
            if nonce != expected {
                self.reset();
                return Err(ReassemblyError::NonceGap {
                    expected,
                    actual: nonce,
                });
            }
        }

        let total = self.buffer.len() + fragment.len();
        if total > self.max_size {
            self.reset();
            return Err(ReassemblyError::Overflow(total));
        }
        self.buffer.extend_from_slice(fragment);

        if is_last {
            self.last_nonce = None;
            self.complete = true;
            Ok(ReassemblyResult::Complete)
        } else {
            self.last_nonce = Some(nonce);
            Ok(ReassemblyResult::Partial)
        }
    }

    /// The completed message, if the last fragment has arrived.
    pub fn data(&self) -> Option<&[u8]> {
        self.complete.then_some(self.buffer.as_slice())
    }

    /// Discard everything.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_nonce = None;
        self.complete = false;
    }
}
