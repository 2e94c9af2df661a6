//! Sender-side chunk encoder.
//!
//! The encoder buffers outgoing application bytes and in-band control
//! markers, then [`ChunkEncoder::flush`] drains the buffer into fixed-size
//! wire frames. Per frame:
//!
//! 1. Take up to `message_chunk_length` bytes from the buffer front and
//!    right-pad the fragment with zeros to exactly that slot length.
//! 2. Build the plaintext envelope (block padding plus trailing timestamp).
//! 3. Seal the envelope under a fresh AES-128 key with a random nonce.
//! 4. If the sealed payload overruns the frame budget, shrink the readied
//!    fragment by 10% and re-seal — bounded, with a fresh key per attempt.
//! 5. Wrap the symmetric key under the peer's RSA public key.
//! 6. Assemble the frame and drop the consumed bytes from the buffer.
//!
//! `message_chunk_length` is a conservative estimate: 75% of the chunk minus
//! the timestamp and a fixed metadata reserve. The reserve is deliberately
//! smaller than the real 256-byte key wrap — it is part of the shared chunk
//! geometry and changing it would change every fragment boundary on the
//! wire. With the default layout the sealed size works out deterministic and
//! the shrink loop exists only to guard estimation drift.

use bytes::BytesMut;
use quietwire_crypto::{PeerPublicKey, SymmetricKey, aead};
use quietwire_proto::frame::{LENGTH_FIELD_LEN, NONCE_LEN};
use quietwire_proto::envelope::{self, TIMESTAMP_LEN};
use quietwire_proto::{ControlCode, ControlCodeDescriptor, FrameLayout, WireFrame};

use crate::clock::{Clock, SystemClock};
use crate::error::EncodeError;

/// Wrapped-key reserve the chunk sizing math assumes, in bytes.
///
/// Fixed by the shared chunk geometry; see the module docs.
const KEY_RESERVE_LEN: usize = 48;

/// Metadata reserve: estimated key wrap plus the length field.
const METADATA_LEN: usize = KEY_RESERVE_LEN + LENGTH_FIELD_LEN;

/// Fraction of the remaining budget a fragment may claim.
const CHUNK_FILL_RATIO: f64 = 0.75;

/// Bound on the adaptive shrink loop.
const MAX_RESIZE_ATTEMPTS: usize = 16;

/// Buffers outgoing data and drains it into encrypted wire frames.
///
/// One producer per encoder; expose a shared instance behind a mutex if
/// several tasks must append.
#[derive(Debug)]
pub struct ChunkEncoder<C: Clock = SystemClock> {
    descriptor: ControlCodeDescriptor,
    peer_key: PeerPublicKey,
    layout: FrameLayout,
    buffer: BytesMut,
    clock: C,
}

impl ChunkEncoder<SystemClock> {
    /// Create an encoder with the default frame layout and system clock.
    #[must_use]
    pub fn new(descriptor: ControlCodeDescriptor, peer_key: PeerPublicKey) -> Self {
        Self::with_layout(descriptor, peer_key, FrameLayout::default())
    }

    /// Create an encoder with an explicit frame layout.
    #[must_use]
    pub fn with_layout(
        descriptor: ControlCodeDescriptor,
        peer_key: PeerPublicKey,
        layout: FrameLayout,
    ) -> Self {
        Self::with_clock(descriptor, peer_key, layout, SystemClock)
    }
}

impl<C: Clock> ChunkEncoder<C> {
    /// Create an encoder with an explicit clock (tests, simulation).
    #[must_use]
    pub fn with_clock(
        descriptor: ControlCodeDescriptor,
        peer_key: PeerPublicKey,
        layout: FrameLayout,
        clock: C,
    ) -> Self {
        Self {
            descriptor,
            peer_key,
            layout,
            buffer: BytesMut::new(),
            clock,
        }
    }

    /// The session descriptor this encoder renders markers from.
    #[must_use]
    pub fn descriptor(&self) -> &ControlCodeDescriptor {
        &self.descriptor
    }

    /// Bytes currently buffered and not yet flushed.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Plaintext bytes one fragment slot holds.
    #[must_use]
    pub fn message_chunk_length(&self) -> usize {
        let budget = self.layout.chunk_size - METADATA_LEN - TIMESTAMP_LEN;
        (budget as f64 * CHUNK_FILL_RATIO) as usize
    }

    /// Append one application message, terminated by the in-band end marker.
    ///
    /// Text is appended as its UTF-8 bytes.
    pub fn add_message(&mut self, message: impl AsRef<[u8]>) -> Result<(), EncodeError> {
        let end = self.descriptor.get_control_code(ControlCode::End)?;
        self.buffer.extend_from_slice(message.as_ref());
        self.buffer.extend_from_slice(end.as_bytes());
        Ok(())
    }

    /// Append a control marker, optionally preceded by `extra` payload text.
    ///
    /// Used for events that carry no message of their own (shutdown, input
    /// request).
    pub fn send_control_code(&mut self, code: ControlCode, extra: &str) -> Result<(), EncodeError> {
        let token = self.descriptor.get_control_code(code)?;
        self.buffer.extend_from_slice(extra.as_bytes());
        self.buffer.extend_from_slice(token.as_bytes());
        Ok(())
    }

    /// Drain the buffer into zero or more ready-to-send frames, in order.
    ///
    /// The buffer is empty afterwards iff every byte was consumed; on error
    /// the already-consumed fragments are lost to the caller, so treat a
    /// failed flush as fatal to the session.
    pub fn flush(&mut self) -> Result<Vec<WireFrame>, EncodeError> {
        let mut frames = Vec::new();
        let slot_len = self.message_chunk_length();

        while !self.buffer.is_empty() {
            let take = slot_len.min(self.buffer.len());
            let mut readied = self.buffer[..take].to_vec();
            readied.resize(slot_len, 0);

            let (sealed, key, consumed) = self.seal_adjusted(&readied)?;
            let wrapped = self.peer_key.wrap_key(&key)?;
            let frame = self.layout.assemble(&sealed, &wrapped)?;

            // Consume the sealed fragment's unpadded length. When the buffer
            // tail was shorter than the slot, the fragment covers it all.
            let consumed = consumed.min(self.buffer.len());
            let _ = self.buffer.split_to(consumed);
            frames.push(frame);
        }

        tracing::debug!(frames = frames.len(), "flushed outgoing buffer");
        Ok(frames)
    }

    /// Seal a readied fragment, shrinking it until the sealed payload fits
    /// the frame budget.
    ///
    /// Returns the sealed payload, its key, and how many fragment bytes were
    /// actually sealed.
    fn seal_adjusted(
        &self,
        readied: &[u8],
    ) -> Result<(Vec<u8>, SymmetricKey, usize), EncodeError> {
        let estimate_budget =
            self.layout.chunk_size - NONCE_LEN - TIMESTAMP_LEN - METADATA_LEN;
        let budget = estimate_budget.min(self.layout.ciphertext_capacity());

        let mut fragment: &[u8] = readied;
        for attempt in 0..MAX_RESIZE_ATTEMPTS {
            let key = SymmetricKey::generate();
            let envelope = envelope::build(fragment, self.clock.now());
            let sealed = aead::seal(&key, &envelope)?;

            if sealed.len() <= budget {
                if attempt > 0 {
                    tracing::debug!(
                        attempt,
                        fragment_len = fragment.len(),
                        "shrunk fragment to fit frame budget"
                    );
                }
                return Ok((sealed, key, fragment.len()));
            }
            fragment = &fragment[..(fragment.len() * 9 / 10).max(1)];
        }

        Err(EncodeError::FrameSizeExceeded {
            attempts: MAX_RESIZE_ATTEMPTS,
        })
    }
}
