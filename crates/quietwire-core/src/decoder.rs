//! Receiver-side chunk decoder.
//!
//! One call to [`ChunkDecoder::decrypt_and_validate_chunk`] takes a full
//! wire chunk through the validation pipeline:
//!
//! ```text
//! split frame → rate gate → unwrap key → open AEAD → split envelope
//!     → freshness check → ordering check → plaintext
//! ```
//!
//! A failure at any step rejects the frame and leaves decoder state alone,
//! with one documented exception: the rate gate stamps its "last attempt"
//! time whenever the gate itself passes, so a frame that later fails
//! authentication still pushes the rate window. A rejected (rate-limited)
//! attempt does not.
//!
//! The decoder owns the session's RSA key pair. Its public half is exported
//! through [`ChunkDecoder::public_key_pem`] and must reach the encoder side
//! before traffic starts; that handshake lives outside the core.

use std::time::Duration;

use quietwire_crypto::{CryptoError, KeyPair, aead};
use quietwire_proto::envelope;
use quietwire_proto::{ControlCodeDescriptor, FrameLayout, WireTimestamp};

use crate::clock::{Clock, SystemClock};
use crate::error::DecodeError;
use crate::sequence::SequenceState;

/// Validation policy for a decoder instance.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Minimum interval between decrypt attempts. Zero disables the gate.
    pub rate_limit: Duration,
    /// Maximum age an embedded timestamp may have; the boundary value is
    /// accepted.
    pub freshness_window: Duration,
    /// Mirror peers whose sequence tracker never advances; see
    /// [`SequenceState::with_legacy_tracking`].
    pub legacy_sequence_tracking: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_secs(1),
            freshness_window: Duration::from_secs(5 * 60),
            legacy_sequence_tracking: false,
        }
    }
}

/// Unframes, decrypts, and validates incoming chunks.
///
/// One consumer per decoder; expose a shared instance behind a mutex if
/// several tasks must feed it.
#[derive(Debug)]
pub struct ChunkDecoder<C: Clock = SystemClock> {
    keys: KeyPair,
    descriptor: ControlCodeDescriptor,
    layout: FrameLayout,
    config: DecoderConfig,
    sequence: SequenceState,
    last_attempt: Option<WireTimestamp>,
    clock: C,
}

impl ChunkDecoder<SystemClock> {
    /// Create a decoder with default layout and policy.
    #[must_use]
    pub fn new(keys: KeyPair, descriptor: ControlCodeDescriptor) -> Self {
        Self::with_config(keys, descriptor, FrameLayout::default(), DecoderConfig::default())
    }

    /// Create a decoder with explicit layout and policy.
    #[must_use]
    pub fn with_config(
        keys: KeyPair,
        descriptor: ControlCodeDescriptor,
        layout: FrameLayout,
        config: DecoderConfig,
    ) -> Self {
        Self::with_clock(keys, descriptor, layout, config, SystemClock)
    }
}

impl<C: Clock> ChunkDecoder<C> {
    /// Create a decoder with an explicit clock (tests, simulation).
    #[must_use]
    pub fn with_clock(
        keys: KeyPair,
        descriptor: ControlCodeDescriptor,
        layout: FrameLayout,
        config: DecoderConfig,
        clock: C,
    ) -> Self {
        let sequence = if config.legacy_sequence_tracking {
            SequenceState::with_legacy_tracking()
        } else {
            SequenceState::new()
        };
        Self {
            keys,
            descriptor,
            layout,
            config,
            sequence,
            last_attempt: None,
            clock,
        }
    }

    /// The session descriptor shared with the peer.
    #[must_use]
    pub fn descriptor(&self) -> &ControlCodeDescriptor {
        &self.descriptor
    }

    /// Current ordering state.
    #[must_use]
    pub fn sequence(&self) -> &SequenceState {
        &self.sequence
    }

    /// Export our public key as SPKI PEM for the out-of-band handshake.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.keys.public_key_pem()
    }

    /// Decrypt and validate one full chunk, returning the application bytes.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`]; classification only, no retries. Key-unwrap and
    /// AEAD failures both surface as [`DecodeError::TamperedOrCorrupt`] —
    /// the difference is not observable and both are fatal to the frame.
    pub fn decrypt_and_validate_chunk(&mut self, chunk: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let parts = self.layout.split(chunk)?;

        let now = self.clock.now();
        self.check_rate_limit(now)?;

        let key = self
            .keys
            .unwrap_key(parts.wrapped_key)
            .map_err(|_| DecodeError::TamperedOrCorrupt)?;
        let plain = aead::open(&key, parts.sealed).map_err(|_| DecodeError::TamperedOrCorrupt)?;

        let (payload, timestamp) =
            envelope::split(&plain).map_err(|_| DecodeError::TamperedOrCorrupt)?;
        let message = envelope::strip_padding(payload);

        self.validate_freshness(timestamp, now)?;

        let candidate = self.sequence.next_candidate();
        self.sequence.accept(candidate)?;

        tracing::trace!(sequence = candidate, len = message.len(), "accepted chunk");
        Ok(message.to_vec())
    }

    fn check_rate_limit(&mut self, now: WireTimestamp) -> Result<(), DecodeError> {
        let limit_secs = self.config.rate_limit.as_secs_f64();
        if let Some(last) = self.last_attempt {
            let elapsed_secs = last.age_at(now);
            if elapsed_secs < limit_secs {
                tracing::debug!(elapsed_secs, limit_secs, "rate gate rejected chunk");
                return Err(DecodeError::RateLimited {
                    elapsed_secs,
                    limit_secs,
                });
            }
        }
        // Stamp on every gate-passing attempt, not only on fully validated
        // frames.
        self.last_attempt = Some(now);
        Ok(())
    }

    fn validate_freshness(
        &self,
        timestamp: WireTimestamp,
        now: WireTimestamp,
    ) -> Result<(), DecodeError> {
        let age_secs = timestamp.age_at(now);
        let window_secs = self.config.freshness_window.as_secs_f64();
        if age_secs > window_secs || age_secs < 0.0 {
            tracing::warn!(age_secs, window_secs, "timestamp outside freshness window");
            return Err(DecodeError::StaleOrFutureTimestamp { age_secs });
        }
        Ok(())
    }
}
