//! Typed errors for the wire-format layer.
//!
//! Everything that can be malformed on the wire or in a descriptor is a
//! distinct variant so callers can classify failures without string matching.
//! None of these are retried by the protocol core; retry policy belongs to
//! the surrounding transport.

use thiserror::Error;

use crate::descriptor::ControlCode;

/// Errors from the control-code descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The descriptor's code table has no literal for this control code.
    #[error("no literal registered for control code `{code}`")]
    UnknownControlName {
        /// The code that was requested.
        code: ControlCode,
    },

    /// A candidate token does not carry both control markers.
    #[error("token does not start and end with the control markers")]
    MalformedToken,

    /// Descriptor fields violate a construction invariant.
    #[error("invalid descriptor: {reason}")]
    InvalidDescriptor {
        /// Which invariant was violated.
        reason: String,
    },

    /// The descriptor could not be (de)serialized.
    #[error("descriptor serialization failed: {0}")]
    Serialization(String),
}

/// Errors from chunk and envelope layout handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A chunk is not exactly the configured frame size.
    #[error("frame length mismatch: expected {expected} bytes, got {actual}")]
    InvalidFrameLength {
        /// Configured chunk size.
        expected: usize,
        /// Length of the chunk that was supplied.
        actual: usize,
    },

    /// The trailing length field points outside the ciphertext region.
    #[error("ciphertext length field claims {claimed} bytes, valid range is {min}..={max}")]
    CiphertextOutOfBounds {
        /// Value read from the length field.
        claimed: usize,
        /// Smallest sealed payload (nonce plus tag).
        min: usize,
        /// Ciphertext capacity of the frame.
        max: usize,
    },

    /// A sealed payload does not fit the frame's ciphertext region.
    #[error("sealed payload of {len} bytes exceeds the {capacity}-byte frame capacity")]
    SealedPayloadTooLarge {
        /// Sealed payload length.
        len: usize,
        /// Ciphertext capacity of the frame.
        capacity: usize,
    },

    /// A wrapped key is not the length the layout reserves for it.
    #[error("wrapped key length mismatch: expected {expected} bytes, got {actual}")]
    WrappedKeyLengthMismatch {
        /// Reserved wrapped-key length.
        expected: usize,
        /// Length of the wrapped key that was supplied.
        actual: usize,
    },

    /// A decrypted envelope is too short to carry the trailing timestamp.
    #[error("plaintext envelope of {len} bytes is too short to carry a timestamp")]
    EnvelopeTooShort {
        /// Envelope length.
        len: usize,
    },
}
