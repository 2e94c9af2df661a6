//! Encode and decode error types.
//!
//! Decode failures classify *why* a frame was rejected; whether a rejection
//! closes the connection or skips the frame is the surrounding transport's
//! call. Nothing here is retried by the core, and no rejection corrupts
//! decoder state — only a fully validated frame commits the sequence mark.

use quietwire_crypto::CryptoError;
use quietwire_proto::{FrameError, ProtocolError};
use thiserror::Error;

/// Errors while buffering or producing outgoing frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The adaptive shrink loop could not fit a fragment within its attempt
    /// bound. With the default geometry the sealed size is deterministic and
    /// this indicates a misconfigured layout.
    #[error("could not fit message fragment into a frame after {attempts} resize attempts")]
    FrameSizeExceeded {
        /// Number of attempts made before giving up.
        attempts: usize,
    },

    /// Control-code rendering failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Key wrap or payload sealing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Frame assembly failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Errors while validating one received chunk.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The frame arrived before the configured interval elapsed.
    #[error("rate limited: {elapsed_secs:.3}s elapsed of the required {limit_secs:.3}s")]
    RateLimited {
        /// Seconds since the last gate-passing attempt.
        elapsed_secs: f64,
        /// Configured minimum interval.
        limit_secs: f64,
    },

    /// Key unwrap or AEAD authentication failed. Corruption and tampering
    /// are indistinguishable; both are fatal to the frame and never retried.
    #[error("frame failed authentication (corrupt or forged)")]
    TamperedOrCorrupt,

    /// The embedded timestamp is older than the freshness window or lies in
    /// the future.
    #[error("timestamp outside the freshness window (age {age_secs:.6}s)")]
    StaleOrFutureTimestamp {
        /// Frame age in seconds; negative means a future timestamp.
        age_secs: f64,
    },

    /// The chunk's sequence candidate does not advance past the accepted
    /// mark.
    #[error("out of order: candidate {candidate} does not advance past {last}")]
    OutOfOrder {
        /// Candidate sequence number.
        candidate: i64,
        /// Currently accepted mark.
        last: i64,
    },

    /// The chunk's outer layout is malformed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}
