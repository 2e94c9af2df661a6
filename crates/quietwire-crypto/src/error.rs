//! Crypto error types.

use thiserror::Error;

/// Errors from key handling and authenticated encryption.
///
/// Decrypt-side failures (`KeyUnwrap`, `TagMismatch`) deliberately carry no
/// detail beyond their variant: the distinction between corruption and
/// tampering is not observable, and the caller treats both as fatal to the
/// frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// RSA key-pair generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// PEM-encoded key material could not be parsed or rendered.
    #[error("PEM key material rejected: {0}")]
    Pem(String),

    /// A key's modulus does not match the fixed protocol geometry.
    #[error("unsupported RSA modulus: expected {expected_bits} bits, got {actual_bits}")]
    UnsupportedModulus {
        /// Required modulus width.
        expected_bits: usize,
        /// Width of the key that was supplied.
        actual_bits: usize,
    },

    /// Wrapping the symmetric key under the peer public key failed.
    #[error("key wrap failed: {0}")]
    KeyWrap(String),

    /// The wrapped key could not be recovered with our private key.
    #[error("key unwrap failed")]
    KeyUnwrap,

    /// Recovered or supplied key material has the wrong length.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key length.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// AEAD encryption failed.
    #[error("seal failed")]
    SealFailed,

    /// A sealed payload is too short to contain a nonce and tag.
    #[error("sealed payload of {len} bytes is too short")]
    SealedTooShort {
        /// Length of the rejected payload.
        len: usize,
    },

    /// AEAD authentication failed; the payload is corrupt or forged.
    #[error("authentication tag mismatch")]
    TagMismatch,
}
