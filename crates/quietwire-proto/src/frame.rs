//! Fixed-size chunk layout.
//!
//! Every frame is exactly `chunk_size` bytes:
//!
//! ```text
//! offset 0                          C-K-2                 C-2        C
//! | sealed payload, zero-padded ... | wrapped key (K)     | len (u16) |
//! ```
//!
//! The sealed payload is `nonce ‖ ciphertext ‖ tag` from the AEAD seal. Its
//! true length varies with the message, so it is zero-padded into the
//! `C − K − 2` region and the trailing little-endian `u16` records where it
//! really ends. The wrapped key length `K` is fixed by the recipient's RSA
//! modulus (256 bytes for the required 2048-bit keys).

use crate::errors::FrameError;

/// AEAD nonce length in bytes (96-bit).
pub const NONCE_LEN: usize = 12;

/// AEAD authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Trailing ciphertext-length field width in bytes.
pub const LENGTH_FIELD_LEN: usize = 2;

/// Default total frame size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default wrapped-key length in bytes (2048-bit RSA modulus).
pub const DEFAULT_WRAPPED_KEY_LEN: usize = 256;

/// Geometry of a wire frame.
///
/// Both peers must agree on these values exactly; they are session
/// configuration, not negotiated on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Total frame size `C`.
    pub chunk_size: usize,
    /// Wrapped-key length `K`.
    pub wrapped_key_len: usize,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            wrapped_key_len: DEFAULT_WRAPPED_KEY_LEN,
        }
    }
}

/// Borrowed views into one split frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParts<'a> {
    /// The sealed payload (`nonce ‖ ciphertext ‖ tag`), padding removed.
    pub sealed: &'a [u8],
    /// The RSA-wrapped symmetric key.
    pub wrapped_key: &'a [u8],
}

/// One ready-to-send frame of exactly [`FrameLayout::chunk_size`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame(Vec<u8>);

impl WireFrame {
    /// The frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the frame, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Total frame length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame is empty (never true for assembled frames).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for WireFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FrameLayout {
    /// Bytes available for the sealed payload: `C − K − 2`.
    #[must_use]
    pub fn ciphertext_capacity(&self) -> usize {
        self.chunk_size - self.wrapped_key_len - LENGTH_FIELD_LEN
    }

    /// Assemble a frame from a sealed payload and a wrapped key.
    ///
    /// # Errors
    ///
    /// Fails if the sealed payload exceeds [`Self::ciphertext_capacity`] or
    /// the wrapped key is not exactly [`Self::wrapped_key_len`] bytes.
    pub fn assemble(&self, sealed: &[u8], wrapped_key: &[u8]) -> Result<WireFrame, FrameError> {
        let capacity = self.ciphertext_capacity();
        if sealed.len() > capacity {
            return Err(FrameError::SealedPayloadTooLarge {
                len: sealed.len(),
                capacity,
            });
        }
        if wrapped_key.len() != self.wrapped_key_len {
            return Err(FrameError::WrappedKeyLengthMismatch {
                expected: self.wrapped_key_len,
                actual: wrapped_key.len(),
            });
        }

        let mut bytes = Vec::with_capacity(self.chunk_size);
        bytes.extend_from_slice(sealed);
        bytes.resize(capacity, 0);
        bytes.extend_from_slice(wrapped_key);
        bytes.extend_from_slice(&(sealed.len() as u16).to_le_bytes());
        debug_assert_eq!(bytes.len(), self.chunk_size);
        Ok(WireFrame(bytes))
    }

    /// Split one received chunk into its sealed payload and wrapped key.
    ///
    /// # Errors
    ///
    /// Fails if the chunk is not exactly [`Self::chunk_size`] bytes, or if
    /// the trailing length field points outside the ciphertext region. The
    /// bounds check is what keeps a corrupted length field a typed error
    /// instead of an out-of-range slice.
    pub fn split<'a>(&self, chunk: &'a [u8]) -> Result<FrameParts<'a>, FrameError> {
        if chunk.len() != self.chunk_size {
            return Err(FrameError::InvalidFrameLength {
                expected: self.chunk_size,
                actual: chunk.len(),
            });
        }

        let length_at = self.chunk_size - LENGTH_FIELD_LEN;
        let claimed = u16::from_le_bytes([chunk[length_at], chunk[length_at + 1]]) as usize;

        let capacity = self.ciphertext_capacity();
        let min = NONCE_LEN + TAG_LEN;
        if claimed < min || claimed > capacity {
            return Err(FrameError::CiphertextOutOfBounds {
                claimed,
                min,
                max: capacity,
            });
        }

        Ok(FrameParts {
            sealed: &chunk[..claimed],
            wrapped_key: &chunk[capacity..length_at],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FrameLayout {
        FrameLayout::default()
    }

    #[test]
    fn assembled_frame_is_exactly_chunk_size() {
        let sealed = vec![0xAA; 100];
        let wrapped = vec![0xBB; DEFAULT_WRAPPED_KEY_LEN];
        let frame = layout().assemble(&sealed, &wrapped).unwrap();
        assert_eq!(frame.len(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn assemble_split_round_trip() {
        let sealed = vec![0x5C; 300];
        let wrapped = vec![0x11; DEFAULT_WRAPPED_KEY_LEN];
        let frame = layout().assemble(&sealed, &wrapped).unwrap();

        let parts = layout().split(frame.as_bytes()).unwrap();
        assert_eq!(parts.sealed, sealed.as_slice());
        assert_eq!(parts.wrapped_key, wrapped.as_slice());
    }

    #[test]
    fn length_field_is_little_endian() {
        let sealed = vec![0xAA; 0x0123];
        let wrapped = vec![0xBB; DEFAULT_WRAPPED_KEY_LEN];
        let frame = layout().assemble(&sealed, &wrapped).unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(&bytes[DEFAULT_CHUNK_SIZE - 2..], &[0x23, 0x01]);
    }

    #[test]
    fn oversized_sealed_payload_is_rejected() {
        let capacity = layout().ciphertext_capacity();
        let sealed = vec![0u8; capacity + 1];
        let wrapped = vec![0u8; DEFAULT_WRAPPED_KEY_LEN];
        assert!(matches!(
            layout().assemble(&sealed, &wrapped),
            Err(FrameError::SealedPayloadTooLarge { .. })
        ));
    }

    #[test]
    fn wrong_chunk_size_is_rejected() {
        let chunk = vec![0u8; DEFAULT_CHUNK_SIZE - 1];
        assert_eq!(
            layout().split(&chunk),
            Err(FrameError::InvalidFrameLength {
                expected: DEFAULT_CHUNK_SIZE,
                actual: DEFAULT_CHUNK_SIZE - 1,
            })
        );
    }

    #[test]
    fn corrupt_length_field_is_a_typed_error() {
        let sealed = vec![0xAA; 100];
        let wrapped = vec![0xBB; DEFAULT_WRAPPED_KEY_LEN];
        let mut bytes = layout().assemble(&sealed, &wrapped).unwrap().into_bytes();

        // Claim more ciphertext than the region can hold.
        let claimed = (layout().ciphertext_capacity() + 1) as u16;
        bytes[DEFAULT_CHUNK_SIZE - 2..].copy_from_slice(&claimed.to_le_bytes());

        assert!(matches!(
            layout().split(&bytes),
            Err(FrameError::CiphertextOutOfBounds { .. })
        ));
    }

    #[test]
    fn undersized_length_field_is_rejected() {
        let sealed = vec![0xAA; 100];
        let wrapped = vec![0xBB; DEFAULT_WRAPPED_KEY_LEN];
        let mut bytes = layout().assemble(&sealed, &wrapped).unwrap().into_bytes();

        // Fewer bytes than nonce + tag cannot be a sealed payload.
        bytes[DEFAULT_CHUNK_SIZE - 2..].copy_from_slice(&27u16.to_le_bytes());

        assert!(matches!(
            layout().split(&bytes),
            Err(FrameError::CiphertextOutOfBounds { claimed: 27, .. })
        ));
    }
}
