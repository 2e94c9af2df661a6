//! Plaintext envelope layout.
//!
//! Before encryption the sender turns a zero-padded message slot into an
//! envelope:
//!
//! ```text
//! | message bytes | zero padding ... | pad remnant | timestamp (f64 LE, 8) |
//! ```
//!
//! Construction is deliberately odd, for wire compatibility: the message plus
//! an 8-byte zero placeholder is PKCS#7-padded to 128-bit blocks, then the
//! *last 8 bytes* of the padded result are dropped and replaced with the
//! timestamp. The overwrite destroys the PKCS#7 structure, so the receiver
//! never block-unpads; it strips the timestamp and then strips trailing zero
//! bytes. Two consequences callers must live with:
//!
//! - a message with meaningful trailing `0x00` bytes loses them, and
//! - when the padded length lands exactly on a block boundary, remnant bytes
//!   of the full pad block (value `0x10`) survive in front of the timestamp.
//!
//! With the default chunk geometry the encoder's slot length never hits the
//! second case. Neither quirk may be "fixed" here — both peers compute this
//! exact byte layout.

use crate::errors::FrameError;

/// Width of the trailing timestamp, in bytes.
pub const TIMESTAMP_LEN: usize = 8;

/// PKCS#7 block size, in bytes (128-bit).
pub const BLOCK_LEN: usize = 16;

/// Wall-clock instant as carried on the wire: IEEE-754 double seconds since
/// the Unix epoch, little-endian.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct WireTimestamp(f64);

impl WireTimestamp {
    /// Build a timestamp from seconds since the Unix epoch.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0
    }

    /// Wire encoding.
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; TIMESTAMP_LEN] {
        self.0.to_le_bytes()
    }

    /// Decode from the wire.
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; TIMESTAMP_LEN]) -> Self {
        Self(f64::from_le_bytes(bytes))
    }

    /// Seconds elapsed from `self` to `now`; negative if `self` is in the
    /// future relative to `now`.
    #[must_use]
    pub fn age_at(self, now: WireTimestamp) -> f64 {
        now.0 - self.0
    }
}

/// Build the envelope for an already slot-padded message.
#[must_use]
pub fn build(message: &[u8], timestamp: WireTimestamp) -> Vec<u8> {
    let placeholder_len = message.len() + TIMESTAMP_LEN;
    let pad = BLOCK_LEN - (placeholder_len % BLOCK_LEN);
    let padded_len = placeholder_len + pad;

    let mut envelope = Vec::with_capacity(padded_len);
    envelope.extend_from_slice(message);
    envelope.resize(placeholder_len, 0);
    envelope.resize(padded_len, pad as u8);
    envelope.truncate(padded_len - TIMESTAMP_LEN);
    envelope.extend_from_slice(&timestamp.to_le_bytes());
    envelope
}

/// Split a decrypted envelope into its payload and trailing timestamp.
///
/// # Errors
///
/// Fails with [`FrameError::EnvelopeTooShort`] when the envelope cannot hold
/// a timestamp and at least one payload byte.
pub fn split(envelope: &[u8]) -> Result<(&[u8], WireTimestamp), FrameError> {
    if envelope.len() <= TIMESTAMP_LEN {
        return Err(FrameError::EnvelopeTooShort {
            len: envelope.len(),
        });
    }
    let (payload, ts_bytes) = envelope.split_at(envelope.len() - TIMESTAMP_LEN);
    let mut buf = [0u8; TIMESTAMP_LEN];
    buf.copy_from_slice(ts_bytes);
    Ok((payload, WireTimestamp::from_le_bytes(buf)))
}

/// Strip the trailing zero padding from an envelope payload.
#[must_use]
pub fn strip_padding(payload: &[u8]) -> &[u8] {
    let end = payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &payload[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_layout_is_exact() {
        // 20 message bytes + 8 placeholder = 28; PKCS#7 pads 4 bytes of 0x04
        // to reach 32; the final 8 bytes become the timestamp. What survives
        // of the placeholder is 4 zero bytes.
        let message = [0x41u8; 20];
        let ts = WireTimestamp::from_secs_f64(1_700_000_000.0);
        let envelope = build(&message, ts);

        assert_eq!(envelope.len(), 32);
        assert_eq!(&envelope[..20], &message);
        assert_eq!(&envelope[20..24], &[0, 0, 0, 0]);
        assert_eq!(&envelope[24..], &ts.to_le_bytes());
    }

    #[test]
    fn block_aligned_placeholder_leaves_pad_remnant() {
        // 24 + 8 = 32 is block-aligned, so PKCS#7 appends a full 0x10 block;
        // 8 of those bytes survive in front of the timestamp.
        let message = [0x41u8; 24];
        let envelope = build(&message, WireTimestamp::from_secs_f64(0.0));

        assert_eq!(envelope.len(), 48);
        assert_eq!(&envelope[24..32], &[0x00; 8]);
        assert_eq!(&envelope[32..40], &[0x10; 8]);
    }

    #[test]
    fn split_recovers_timestamp() {
        let ts = WireTimestamp::from_secs_f64(1_700_000_000.5);
        let envelope = build(b"hello", ts);
        let (payload, recovered) = split(&envelope).unwrap();
        assert_eq!(recovered, ts);
        assert_eq!(strip_padding(payload), b"hello");
    }

    #[test]
    fn short_envelope_is_rejected() {
        assert!(matches!(
            split(&[0u8; TIMESTAMP_LEN]),
            Err(FrameError::EnvelopeTooShort { len: 8 })
        ));
    }

    #[test]
    fn strip_padding_handles_all_zero_payload() {
        assert_eq!(strip_padding(&[0, 0, 0, 0]), &[] as &[u8]);
    }

    #[test]
    fn timestamp_round_trips_through_wire_form() {
        let ts = WireTimestamp::from_secs_f64(1_234_567_890.123_456);
        assert_eq!(WireTimestamp::from_le_bytes(ts.to_le_bytes()), ts);
    }
}
