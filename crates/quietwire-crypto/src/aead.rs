//! AEAD seal/open for frame payloads.
//!
//! AES-128-GCM with a random 96-bit nonce per seal. The sealed form is
//! `nonce ‖ ciphertext ‖ tag` — the nonce travels in front of the ciphertext
//! inside the frame, and the 16-byte tag is appended by the cipher. Tag
//! verification fails closed: no partial plaintext is ever released.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Nonce};

use crate::error::CryptoError;
use crate::keys::{SYMMETRIC_KEY_LEN, SymmetricKey};

/// Nonce length in bytes (96-bit).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Seal a plaintext under a symmetric key with a fresh random nonce.
///
/// Returns `nonce ‖ ciphertext ‖ tag`.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = new_cipher(key)?;
    let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::SealFailed)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a sealed payload, verifying the authentication tag.
///
/// # Errors
///
/// [`CryptoError::SealedTooShort`] when the payload cannot contain a nonce
/// and tag; [`CryptoError::TagMismatch`] on any authentication failure.
pub fn open(key: &SymmetricKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::SealedTooShort { len: sealed.len() });
    }

    let cipher = new_cipher(key)?;
    let (nonce, body) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| CryptoError::TagMismatch)
}

fn new_cipher(key: &SymmetricKey) -> Result<Aes128Gcm, CryptoError> {
    Aes128Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: SYMMETRIC_KEY_LEN,
        actual: key.as_bytes().len(),
    })
}
