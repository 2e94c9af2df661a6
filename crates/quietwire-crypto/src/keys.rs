//! RSA key pairs and per-frame symmetric keys.
//!
//! The decoder side owns a [`KeyPair`]; its public half is exported as SPKI
//! PEM and handed to the encoder side out-of-band, where it becomes a
//! [`PeerPublicKey`]. The private half never leaves the decoder, though it
//! can be persisted and reloaded as PKCS#8 PEM.
//!
//! Per-frame [`SymmetricKey`]s are generated from the OS CSPRNG, used once,
//! and zeroized on drop.

use rand::RngCore;
use rand::rngs::OsRng;
use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

/// Required RSA modulus width, in bits.
pub const MODULUS_BITS: usize = 2048;

/// Symmetric key length, in bytes (AES-128).
pub const SYMMETRIC_KEY_LEN: usize = 16;

/// Fresh 128-bit AEAD key, generated per frame.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// Generate a fresh key from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.write_str("SymmetricKey(..)")
    }
}

/// The decoder's static RSA-2048 key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate a fresh 2048-bit pair.
    pub fn generate() -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, MODULUS_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = private.to_public_key();
        Ok(Self { private, public })
    }

    /// Load a persisted pair from PKCS#8 PEM private-key material.
    pub fn from_private_key_pem(pem: &str) -> Result<Self, CryptoError> {
        let private =
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::Pem(e.to_string()))?;
        check_modulus(private.size())?;
        let public = private.to_public_key();
        Ok(Self { private, public })
    }

    /// Export the private half as PKCS#8 PEM for persistence.
    ///
    /// The returned buffer is zeroized on drop.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Pem(e.to_string()))
    }

    /// Export the public half as SPKI PEM for the out-of-band handshake.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Pem(e.to_string()))
    }

    /// The public half as an encoder-side handle, without going through PEM.
    #[must_use]
    pub fn peer_public_key(&self) -> PeerPublicKey {
        PeerPublicKey {
            key: self.public.clone(),
        }
    }

    /// Length of a wrapped key under this pair, in bytes.
    #[must_use]
    pub fn wrapped_key_len(&self) -> usize {
        self.private.size()
    }

    /// Recover a symmetric key wrapped under our public key.
    ///
    /// # Errors
    ///
    /// Any OAEP failure is [`CryptoError::KeyUnwrap`]; a recovered key of the
    /// wrong length is [`CryptoError::InvalidKeyLength`].
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<SymmetricKey, CryptoError> {
        let mut raw = self
            .private
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|_| CryptoError::KeyUnwrap)?;

        let result = <[u8; SYMMETRIC_KEY_LEN]>::try_from(raw.as_slice())
            .map(SymmetricKey::from_bytes)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: SYMMETRIC_KEY_LEN,
                actual: raw.len(),
            });
        raw.zeroize();
        result
    }
}

/// The encoder's handle on the peer's public key.
#[derive(Debug, Clone)]
pub struct PeerPublicKey {
    key: RsaPublicKey,
}

impl PeerPublicKey {
    /// Parse the peer's SPKI PEM export.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key =
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::Pem(e.to_string()))?;
        check_modulus(key.size())?;
        Ok(Self { key })
    }

    /// Length of a wrapped key under this public key, in bytes.
    #[must_use]
    pub fn wrapped_key_len(&self) -> usize {
        self.key.size()
    }

    /// Wrap a symmetric key with OAEP (SHA-256) under the peer's key.
    pub fn wrap_key(&self, key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
        self.key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
            .map_err(|e| CryptoError::KeyWrap(e.to_string()))
    }
}

fn check_modulus(modulus_bytes: usize) -> Result<(), CryptoError> {
    let actual_bits = modulus_bytes * 8;
    if actual_bits != MODULUS_BITS {
        return Err(CryptoError::UnsupportedModulus {
            expected_bits: MODULUS_BITS,
            actual_bits,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_unwrap_round_trip() {
        let pair = KeyPair::generate().unwrap();
        let key = SymmetricKey::generate();

        let wrapped = pair.peer_public_key().wrap_key(&key).unwrap();
        assert_eq!(wrapped.len(), pair.wrapped_key_len());
        assert_eq!(wrapped.len(), 256);

        let recovered = pair.unwrap_key(&wrapped).unwrap();
        assert_eq!(recovered.as_bytes(), key.as_bytes());
    }

    #[test]
    fn unwrap_with_wrong_private_key_fails() {
        let ours = KeyPair::generate().unwrap();
        let theirs = KeyPair::generate().unwrap();
        let key = SymmetricKey::generate();

        let wrapped = theirs.peer_public_key().wrap_key(&key).unwrap();
        assert_eq!(ours.unwrap_key(&wrapped), Err(CryptoError::KeyUnwrap));
    }

    #[test]
    fn public_key_pem_round_trip() {
        let pair = KeyPair::generate().unwrap();
        let pem = pair.public_key_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));

        let peer = PeerPublicKey::from_pem(&pem).unwrap();
        let key = SymmetricKey::generate();
        let wrapped = peer.wrap_key(&key).unwrap();
        assert_eq!(pair.unwrap_key(&wrapped).unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn private_key_pem_round_trip() {
        let pair = KeyPair::generate().unwrap();
        let pem = pair.private_key_pem().unwrap();

        let restored = KeyPair::from_private_key_pem(&pem).unwrap();
        let key = SymmetricKey::generate();
        let wrapped = pair.peer_public_key().wrap_key(&key).unwrap();
        assert_eq!(
            restored.unwrap_key(&wrapped).unwrap().as_bytes(),
            key.as_bytes()
        );
    }

    #[test]
    fn generated_keys_are_distinct() {
        assert_ne!(
            SymmetricKey::generate().as_bytes(),
            SymmetricKey::generate().as_bytes()
        );
    }

    #[test]
    fn debug_redacts_key_material() {
        let key = SymmetricKey::from_bytes([0x42; SYMMETRIC_KEY_LEN]);
        assert_eq!(format!("{key:?}"), "SymmetricKey(..)");
    }
}
