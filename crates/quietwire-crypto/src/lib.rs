//! Cryptographic primitives for the Quietwire transport.
//!
//! The protocol is a fixed-cipher hybrid: every frame's payload is sealed
//! under a fresh AES-128-GCM key, and that key travels inside the same frame
//! wrapped with RSA-2048 OAEP (SHA-256) under the receiver's static public
//! key. There is no negotiation and no session handshake; the receiver's
//! public key is exchanged out-of-band before traffic begins.
//!
//! This crate holds only the primitives — key pairs with PEM import/export,
//! key wrap/unwrap, and AEAD seal/open. Framing, buffering, and all
//! validation state live in `quietwire-core`.
#![forbid(unsafe_code)]

pub mod aead;
pub mod error;
pub mod keys;

pub use aead::{open, seal};
pub use error::CryptoError;
pub use keys::{KeyPair, PeerPublicKey, SymmetricKey};
