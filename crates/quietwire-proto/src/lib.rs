//! Wire format for the Quietwire transport.
//!
//! Frames are fixed-size chunks (1024 bytes by default) carrying one sealed
//! message fragment each: an AEAD payload zero-padded into the front of the
//! chunk, the RSA-wrapped symmetric key at a fixed offset from the end, and a
//! trailing two-byte length field that locates the true end of the ciphertext
//! inside the padded region.
//!
//! This crate defines the *shape* of the protocol only — the control-code
//! descriptor both peers share, the chunk and envelope layouts, and the typed
//! errors for everything that can be malformed on the wire. There is no I/O,
//! no cryptography, and no clock in here; the stateful encoder and decoder
//! live in `quietwire-core`.
//!
//! # Endianness
//!
//! The ciphertext length field and the envelope timestamp are both
//! little-endian. This matches the reference peer and must never change
//! without a wire-format version bump.
#![forbid(unsafe_code)]

pub mod descriptor;
pub mod envelope;
pub mod errors;
pub mod frame;

pub use descriptor::{ControlCode, ControlCodeDescriptor, TokenValidation};
pub use envelope::WireTimestamp;
pub use errors::{FrameError, ProtocolError};
pub use frame::{FrameLayout, FrameParts, WireFrame};
