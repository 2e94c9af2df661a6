//! Quietwire protocol core logic.
//!
//! The stateful half of the transport: a [`ChunkEncoder`] that buffers
//! outgoing application bytes and control markers and drains them into
//! fixed-size encrypted frames, and a [`ChunkDecoder`] that unframes,
//! decrypts, and validates incoming chunks before releasing plaintext.
//!
//! # Architecture
//!
//! The core is sans-IO. No operation blocks or touches a socket; callers
//! feed bytes in and carry frames out. Wall-clock time enters only through
//! the [`clock::Clock`] trait, so freshness and rate-limit validation run
//! deterministically under test. The OS CSPRNG (inside `quietwire-crypto`)
//! is the one ambient effect: a fresh symmetric key and nonce per frame.
//!
//! A connection is expected to be driven by one task performing the
//! read-decrypt-handle loop and one performing add-encrypt-flush-write.
//! Neither the encoder nor the decoder serializes concurrent calls; a caller
//! sharing an instance across tasks must add its own mutual exclusion.
//!
//! # Components
//!
//! - [`encoder`]: outgoing buffer and frame production
//! - [`decoder`]: frame validation pipeline and plaintext recovery
//! - [`sequence`]: strictly-increasing acceptance of decrypted chunks
//! - [`scanner`]: in-band control-marker extraction from decrypted text
//! - [`clock`]: wall-clock abstraction (system and manual)
//! - [`error`]: encode/decode error types
#![forbid(unsafe_code)]

pub mod clock;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod scanner;
pub mod sequence;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::{ChunkDecoder, DecoderConfig};
pub use encoder::ChunkEncoder;
pub use error::{DecodeError, EncodeError};
pub use scanner::{MarkerScanner, ScanEvent};
pub use sequence::SequenceState;
