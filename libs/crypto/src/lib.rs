//! Cryptographic primitives used by the HotStuff consensus engine.
//!
//! Validators sign with secp256k1 recoverable ECDSA, so a signer's identity
//! can always be recovered from the signature itself. All digests are Keccak256.

pub use fmt::*;

mod fmt;
pub mod keccak256;
pub mod secp256k1;
