//! Cryptographic keys representing the validator role.

mod address;
mod secret_key;
mod signature;
mod testonly;

pub use address::Address;
pub use secret_key::SecretKey;
pub use signature::Signature;
