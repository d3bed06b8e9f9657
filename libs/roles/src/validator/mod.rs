//! Validator role implementation.

mod conv;
mod keys;
mod messages;
mod signer;
pub mod testonly;
mod validator_set;


pub use self::{keys::*, messages::*, signer::*, validator_set::*};
