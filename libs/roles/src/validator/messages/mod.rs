//! Messages exchanged between validators.

mod block;
mod consensus;
mod msg;
mod node;
mod quorum_cert;
mod view;

#[cfg(test)]
mod tests;

pub use block::*;
pub use consensus::*;
pub use msg::*;
pub use node::*;
pub use quorum_cert::*;
pub use view::*;
