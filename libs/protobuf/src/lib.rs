//! Utilities for converting between domain types and their protobuf
//! representation.

mod proto_fmt;
pub mod testonly;

pub use proto_fmt::*;

#[cfg(test)]
mod tests;
