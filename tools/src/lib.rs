//! Tools for running the consensus engine outside of a node.
mod config;
mod localnet;

#[cfg(test)]
mod tests;

pub use config::{decode_json, encode_json, LocalnetConfig};
pub use localnet::{run, Report};
