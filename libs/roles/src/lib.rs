//! Types describing the validator role of the HotStuff consensus engine.
//!
//! A validator holds a secp256k1 key and is identified by the address derived
//! from it. This crate defines what validators exchange (views, blocks, nodes,
//! quorum certificates and signed protocol messages) as well as the validator
//! set with its proposer rotation and the signing/verification of quorum
//! certificates.

pub mod proto;
pub mod validator;
