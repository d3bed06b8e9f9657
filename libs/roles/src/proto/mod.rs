//! Protobuf messages exchanged by validators.
#![allow(missing_docs)]

pub mod validator;
