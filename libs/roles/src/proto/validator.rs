//! Wire schema of the validator protocol.
//!
//! Every field has explicit presence, so that a missing field can be told
//! apart from a zero value when converting into the domain types.

#[derive(Clone, PartialEq, prost::Message)]
pub struct View {
    #[prost(uint64, optional, tag = "1")]
    pub height: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub round: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Block {
    #[prost(uint64, optional, tag = "1")]
    pub number: Option<u64>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub parent: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub proposer: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub payload: Option<Vec<u8>>,
    /// Not covered by the block hash.
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub committed_seals: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Node {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub parent: Option<Vec<u8>>,
    #[prost(message, optional, tag = "2")]
    pub block: Option<Block>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QuorumCert {
    #[prost(message, optional, tag = "1")]
    pub view: Option<View>,
    #[prost(uint32, optional, tag = "2")]
    pub code: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub node: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub proposer: Option<Vec<u8>>,
    /// Absent for a root certificate.
    #[prost(bytes = "vec", optional, tag = "5")]
    pub seal: Option<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub committed_seals: Vec<Vec<u8>>,
}

/// Payload of `NEW_VIEW`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct NewView {
    #[prost(message, optional, tag = "1")]
    pub prepare_qc: Option<QuorumCert>,
}

/// Payload of `PREPARE` and `PRE_COMMIT`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Proposal {
    #[prost(message, optional, tag = "1")]
    pub node: Option<Node>,
    #[prost(message, optional, tag = "2")]
    pub qc: Option<QuorumCert>,
}

/// Payload of the three vote messages.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Vote {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub digest: Option<Vec<u8>>,
}

/// Payload of `COMMIT`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Commit {
    #[prost(message, optional, tag = "1")]
    pub locked_qc: Option<QuorumCert>,
}

/// Payload of `DECIDE`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Decide {
    #[prost(message, optional, tag = "1")]
    pub commit_qc: Option<QuorumCert>,
}

/// The data covered by a message signature.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MessageSigningData {
    #[prost(uint32, optional, tag = "1")]
    pub code: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub view: Option<View>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub payload: Option<Vec<u8>>,
}

/// Signed protocol message, as sent over the network.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Message {
    #[prost(uint32, optional, tag = "1")]
    pub code: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub view: Option<View>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub payload: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub signature: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub committed_seal: Option<Vec<u8>>,
}
