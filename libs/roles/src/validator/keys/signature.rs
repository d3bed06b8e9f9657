use hotstuff_consensus_crypto::{secp256k1, ByteFmt};

use super::Address;
use crate::validator::MsgHash;

/// A recoverable signature of a validator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature(pub(crate) secp256k1::Signature);

impl Signature {
    /// Recovers the address of the validator that signed `hash`.
    ///
    /// Recovery of a signature over a different hash typically succeeds
    /// but yields an unrelated address, so callers must compare the
    /// result against the expected signer or a validator set.
    pub fn recover(&self, hash: &MsgHash) -> anyhow::Result<Address> {
        Ok(Address(self.0.recover_address(&hash.0)?))
    }
}

impl ByteFmt for Signature {
    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&self.0)
    }

    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(Self)
    }
}
