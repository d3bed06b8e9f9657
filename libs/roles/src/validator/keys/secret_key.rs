use std::{fmt, sync::Arc};

use hotstuff_consensus_crypto::{secp256k1, ByteFmt, Text, TextFmt};

use super::{Address, Signature};
use crate::validator::MsgHash;

/// A secret key for the validator role.
/// SecretKey is put into an Arc, so that we can clone it,
/// without copying the secret all over the RAM.
#[derive(Clone, PartialEq)]
pub struct SecretKey(pub(crate) Arc<secp256k1::SecretKey>);

impl SecretKey {
    /// Generates a secret key from a cryptographically-secure entropy source.
    pub fn generate() -> Self {
        Self(Arc::new(secp256k1::SecretKey::generate()))
    }

    /// Address of the validator owning this key.
    pub fn address(&self) -> Address {
        Address(self.0.public().address())
    }

    /// Signs a message hash.
    pub fn sign_hash(&self, hash: &MsgHash) -> anyhow::Result<Signature> {
        Ok(Signature(self.0.sign_hash(&hash.0)?))
    }
}

impl ByteFmt for SecretKey {
    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&*self.0)
    }

    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(Arc::new).map(Self)
    }
}

impl TextFmt for SecretKey {
    fn encode(&self) -> String {
        format!(
            "validator:secret:secp256k1:{}",
            hex::encode(ByteFmt::encode(&*self.0))
        )
    }

    fn decode(text: Text) -> anyhow::Result<Self> {
        text.strip("validator:secret:secp256k1:")?
            .decode_hex()
            .map(Arc::new)
            .map(Self)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        // The secret itself should never be logged.
        write!(fmt, "<secret for {}>", self.address())
    }
}
