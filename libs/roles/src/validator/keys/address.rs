use std::fmt;

use hotstuff_consensus_crypto::{secp256k1, ByteFmt, Text, TextFmt};

/// Identity of a validator: the Ethereum-style address of its public key.
///
/// Addresses are never transmitted alongside messages. They are recovered
/// from signatures, so a forged sender is impossible by construction.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub(crate) [u8; secp256k1::ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address. Not derivable from any key.
    pub const ZERO: Self = Self([0; secp256k1::ADDRESS_LENGTH]);

    /// Constructs an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; secp256k1::ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; secp256k1::ADDRESS_LENGTH] {
        &self.0
    }
}

impl ByteFmt for Address {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(Self(bytes.try_into()?))
    }

    fn encode(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl TextFmt for Address {
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.strip("0x")?.decode_hex()
    }

    fn encode(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&TextFmt::encode(self))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        // Short form, the full address is noisy in logs.
        write!(fmt, "0x{}..", hex::encode(&self.0[..4]))
    }
}
