//! Recoverable ECDSA signatures over the Secp256k1 curve.
//!
//! Signatures are encoded in the 65-byte `r || s || v` form used by Ethereum tooling,
//! and the signer is identified by the Ethereum-style address of its public key.

use std::hash::Hash;

use anyhow::bail;
use zeroize::ZeroizeOnDrop;

use crate::{keccak256::Keccak256, ByteFmt};

mod testonly;


const SIGNATURE_LENGTH: usize = 65;

/// Length of an address derived from a public key.
pub const ADDRESS_LENGTH: usize = 20;

/// Secp256k1 secret key
#[derive(ZeroizeOnDrop, PartialEq, Eq)]
pub struct SecretKey(k256::ecdsa::SigningKey);

impl SecretKey {
    /// Generates a secret key from a cryptographically-secure entropy source.
    pub fn generate() -> Self {
        Self(k256::SecretKey::random(&mut rand::rngs::OsRng).into())
    }

    /// Gets the corresponding [`PublicKey`] for this [`SecretKey`]
    pub fn public(&self) -> PublicKey {
        PublicKey(*self.0.verifying_key())
    }

    /// Hashes the message with Keccak256 and signs it.
    pub fn sign(&self, msg: &[u8]) -> anyhow::Result<Signature> {
        self.sign_hash(&Keccak256::new(msg))
    }

    /// Signs a message digest.
    pub fn sign_hash(&self, hash: &Keccak256) -> anyhow::Result<Signature> {
        let (sig, recid) = self.0.sign_prehash_recoverable(hash.as_bytes())?;
        Ok(Signature { sig, recid })
    }
}

impl ByteFmt for SecretKey {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let sk = k256::ecdsa::SigningKey::from_slice(bytes)?;
        Ok(Self(sk))
    }

    fn encode(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey({:?})", self.public())
    }
}

/// Secp256k1 public key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PublicKey(k256::ecdsa::VerifyingKey);

impl PublicKey {
    /// Ethereum-style address of the key: the last 20 bytes of the
    /// Keccak256 hash of the uncompressed point (without the 0x04 tag).
    pub fn address(&self) -> [u8; ADDRESS_LENGTH] {
        let point = self.0.to_encoded_point(false);
        let hash = Keccak256::new(&point.as_bytes()[1..]);
        let mut addr = [0u8; ADDRESS_LENGTH];
        addr.copy_from_slice(&hash.as_bytes()[32 - ADDRESS_LENGTH..]);
        addr
    }
}

impl ByteFmt for PublicKey {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)?;
        Ok(Self(vk))
    }

    fn encode(&self) -> Vec<u8> {
        self.0.to_sec1_bytes().to_vec()
    }
}

impl Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(&self.encode())
    }
}

/// Secp256k1 signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    sig: k256::ecdsa::Signature,
    /// Standard recovery ID. Shifted by 27 when serialized, as Ethereum tooling expects.
    recid: k256::ecdsa::RecoveryId,
}

impl Signature {
    /// Verifies the signature of a message digest against a public key.
    pub fn verify_hash(&self, hash: &Keccak256, pk: &PublicKey) -> anyhow::Result<()> {
        let rec = self.recover_hash(hash)?;
        anyhow::ensure!(
            &rec == pk,
            "PublicKey mismatch: expected {}, got {}",
            hex::encode(pk.encode()),
            hex::encode(rec.encode())
        );
        Ok(())
    }

    /// Recovers the public key from the signature of a message digest.
    pub fn recover_hash(&self, hash: &Keccak256) -> anyhow::Result<PublicKey> {
        let vk = k256::ecdsa::VerifyingKey::recover_from_prehash(
            hash.as_bytes(),
            &self.sig,
            self.recid,
        )?;
        Ok(PublicKey(vk))
    }

    /// Recovers the address of the signer of a message digest.
    pub fn recover_address(&self, hash: &Keccak256) -> anyhow::Result<[u8; ADDRESS_LENGTH]> {
        Ok(self.recover_hash(hash)?.address())
    }
}

impl ByteFmt for Signature {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(
            bytes.len() == SIGNATURE_LENGTH,
            "unexpected signature length: {}",
            bytes.len()
        );
        let Some(recid) = k256::ecdsa::RecoveryId::from_byte(normalize_recovery_id(bytes[64]))
        else {
            bail!("unexpected recovery ID: {}", bytes[64]);
        };
        let sig = k256::ecdsa::Signature::from_slice(&bytes[..64])?;
        Ok(Self { sig, recid })
    }

    fn encode(&self) -> Vec<u8> {
        let mut bz = vec![0u8; SIGNATURE_LENGTH];
        let (r, s) = self.sig.split_bytes();
        bz[..32].copy_from_slice(&r);
        bz[32..64].copy_from_slice(&s);
        bz[64] = self.recid.to_byte() + 27;
        bz
    }
}

impl Hash for Signature {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(&self.encode())
    }
}

impl PartialOrd for Signature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Signature {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        ByteFmt::encode(self).cmp(&ByteFmt::encode(other))
    }
}

/// Maps the V byte produced by the various Ethereum signing conventions
/// (raw, pre-EIP-155 and EIP-155) onto a recovery ID.
fn normalize_recovery_id(v: u8) -> u8 {
    match v {
        v @ 0..=26 => v % 4,
        v @ 27..=34 => (v - 27) % 4,
        v @ 35.. => (v - 1) % 2,
    }
}
