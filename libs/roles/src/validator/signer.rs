//! Signing of protocol messages and verification of quorum certificates.
use std::collections::BTreeSet;

use hotstuff_consensus_crypto::keccak256::Keccak256;

use super::{
    seal_hash, signing_hash, Address, BlockHash, ConsensusMsg, Message, MsgCode, MsgHash,
    NodeHash, QuorumCert, SecretKey, Signature, ValidatorSet, View,
};

/// Salt appended to a block hash before it is sealed. The salted hash can't
/// collide with a message signing hash, so a committed seal is never a valid
/// vote signature and vice versa.
pub const COMMITTED_SEAL_SALT: u8 = 0x02;

/// Hash signed by a committed seal of the given block.
pub fn wrap_committed_hash(block: &BlockHash) -> MsgHash {
    MsgHash(Keccak256::concat([
        block.0.as_bytes().as_slice(),
        [COMMITTED_SEAL_SALT].as_slice(),
    ]))
}

/// Reasons for rejecting a quorum certificate.
#[derive(Debug, thiserror::Error)]
pub enum QcError {
    /// A signed certificate was expected.
    #[error("certificate is not sealed")]
    MissingSeal,
    /// The proposer seal doesn't recover.
    #[error("invalid proposer seal: {0:#}")]
    InvalidSeal(anyhow::Error),
    /// The seal was produced by someone else than the declared proposer.
    #[error("seal signed by {got}, but proposer is {want}")]
    ProposerMismatch {
        /// Declared proposer.
        want: Address,
        /// Recovered signer.
        got: Address,
    },
    /// A signer is not a member of the validator set.
    #[error("signer {0} is not a validator")]
    NonValidator(Address),
    /// A committed seal doesn't recover.
    #[error("invalid committed seal: {0:#}")]
    InvalidCommittedSeal(anyhow::Error),
    /// Not enough distinct signers.
    #[error("insufficient quorum: got {got} distinct signers, want {want}")]
    InsufficientQuorum {
        /// Distinct valid signers.
        got: usize,
        /// Quorum size of the validator set.
        want: usize,
    },
}

/// Signs messages on behalf of a validator.
#[derive(Clone, Debug)]
pub struct Signer {
    key: SecretKey,
    address: Address,
}

impl Signer {
    /// Creates a signer.
    pub fn new(key: SecretKey) -> Self {
        Self {
            address: key.address(),
            key,
        }
    }

    /// Address of the signing validator.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a protocol message.
    pub fn sign_msg(
        &self,
        view: View,
        msg: &ConsensusMsg,
        committed_seal: Option<Signature>,
    ) -> anyhow::Result<Message> {
        let code = msg.code();
        let payload = msg.encode();
        Ok(Message {
            signature: self.key.sign_hash(&signing_hash(code, view, &payload))?,
            code,
            view,
            payload,
            committed_seal,
        })
    }

    /// Produces a committed seal of a block.
    pub fn seal_committed(&self, block: &BlockHash) -> anyhow::Result<Signature> {
        self.key.sign_hash(&wrap_committed_hash(block))
    }

    /// Assembles a quorum certificate from collected signatures, sealing it
    /// as the proposer.
    pub fn seal_qc(
        &self,
        view: View,
        code: MsgCode,
        node: NodeHash,
        committed_seals: Vec<Signature>,
    ) -> anyhow::Result<QuorumCert> {
        Ok(QuorumCert {
            view,
            code,
            node,
            proposer: self.address,
            seal: Some(self.key.sign_hash(&seal_hash(code, view, &node))?),
            committed_seals,
        })
    }
}

/// Verifies a vote certificate (`PREPARE_VOTE` or `PRE_COMMIT_VOTE`):
/// a quorum of validators signed the seal hash.
pub fn verify_qc(qc: &QuorumCert, vals: &ValidatorSet) -> Result<(), QcError> {
    let hash = verify_proposer_seal(qc, vals)?;
    verify_committed_seals(&hash, &qc.committed_seals, vals)
}

/// Verifies a commit certificate (`COMMIT_VOTE`): a quorum of validators
/// sealed `block`.
pub fn verify_commit_qc(
    qc: &QuorumCert,
    block: &BlockHash,
    vals: &ValidatorSet,
) -> Result<(), QcError> {
    verify_proposer_seal(qc, vals)?;
    verify_committed_seals(&wrap_committed_hash(block), &qc.committed_seals, vals)
}

fn verify_proposer_seal(qc: &QuorumCert, vals: &ValidatorSet) -> Result<MsgHash, QcError> {
    let seal = qc.seal.as_ref().ok_or(QcError::MissingSeal)?;
    let hash = qc.seal_hash();
    let got = seal.recover(&hash).map_err(QcError::InvalidSeal)?;
    if got != qc.proposer {
        return Err(QcError::ProposerMismatch {
            want: qc.proposer,
            got,
        });
    }
    if !vals.contains(&got) {
        return Err(QcError::NonValidator(got));
    }
    Ok(hash)
}

/// Checks that `seals` contain signatures of at least a quorum of distinct
/// validators over `hash`. Repeated signers are counted once.
pub fn verify_committed_seals(
    hash: &MsgHash,
    seals: &[Signature],
    vals: &ValidatorSet,
) -> Result<(), QcError> {
    let mut remaining: BTreeSet<_> = vals.iter().copied().collect();
    for seal in seals {
        let signer = seal
            .recover(hash)
            .map_err(QcError::InvalidCommittedSeal)?;
        if !vals.contains(&signer) {
            return Err(QcError::NonValidator(signer));
        }
        remaining.remove(&signer);
    }
    let got = vals.len() - remaining.len();
    if got < vals.quorum_size() {
        return Err(QcError::InsufficientQuorum {
            got,
            want: vals.quorum_size(),
        });
    }
    Ok(())
}
