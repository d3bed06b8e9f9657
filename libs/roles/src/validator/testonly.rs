//! Test-only utilities.
use rand::{
    distributions::{Distribution, Standard},
    rngs::StdRng,
    Rng, SeedableRng,
};

use super::{
    signing_hash, Address, Block, BlockHash, Commit, ConsensusMsg, Decide, Message, MsgCode,
    MsgHash, NewView, Node, NodeHash, ProposerPolicy, Proposal, QuorumCert, SecretKey, Signer,
    ValidatorSet, View, Vote,
};

/// Deterministic rng for tests.
pub fn rng() -> StdRng {
    StdRng::seed_from_u64(1_729)
}

/// Test setup: a validator set together with the keys of its members and a
/// genesis block.
#[derive(Debug, Clone)]
pub struct Setup {
    /// Validators' secret keys, in address order.
    pub keys: Vec<SecretKey>,
    /// The validator set, with round-robin rotation.
    pub validators: ValidatorSet,
    /// Block 0.
    pub genesis: Block,
}

impl Setup {
    /// Setup with `n` random validators.
    pub fn new(rng: &mut impl Rng, n: usize) -> Self {
        let mut keys: Vec<SecretKey> = (0..n).map(|_| rng.gen()).collect();
        keys.sort_by_key(|k| k.address());
        let validators = ValidatorSet::new(
            keys.iter().map(SecretKey::address),
            ProposerPolicy::RoundRobin,
        )
        .unwrap();
        Self {
            keys,
            validators,
            genesis: Block {
                number: 0,
                parent: BlockHash::ZERO,
                proposer: Address::ZERO,
                payload: b"genesis".to_vec(),
                committed_seals: vec![],
            },
        }
    }

    /// Signer of the `i`-th validator.
    pub fn signer(&self, i: usize) -> Signer {
        Signer::new(self.keys[i].clone())
    }

    /// Index of the validator with the given address.
    pub fn index_of(&self, addr: &Address) -> usize {
        self.keys.iter().position(|k| k.address() == *addr).unwrap()
    }

    /// A block extending `parent`, proposed by `proposer`.
    pub fn make_block(&self, rng: &mut impl Rng, parent: &Block, proposer: Address) -> Block {
        Block {
            number: parent.number + 1,
            parent: parent.hash(),
            proposer,
            payload: (0..8).map(|_| rng.gen()).collect(),
            committed_seals: vec![],
        }
    }

    /// Vote certificate for `node`, signed by the validators in `voters`
    /// and sealed by `proposer`.
    pub fn vote_qc(
        &self,
        proposer: usize,
        voters: &[usize],
        view: View,
        code: MsgCode,
        node: NodeHash,
    ) -> QuorumCert {
        let votes = voters
            .iter()
            .map(|i| {
                self.signer(*i)
                    .sign_msg(view, &vote_msg(code, node), None)
                    .unwrap()
                    .signature
            })
            .collect();
        self.signer(proposer)
            .seal_qc(view, code, node, votes)
            .unwrap()
    }

    /// Commit certificate for `node`, with committed seals of `voters`.
    pub fn commit_qc(
        &self,
        proposer: usize,
        voters: &[usize],
        view: View,
        node: &Node,
    ) -> QuorumCert {
        let block = node.block.hash();
        let seals = voters
            .iter()
            .map(|i| self.signer(*i).seal_committed(&block).unwrap())
            .collect();
        self.signer(proposer)
            .seal_qc(view, MsgCode::CommitVote, node.hash(), seals)
            .unwrap()
    }
}

/// Vote message of the given code.
pub fn vote_msg(code: MsgCode, digest: NodeHash) -> ConsensusMsg {
    let vote = Vote { digest };
    match code {
        MsgCode::PrepareVote => ConsensusMsg::PrepareVote(vote),
        MsgCode::PreCommitVote => ConsensusMsg::PreCommitVote(vote),
        MsgCode::CommitVote => ConsensusMsg::CommitVote(vote),
        _ => panic!("{code} is not a vote"),
    }
}

impl Distribution<View> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> View {
        View::new(rng.gen_range(0..1000), rng.gen_range(0..10))
    }
}

impl Distribution<MsgCode> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MsgCode {
        MsgCode::ALL[rng.gen_range(0..MsgCode::ALL.len())]
    }
}

impl Distribution<MsgHash> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MsgHash {
        MsgHash(rng.gen())
    }
}

impl Distribution<BlockHash> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BlockHash {
        BlockHash(rng.gen())
    }
}

impl Distribution<NodeHash> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> NodeHash {
        NodeHash(rng.gen())
    }
}

impl Distribution<Block> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        let n = rng.gen_range(0..4);
        Block {
            number: rng.gen_range(0..1000),
            parent: rng.gen(),
            proposer: rng.gen(),
            payload: (0..rng.gen_range(0..32)).map(|_| rng.gen()).collect(),
            committed_seals: (0..n).map(|_| rng.gen()).collect(),
        }
    }
}

impl Distribution<Node> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Node {
        Node {
            parent: rng.gen(),
            block: rng.gen(),
        }
    }
}

impl Distribution<QuorumCert> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> QuorumCert {
        QuorumCert {
            view: rng.gen(),
            code: rng.gen(),
            node: rng.gen(),
            proposer: rng.gen(),
            seal: rng.gen_bool(0.9).then(|| rng.gen()),
            committed_seals: (0..rng.gen_range(0..5)).map(|_| rng.gen()).collect(),
        }
    }
}

impl Distribution<ConsensusMsg> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ConsensusMsg {
        match rng.gen::<MsgCode>() {
            MsgCode::NewView => ConsensusMsg::NewView(NewView {
                prepare_qc: rng.gen(),
            }),
            MsgCode::Prepare => ConsensusMsg::Prepare(Proposal {
                node: rng.gen(),
                qc: rng.gen(),
            }),
            MsgCode::PreCommit => ConsensusMsg::PreCommit(Proposal {
                node: rng.gen(),
                qc: rng.gen(),
            }),
            MsgCode::Commit => ConsensusMsg::Commit(Commit {
                locked_qc: rng.gen(),
            }),
            MsgCode::Decide => ConsensusMsg::Decide(Decide {
                commit_qc: rng.gen(),
            }),
            code => vote_msg(code, rng.gen()),
        }
    }
}

/// A message with a random payload, signed by a random key.
impl Distribution<Message> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Message {
        let msg: ConsensusMsg = rng.gen();
        let view: View = rng.gen();
        let key: SecretKey = rng.gen();
        let payload = msg.encode();
        Message {
            signature: key
                .sign_hash(&signing_hash(msg.code(), view, &payload))
                .unwrap(),
            code: msg.code(),
            view,
            payload,
            committed_seal: (msg.code() == MsgCode::CommitVote).then(|| rng.gen()),
        }
    }
}
