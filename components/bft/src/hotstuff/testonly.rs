use std::{sync::Arc, time::Duration};

use hotstuff_consensus_roles::validator::{self, testonly::Setup};
use rand::{rngs::StdRng, Rng as _};
use tokio::sync::mpsc;

use super::{Core, Error, LocalEvents, Outbound, Target};
use crate::{
    request_set::Request,
    round_state::State,
    testonly::{InMemoryBackend, Network},
    Config,
};

/// `UTHarness` provides various utilities for unit tests.
/// It wraps a single replica whose outbound messages are captured instead of sent.
///
/// It should be instantiated once for every test case.
pub(crate) struct UTHarness {
    pub(crate) core: Core,
    pub(crate) setup: Setup,
    pub(crate) backend: Arc<InMemoryBackend>,
    pub(crate) owner: usize,
    pub(crate) rng: StdRng,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    local: LocalEvents,
}

impl UTHarness {
    /// Creates a harness for validator `owner` of a set of `n` validators.
    /// The replica is started at height 1 and its initial `NEW_VIEW` is discarded.
    pub(crate) async fn new(n: usize, owner: usize) -> Self {
        let mut rng = validator::testonly::rng();
        let setup = Setup::new(&mut rng, n);
        let backend = InMemoryBackend::new(
            setup.keys[owner].address(),
            Arc::new(Network::default()),
            setup.genesis.clone(),
            setup.validators.clone(),
        );
        Self::new_with_backend(setup, owner, backend, rng).await
    }

    /// Harness whose replica is the proposer of view (1, 0).
    pub(crate) async fn new_leader(n: usize) -> Self {
        let mut util = Self::new(n, 0).await;
        if !util.core.is_proposer() {
            let leader = util.leader();
            util = Self::new(n, leader).await;
        }
        assert!(util.core.is_proposer());
        util
    }

    /// Harness whose replica is not the proposer of view (1, 0).
    pub(crate) async fn new_replica(n: usize) -> Self {
        let util = Self::new(n, 0).await;
        let leader = util.leader();
        Self::new(n, (leader + 1) % n).await
    }

    pub(crate) async fn new_with_backend(
        setup: Setup,
        owner: usize,
        backend: InMemoryBackend,
        rng: StdRng,
    ) -> Self {
        let mut config = Config::new(setup.keys[owner].clone());
        // Timers should not fire on their own in unit tests.
        config.request_timeout = Duration::from_secs(3600);
        let backend = Arc::new(backend);
        let (outbound_send, outbound) = mpsc::unbounded_channel();
        let (core, local) = Core::new(Arc::new(config), backend.clone(), outbound_send);
        let mut util = Self {
            core,
            setup,
            backend,
            owner,
            rng,
            outbound,
            local,
        };
        util.core.start_new_round(0).await.unwrap();
        let new_view = util.try_recv().unwrap();
        assert_eq!(new_view.target, Target::Unicast);
        assert_eq!(new_view.msg.code, validator::MsgCode::NewView);
        util
    }

    pub(crate) fn view(&self) -> validator::View {
        self.core.rs().unwrap().view()
    }

    pub(crate) fn state(&self) -> State {
        self.core.rs().unwrap().state()
    }

    pub(crate) fn owner_address(&self) -> validator::Address {
        self.setup.keys[self.owner].address()
    }

    /// Index of the proposer of the current view.
    pub(crate) fn leader(&self) -> usize {
        self.setup.index_of(&self.core.validators.proposer())
    }

    pub(crate) fn quorum(&self) -> usize {
        self.core.validators.quorum_size()
    }

    /// Signs `msg` as validator `i` in the current view.
    pub(crate) fn sign(&self, i: usize, msg: validator::ConsensusMsg) -> validator::Message {
        self.sign_at(i, self.view(), msg, None)
    }

    pub(crate) fn sign_at(
        &self,
        i: usize,
        view: validator::View,
        msg: validator::ConsensusMsg,
        seal: Option<validator::Signature>,
    ) -> validator::Message {
        self.setup.signer(i).sign_msg(view, &msg, seal).unwrap()
    }

    /// Commit vote of validator `i` for `node`, with its committed seal.
    pub(crate) fn commit_vote(&self, i: usize, node: &validator::Node) -> validator::Message {
        let seal = self.setup.signer(i).seal_committed(&node.block.hash()).unwrap();
        self.sign_at(
            i,
            self.view(),
            validator::testonly::vote_msg(validator::MsgCode::CommitVote, node.hash()),
            Some(seal),
        )
    }

    /// A request for a block on top of the chain head, made by the proposer.
    pub(crate) fn new_request(&mut self) -> Request {
        let (last, _) = self.backend.last_proposal_for_tests();
        let proposer = self.core.validators.proposer();
        Request {
            block: self.setup.make_block(&mut self.rng, &last, proposer),
        }
    }

    /// A node for the current height, extending the root of the chain head.
    pub(crate) fn new_node(&mut self) -> validator::Node {
        let root = self.root_qc();
        validator::Node {
            parent: root.node,
            block: self.new_request().block,
        }
    }

    /// Root certificate of the chain head.
    pub(crate) fn root_qc(&self) -> validator::QuorumCert {
        let (last, _) = self.backend.last_proposal_for_tests();
        validator::QuorumCert::root(&last)
    }

    /// Prepare QC of `node` in the current view, produced by the leader.
    pub(crate) fn prepare_qc(
        &self,
        node: &validator::Node,
        voters: &[usize],
    ) -> validator::QuorumCert {
        self.setup.vote_qc(
            self.leader(),
            voters,
            self.view(),
            validator::MsgCode::PrepareVote,
            node.hash(),
        )
    }

    /// Commit QC of `node` in the current view, produced by the leader.
    pub(crate) fn commit_qc(
        &self,
        node: &validator::Node,
        voters: &[usize],
    ) -> validator::QuorumCert {
        self.setup.commit_qc(self.leader(), voters, self.view(), node)
    }

    pub(crate) async fn process(&mut self, msg: validator::Message) -> Result<(), Error> {
        self.core.process_message(None, msg).await
    }

    /// Processes `msg` and returns the single message it produced.
    pub(crate) async fn process_and_recv(
        &mut self,
        msg: validator::Message,
    ) -> Result<Outbound, Error> {
        self.process(msg).await?;
        let out = self.try_recv().expect("no message was sent");
        assert!(self.try_recv().is_none(), "more than one message was sent");
        Ok(out)
    }

    pub(crate) fn try_recv(&mut self) -> Option<Outbound> {
        self.outbound.try_recv().ok()
    }

    /// Processes the messages replayed from the backlog.
    pub(crate) async fn process_backlog(&mut self) -> Vec<Result<(), Error>> {
        let mut res = vec![];
        while let Ok((sender, msg)) = self.local.backlog.try_recv() {
            res.push(self.core.process_message(Some(sender), msg).await);
        }
        res
    }

    /// Feeds `NEW_VIEW` messages carrying `prepare_qc` from the given validators.
    pub(crate) async fn process_new_views(
        &mut self,
        from: &[usize],
        prepare_qc: &validator::QuorumCert,
    ) -> Option<Outbound> {
        for i in from {
            let msg = self.sign(
                *i,
                validator::ConsensusMsg::NewView(validator::NewView {
                    prepare_qc: prepare_qc.clone(),
                }),
            );
            self.process(msg).await.unwrap();
        }
        self.try_recv()
    }

    /// Feeds votes of the given code for `node` from the given validators.
    pub(crate) async fn process_votes(
        &mut self,
        code: validator::MsgCode,
        node: &validator::Node,
        from: &[usize],
    ) -> Option<Outbound> {
        for i in from {
            let msg = if code == validator::MsgCode::CommitVote {
                self.commit_vote(*i, node)
            } else {
                self.sign(*i, validator::testonly::vote_msg(code, node.hash()))
            };
            self.process(msg).await.unwrap();
        }
        self.try_recv()
    }

    /// Makes the leader propose a block. Returns the proposed node.
    pub(crate) async fn leader_propose(&mut self) -> validator::Node {
        let req = self.new_request();
        self.core.handle_request(req).await.unwrap();
        let root = self.root_qc();
        let from: Vec<usize> = (0..self.quorum()).collect();
        let out = self.process_new_views(&from, &root).await.unwrap();
        match out.msg.decode_payload().unwrap() {
            validator::ConsensusMsg::Prepare(p) => p.node,
            msg => panic!("unexpected {msg:?}"),
        }
    }

    /// Makes the leader propose a block and lock on it.
    /// Returns the node and its locked QC.
    pub(crate) async fn leader_lock(&mut self) -> (validator::Node, validator::QuorumCert) {
        let node = self.leader_propose().await;
        let from: Vec<usize> = (0..self.quorum()).collect();
        self.process_votes(validator::MsgCode::PrepareVote, &node, &from)
            .await
            .unwrap();
        let out = self
            .process_votes(validator::MsgCode::PreCommitVote, &node, &from)
            .await
            .unwrap();
        match out.msg.decode_payload().unwrap() {
            validator::ConsensusMsg::Commit(c) => (node, c.locked_qc),
            msg => panic!("unexpected {msg:?}"),
        }
    }

    /// Drives a replica through the prepare and pre-commit phases of `node`,
    /// leaving it locked.
    pub(crate) async fn lock_replica(&mut self, node: &validator::Node) {
        let leader = self.leader();
        let prepare = self.sign(
            leader,
            validator::ConsensusMsg::Prepare(validator::Proposal {
                node: node.clone(),
                qc: self.root_qc(),
            }),
        );
        self.process_and_recv(prepare).await.unwrap();
        let voters: Vec<_> = (0..self.quorum()).collect();
        let pre_commit = self.sign(
            leader,
            validator::ConsensusMsg::PreCommit(validator::Proposal {
                node: node.clone(),
                qc: self.prepare_qc(node, &voters),
            }),
        );
        self.process_and_recv(pre_commit).await.unwrap();
        assert_eq!(self.state(), State::PreCommitted);
    }

    /// Moves the replica to the next round through a timeout.
    pub(crate) async fn timeout(&mut self) -> Outbound {
        let view = self.view();
        self.core.handle_timeout(view).await.unwrap();
        assert_eq!(self.view(), view.next_round());
        let new_view = self.try_recv().unwrap();
        assert_eq!(new_view.msg.code, validator::MsgCode::NewView);
        new_view
    }

    /// Random bytes, for corrupting messages.
    pub(crate) fn random_payload(&mut self) -> Vec<u8> {
        (0..16).map(|_| self.rng.gen()).collect()
    }
}

impl InMemoryBackend {
    fn last_proposal_for_tests(&self) -> (validator::Block, validator::Address) {
        crate::Backend::last_proposal(self).unwrap()
    }
}
