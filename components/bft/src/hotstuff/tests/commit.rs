use assert_matches::assert_matches;
use hotstuff_consensus_roles::validator::{self, ConsensusMsg, MsgCode};

use crate::{
    hotstuff::{testonly::UTHarness, Error, Target},
    round_state::State,
};

fn commit(util: &UTHarness, locked_qc: validator::QuorumCert) -> validator::Message {
    util.sign(
        util.leader(),
        ConsensusMsg::Commit(validator::Commit { locked_qc }),
    )
}

#[tokio::test]
async fn commit_vote_carries_committed_seal() {
    let mut util = UTHarness::new_replica(4).await;
    let node = util.new_node();
    util.lock_replica(&node).await;
    let qc = util.prepare_qc(&node, &[0, 1, 2]);
    let out = util.process_and_recv(commit(&util, qc)).await.unwrap();
    assert_eq!(out.target, Target::Unicast);
    assert_matches!(out.msg.decode_payload().unwrap(), ConsensusMsg::CommitVote(v) => {
        assert_eq!(v.digest, node.hash());
    });
    let seal = out.msg.committed_seal.unwrap();
    let signer = seal
        .recover(&validator::wrap_committed_hash(&node.block.hash()))
        .unwrap();
    assert_eq!(signer, util.owner_address());
    assert_eq!(util.state(), State::Committed);
}

#[tokio::test]
async fn commit_locks_replica_which_missed_pre_commit() {
    let mut util = UTHarness::new_replica(4).await;
    let node = util.new_node();
    let prepare = util.sign(
        util.leader(),
        ConsensusMsg::Prepare(validator::Proposal {
            node: node.clone(),
            qc: util.root_qc(),
        }),
    );
    util.process_and_recv(prepare).await.unwrap();
    let qc = util.prepare_qc(&node, &[0, 1, 2]);
    let out = util.process_and_recv(commit(&util, qc.clone())).await.unwrap();
    assert_eq!(out.msg.code, MsgCode::CommitVote);
    let rs = util.core.rs().unwrap();
    assert_eq!(rs.locked_qc, Some(qc));
    assert_eq!(rs.locked_node(), Some(node.hash()));
}

#[tokio::test]
async fn commit_with_invalid_locked_qc() {
    let mut util = UTHarness::new_replica(4).await;
    let node = util.new_node();
    util.lock_replica(&node).await;
    let qc = util.prepare_qc(&node, &[0]);
    assert_matches!(
        util.process(commit(&util, qc)).await,
        Err(Error::InvalidQc(_))
    );
    let other = util.new_node();
    let qc = util.prepare_qc(&other, &[0, 1, 2]);
    assert_matches!(
        util.process(commit(&util, qc)).await,
        Err(Error::InvalidDigest { .. })
    );
}

#[tokio::test]
async fn commit_vote_quorum() {
    let mut util = UTHarness::new_leader(4).await;
    let (node, _) = util.leader_lock().await;
    let q = util.quorum();
    let from: Vec<usize> = (0..q).collect();
    assert!(util
        .process_votes(MsgCode::CommitVote, &node, &from[..q - 1])
        .await
        .is_none());
    let out = util
        .process_votes(MsgCode::CommitVote, &node, &from[q - 1..])
        .await
        .unwrap();
    assert_eq!(out.target, Target::Broadcast);
    let commit_qc = assert_matches!(
        out.msg.decode_payload().unwrap(),
        ConsensusMsg::Decide(d) => d.commit_qc
    );
    assert_eq!(commit_qc.code, MsgCode::CommitVote);
    assert_eq!(commit_qc.node, node.hash());
    validator::verify_commit_qc(&commit_qc, &node.block.hash(), &util.core.validators).unwrap();
    assert_eq!(util.state(), State::Committed);

    // Late votes don't produce another DECIDE.
    assert!(util
        .process_votes(MsgCode::CommitVote, &node, &[3])
        .await
        .is_none());
}

#[tokio::test]
async fn commit_vote_with_foreign_seal() {
    let mut util = UTHarness::new_leader(4).await;
    let (node, _) = util.leader_lock().await;

    let mut msg = util.commit_vote(1, &node);
    msg.committed_seal = util.commit_vote(2, &node).committed_seal;
    assert_matches!(util.process(msg).await, Err(Error::InvalidCommittedSeal(_)));

    let mut msg = util.commit_vote(1, &node);
    msg.committed_seal = None;
    assert_matches!(util.process(msg).await, Err(Error::InvalidCommittedSeal(_)));

    assert_eq!(util.core.rs().unwrap().commit_votes.len(), 0);
}

#[tokio::test]
async fn commit_vote_before_lock() {
    let mut util = UTHarness::new_leader(4).await;
    let node = util.leader_propose().await;
    let msg = util.commit_vote(1, &node);
    assert_matches!(
        util.process(msg).await,
        Err(Error::InvalidDigest { want: None, .. })
    );
}
