use assert_matches::assert_matches;
use hotstuff_consensus_roles::validator::{self, ConsensusMsg, MsgCode};
use test_casing::test_casing;

use crate::{
    hotstuff::{testonly::UTHarness, Error, Target},
    round_state::State,
};

#[test_casing(3, [1, 4, 7])]
#[tokio::test]
async fn new_view_quorum_triggers_proposal(n: usize) {
    let mut util = UTHarness::new_leader(n).await;
    let req = util.new_request();
    util.core.handle_request(req.clone()).await.unwrap();

    let root = util.root_qc();
    let q = util.quorum();
    let from: Vec<usize> = (0..q).collect();
    assert!(util.process_new_views(&from[..q - 1], &root).await.is_none());
    assert_eq!(util.state(), State::AcceptRequest);

    let out = util.process_new_views(&from[q - 1..], &root).await.unwrap();
    assert_eq!(out.target, Target::Broadcast);
    assert_eq!(out.msg.view, util.view());
    assert_matches!(out.msg.decode_payload().unwrap(), ConsensusMsg::Prepare(p) => {
        assert_eq!(p.qc, root);
        assert_eq!(p.node.parent, root.node);
        assert_eq!(p.node.block, req.block);
    });
    assert_eq!(util.state(), State::HighQc);
    assert!(util.try_recv().is_none());
}

#[tokio::test]
async fn leader_waits_for_request() {
    let mut util = UTHarness::new_leader(4).await;
    let root = util.root_qc();
    let from: Vec<usize> = (0..util.quorum()).collect();
    assert!(util.process_new_views(&from, &root).await.is_none());
    assert_eq!(util.state(), State::HighQc);

    let req = util.new_request();
    util.core.handle_request(req.clone()).await.unwrap();
    let out = util.try_recv().unwrap();
    assert_eq!(out.msg.code, MsgCode::Prepare);
    assert_matches!(out.msg.decode_payload().unwrap(), ConsensusMsg::Prepare(p) => {
        assert_eq!(p.node.block, req.block);
    });

    // A later request for the same height doesn't produce a second proposal.
    let req = util.new_request();
    util.core.handle_request(req).await.unwrap();
    assert!(util.try_recv().is_none());
}

#[tokio::test]
async fn duplicate_new_view_counted_once() {
    let mut util = UTHarness::new_leader(4).await;
    let req = util.new_request();
    util.core.handle_request(req).await.unwrap();
    let root = util.root_qc();
    assert!(util.process_new_views(&[1, 1, 1, 2, 2], &root).await.is_none());
    assert_eq!(util.core.rs().unwrap().new_views.len(), 2);
    assert!(util.process_new_views(&[3], &root).await.is_some());
}

#[tokio::test]
async fn new_view_to_non_proposer() {
    let mut util = UTHarness::new_replica(4).await;
    let msg = util.sign(
        0,
        ConsensusMsg::NewView(validator::NewView {
            prepare_qc: util.root_qc(),
        }),
    );
    assert_matches!(util.process(msg).await, Err(Error::NotToProposer));
}

#[tokio::test]
async fn new_view_with_invalid_prepare_qc() {
    let mut util = UTHarness::new_leader(4).await;
    let mut prepare_qc = util.root_qc();
    prepare_qc.node = validator::NodeHash::ZERO;
    let msg = util.sign(1, ConsensusMsg::NewView(validator::NewView { prepare_qc }));
    assert_matches!(util.process(msg).await, Err(Error::InvalidQc(_)));

    // A certificate can't be from the view it is used in.
    let node = util.new_node();
    let prepare_qc = util.prepare_qc(&node, &[0, 1, 2]);
    let msg = util.sign(1, ConsensusMsg::NewView(validator::NewView { prepare_qc }));
    assert_matches!(util.process(msg).await, Err(Error::InvalidQc(_)));
}

#[tokio::test]
async fn new_view_from_non_validator() {
    let mut util = UTHarness::new_leader(4).await;
    let outsider: validator::SecretKey = rand::Rng::gen(&mut util.rng);
    let msg = validator::Signer::new(outsider.clone())
        .sign_msg(
            util.view(),
            &ConsensusMsg::NewView(validator::NewView {
                prepare_qc: util.root_qc(),
            }),
            None,
        )
        .unwrap();
    assert_matches!(util.process(msg).await, Err(Error::NonValidatorSigner(addr)) => {
        assert_eq!(addr, outsider.address());
    });
}

#[tokio::test]
async fn corrupted_message_is_rejected() {
    let mut util = UTHarness::new_leader(4).await;
    let mut msg = util.sign(
        1,
        ConsensusMsg::NewView(validator::NewView {
            prepare_qc: util.root_qc(),
        }),
    );
    msg.payload = util.random_payload();
    // The signature covers the payload, so the sender can't be recovered correctly.
    assert_matches!(
        util.process(msg).await,
        Err(Error::NonValidatorSigner(_) | Error::InvalidSignature(_))
    );
}
