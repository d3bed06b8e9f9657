use assert_matches::assert_matches;
use hotstuff_protobuf::testonly::test_encode_random;
use rand::Rng as _;

use super::*;
use crate::validator::{testonly, Signature};

#[test]
fn test_encoding() {
    let rng = &mut testonly::rng();
    test_encode_random::<View>(rng);
    test_encode_random::<Block>(rng);
    test_encode_random::<Node>(rng);
    test_encode_random::<QuorumCert>(rng);
    test_encode_random::<Message>(rng);
}

#[test]
fn test_view_ordering() {
    assert!(View::new(1, 9) < View::new(2, 0));
    assert!(View::new(2, 0) < View::new(2, 1));
    assert_eq!(View::new(5, 3).next_round(), View::new(5, 4));
    assert_eq!(View::new(5, 3).next_height(), View::new(6, 0));
}

#[test]
fn test_block_hash_ignores_seals() {
    let rng = &mut testonly::rng();
    let block: Block = rng.gen();
    let seals: Vec<Signature> = (0..3).map(|_| rng.gen()).collect();
    assert_eq!(block.hash(), block.with_seals(seals).hash());

    let mut other = block.clone();
    other.payload.push(1);
    assert_ne!(block.hash(), other.hash());
}

#[test]
fn test_node_hash() {
    let rng = &mut testonly::rng();
    let node: Node = rng.gen();
    assert_eq!(node.hash(), Node::hash_of(&node.parent, &node.block.hash()));

    let mut other = node.clone();
    other.parent = rng.gen();
    assert_ne!(node.hash(), other.hash());

    let root = Node::root(node.block.clone());
    assert_eq!(root.parent, NodeHash::ZERO);
    assert_ne!(root.hash(), node.hash());
}

#[test]
fn test_root_qc() {
    let rng = &mut testonly::rng();
    let block: Block = rng.gen();
    let qc = QuorumCert::root(&block);
    assert!(qc.is_root());
    assert_eq!(qc.view, View::new(block.number, 0));
    assert_eq!(qc.node, Node::root(block).hash());

    // A real certificate outranks a root one at the same view.
    let mut real = qc.clone();
    real.seal = Some(rng.gen());
    assert!(real.rank() > qc.rank());
}

#[test]
fn test_msg_code() {
    for code in MsgCode::ALL {
        assert_eq!(MsgCode::try_from(code as u32).unwrap(), code);
    }
    assert!(MsgCode::try_from(8).is_err());
    // Codes are ordered by protocol flow.
    assert!(MsgCode::ALL.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_signing_hash_binds_all_fields() {
    let rng = &mut testonly::rng();
    let view: View = rng.gen();
    let payload = vec![1, 2, 3];
    let base = signing_hash(MsgCode::Prepare, view, &payload);
    assert_ne!(base, signing_hash(MsgCode::PreCommit, view, &payload));
    assert_ne!(base, signing_hash(MsgCode::Prepare, view.next_round(), &payload));
    assert_ne!(base, signing_hash(MsgCode::Prepare, view, &[1, 2]));
}

#[test]
fn test_payload_decoding() {
    let rng = &mut testonly::rng();
    for _ in 0..20 {
        let msg: ConsensusMsg = rng.gen();
        let payload = msg.encode();
        assert_eq!(ConsensusMsg::decode(msg.code(), &payload).unwrap(), msg);
    }

    // A vote payload doesn't decode as a proposal.
    let vote = ConsensusMsg::PrepareVote(Vote { digest: rng.gen() });
    assert_matches!(ConsensusMsg::decode(MsgCode::Prepare, &vote.encode()), Err(_));
}

#[test]
fn test_message_sender_recovery() {
    let rng = &mut testonly::rng();
    let setup = testonly::Setup::new(rng, 4);
    let signer = setup.signer(2);
    let msg = ConsensusMsg::CommitVote(Vote { digest: rng.gen() });
    let mut signed = signer.sign_msg(rng.gen(), &msg, None).unwrap();
    assert_eq!(signed.recover_sender().unwrap(), setup.keys[2].address());
    assert_eq!(signed.decode_payload().unwrap(), msg);

    // Tampering with the view changes the recovered sender.
    signed.view = signed.view.next_round();
    assert_ne!(
        signed.recover_sender().ok(),
        Some(setup.keys[2].address())
    );
}
