use anyhow::Context as _;
use hotstuff_consensus_crypto::ByteFmt;
use hotstuff_protobuf::{read_required, required, ProtoFmt};

use super::{
    Address, Block, BlockHash, Commit, Decide, Message, MsgCode, NewView, Node, NodeHash,
    Proposal, QuorumCert, Signature, View, Vote,
};
use crate::proto::validator as proto;

fn read_seals(seals: &[Vec<u8>]) -> anyhow::Result<Vec<Signature>> {
    seals
        .iter()
        .enumerate()
        .map(|(i, s)| ByteFmt::decode(s).context(i))
        .collect()
}

impl ProtoFmt for View {
    type Proto = proto::View;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            height: *required(&r.height).context("height")?,
            round: *required(&r.round).context("round")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            height: Some(self.height),
            round: Some(self.round),
        }
    }
}

impl ProtoFmt for Block {
    type Proto = proto::Block;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            number: *required(&r.number).context("number")?,
            parent: BlockHash::decode(required(&r.parent)?).context("parent")?,
            proposer: Address::decode(required(&r.proposer)?).context("proposer")?,
            payload: required(&r.payload).context("payload")?.clone(),
            committed_seals: read_seals(&r.committed_seals).context("committed_seals")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            number: Some(self.number),
            parent: Some(self.parent.encode()),
            proposer: Some(self.proposer.encode()),
            payload: Some(self.payload.clone()),
            committed_seals: self.committed_seals.iter().map(ByteFmt::encode).collect(),
        }
    }
}

impl ProtoFmt for Node {
    type Proto = proto::Node;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            parent: NodeHash::decode(required(&r.parent)?).context("parent")?,
            block: read_required(&r.block).context("block")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            parent: Some(self.parent.encode()),
            block: Some(self.block.build()),
        }
    }
}

impl ProtoFmt for QuorumCert {
    type Proto = proto::QuorumCert;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            view: read_required(&r.view).context("view")?,
            code: MsgCode::try_from(*required(&r.code).context("code")?)?,
            node: NodeHash::decode(required(&r.node)?).context("node")?,
            proposer: Address::decode(required(&r.proposer)?).context("proposer")?,
            seal: r
                .seal
                .as_deref()
                .map(Signature::decode)
                .transpose()
                .context("seal")?,
            committed_seals: read_seals(&r.committed_seals).context("committed_seals")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            view: Some(self.view.build()),
            code: Some(self.code as u32),
            node: Some(self.node.encode()),
            proposer: Some(self.proposer.encode()),
            seal: self.seal.as_ref().map(ByteFmt::encode),
            committed_seals: self.committed_seals.iter().map(ByteFmt::encode).collect(),
        }
    }
}

impl ProtoFmt for NewView {
    type Proto = proto::NewView;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            prepare_qc: read_required(&r.prepare_qc).context("prepare_qc")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            prepare_qc: Some(self.prepare_qc.build()),
        }
    }
}

impl ProtoFmt for Proposal {
    type Proto = proto::Proposal;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            node: read_required(&r.node).context("node")?,
            qc: read_required(&r.qc).context("qc")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            node: Some(self.node.build()),
            qc: Some(self.qc.build()),
        }
    }
}

impl ProtoFmt for Vote {
    type Proto = proto::Vote;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            digest: NodeHash::decode(required(&r.digest)?).context("digest")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            digest: Some(self.digest.encode()),
        }
    }
}

impl ProtoFmt for Commit {
    type Proto = proto::Commit;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            locked_qc: read_required(&r.locked_qc).context("locked_qc")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            locked_qc: Some(self.locked_qc.build()),
        }
    }
}

impl ProtoFmt for Decide {
    type Proto = proto::Decide;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            commit_qc: read_required(&r.commit_qc).context("commit_qc")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            commit_qc: Some(self.commit_qc.build()),
        }
    }
}

impl ProtoFmt for Message {
    type Proto = proto::Message;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            code: MsgCode::try_from(*required(&r.code).context("code")?)?,
            view: read_required(&r.view).context("view")?,
            payload: required(&r.payload).context("payload")?.clone(),
            signature: Signature::decode(required(&r.signature)?).context("signature")?,
            committed_seal: r
                .committed_seal
                .as_deref()
                .map(Signature::decode)
                .transpose()
                .context("committed_seal")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            code: Some(self.code as u32),
            view: Some(self.view.build()),
            payload: Some(self.payload.clone()),
            signature: Some(self.signature.encode()),
            committed_seal: self.committed_seal.as_ref().map(ByteFmt::encode),
        }
    }
}
