//! Localnet configuration.
use std::{collections::BTreeSet, fs, path::Path, time::Duration};

use anyhow::Context as _;
use hotstuff_consensus_roles::validator;

/// Decodes a value from json, rejecting trailing input.
pub fn decode_json<T: serde::de::DeserializeOwned>(json: &str) -> anyhow::Result<T> {
    let mut d = serde_json::Deserializer::from_str(json);
    let p = T::deserialize(&mut d)?;
    d.end()?;
    Ok(p)
}

/// Encodes a value to pretty-printed json.
pub fn encode_json<T: serde::Serialize>(x: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(x)?)
}

/// Configuration of an in-process network of validators.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalnetConfig {
    /// Number of validators.
    pub validators: usize,
    /// Indices of the validators which take no part in the protocol.
    pub offline: Vec<usize>,
    /// Height the honest validators have to finalize.
    pub blocks: validator::Height,
    /// Base round timeout.
    pub request_timeout_ms: u64,
    /// Round timeout increment, doubled on every round change.
    pub block_period_ms: u64,
    /// Proposer rotation.
    pub proposer_policy: validator::ProposerPolicy,
    /// Seed of the keys, random if absent.
    pub seed: Option<u64>,
    /// How long to wait for the blocks before giving up.
    pub deadline_secs: u64,
}

impl Default for LocalnetConfig {
    fn default() -> Self {
        Self {
            validators: 4,
            offline: vec![],
            blocks: 10,
            request_timeout_ms: 1000,
            block_period_ms: 200,
            proposer_policy: validator::ProposerPolicy::RoundRobin,
            seed: None,
            deadline_secs: 120,
        }
    }
}

impl LocalnetConfig {
    /// Reads the config from a json file.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path).with_context(|| format!("{path:?}"))?;
        decode_json(&json).context("decode_json()")
    }

    /// Checks that the network can make progress.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.validators > 0, "at least 1 validator is required");
        let offline: BTreeSet<_> = self.offline.iter().collect();
        for i in &offline {
            anyhow::ensure!(**i < self.validators, "offline validator {i} doesn't exist");
        }
        let online = self.validators - offline.len();
        let quorum = validator::quorum_size(self.validators);
        anyhow::ensure!(
            online >= quorum,
            "{online} online validators can't make a quorum of {quorum}"
        );
        anyhow::ensure!(
            self.proposer_policy != validator::ProposerPolicy::Vrf,
            "VRF proposer selection is not supported"
        );
        Ok(())
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub(crate) fn block_period(&self) -> Duration {
        Duration::from_millis(self.block_period_ms)
    }
}
