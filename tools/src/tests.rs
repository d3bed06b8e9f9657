use std::fs;

use assert_matches::assert_matches;
use hotstuff_consensus_roles::validator;
use tempfile::TempDir;

use crate::{decode_json, encode_json, LocalnetConfig};

fn fast_config() -> LocalnetConfig {
    LocalnetConfig {
        validators: 4,
        blocks: 3,
        request_timeout_ms: 300,
        block_period_ms: 50,
        seed: Some(1729),
        deadline_secs: 60,
        ..LocalnetConfig::default()
    }
}

#[test]
fn partial_config_uses_defaults() {
    let cfg: LocalnetConfig = decode_json(r#"{"validators": 7, "offline": [1, 2]}"#).unwrap();
    assert_eq!(cfg.validators, 7);
    assert_eq!(cfg.offline, vec![1, 2]);
    assert_eq!(cfg.blocks, LocalnetConfig::default().blocks);
    assert_eq!(cfg.proposer_policy, validator::ProposerPolicy::RoundRobin);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(decode_json::<LocalnetConfig>(r#"{"validator": 7}"#).is_err());
    assert!(decode_json::<LocalnetConfig>(r#"{} {}"#).is_err());
}

#[test]
fn config_is_read_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("localnet.json");
    let mut cfg = fast_config();
    cfg.proposer_policy = validator::ProposerPolicy::Sticky;
    fs::write(&path, encode_json(&cfg).unwrap()).unwrap();
    assert_eq!(LocalnetConfig::read(&path).unwrap(), cfg);
}

#[test]
fn validate() {
    fast_config().validate().unwrap();
    let mut cfg = fast_config();
    cfg.offline = vec![1, 1];
    cfg.validate().unwrap();
    cfg.offline = vec![1, 2];
    assert_matches!(cfg.validate(), Err(_));
    cfg.offline = vec![4];
    assert_matches!(cfg.validate(), Err(_));
    cfg.offline = vec![];
    cfg.validators = 0;
    assert_matches!(cfg.validate(), Err(_));
    cfg.validators = 4;
    cfg.proposer_policy = validator::ProposerPolicy::Vrf;
    assert_matches!(cfg.validate(), Err(_));
}

#[tokio::test(flavor = "multi_thread")]
async fn localnet_finalizes_blocks() {
    let report = crate::run(&fast_config()).await.unwrap();
    assert!(report.chain.len() > 3);
    for (number, block) in report.chain.iter().enumerate() {
        assert_eq!(block.number, number as validator::Height);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn localnet_with_offline_validator() {
    let mut cfg = fast_config();
    cfg.offline = vec![0];
    crate::run(&cfg).await.unwrap();
}
