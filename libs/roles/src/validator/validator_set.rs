//! The validator roster and proposer rotation.
use std::collections::BTreeSet;

use super::{Address, Round};

/// Proposer rotation policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposerPolicy {
    /// The proposer moves to the next validator on every block and every round change.
    #[default]
    RoundRobin,
    /// The proposer of the last block keeps proposing until a round change.
    Sticky,
    /// Randomized selection. Reserved, not supported yet.
    Vrf,
}

/// Error returned when constructing or modifying a [`ValidatorSet`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorSetError {
    /// The set has no validators.
    #[error("validator set must contain at least one validator")]
    Empty,
    /// The same address was given twice.
    #[error("duplicate validator {0}")]
    Duplicate(Address),
    /// The proposer policy can't be used.
    #[error("unsupported proposer policy {0:?}")]
    UnsupportedPolicy(ProposerPolicy),
}

/// Maximum number of faulty validators tolerated by a set of `n`: `ceil(n/3) - 1`.
pub fn max_faulty(n: usize) -> usize {
    n.div_ceil(3).saturating_sub(1)
}

/// Number of distinct signers making a quorum in a set of `n`: `ceil(2n/3)`.
pub fn quorum_size(n: usize) -> usize {
    (2 * n).div_ceil(3)
}

/// Ordered set of validators with the proposer of the current round.
///
/// Validators are kept sorted by address, so that every replica computes the
/// same proposer from the same inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Address>,
    policy: ProposerPolicy,
    proposer: Address,
}

impl ValidatorSet {
    /// Creates a set from a list of addresses. The order of the list is not preserved.
    /// The first validator in address order is the initial proposer.
    pub fn new(
        validators: impl IntoIterator<Item = Address>,
        policy: ProposerPolicy,
    ) -> Result<Self, ValidatorSetError> {
        if policy == ProposerPolicy::Vrf {
            return Err(ValidatorSetError::UnsupportedPolicy(policy));
        }
        let mut set = BTreeSet::new();
        for v in validators {
            if !set.insert(v) {
                return Err(ValidatorSetError::Duplicate(v));
            }
        }
        let validators: Vec<_> = set.into_iter().collect();
        let proposer = *validators.first().ok_or(ValidatorSetError::Empty)?;
        Ok(Self {
            validators,
            policy,
            proposer,
        })
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Iterates over validators in address order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Address> {
        self.validators.iter()
    }

    /// Rotation policy of the set.
    pub fn policy(&self) -> ProposerPolicy {
        self.policy
    }

    /// Index of a validator in address order.
    pub fn index(&self, addr: &Address) -> Option<usize> {
        self.validators.binary_search(addr).ok()
    }

    /// Whether `addr` is a member of the set.
    pub fn contains(&self, addr: &Address) -> bool {
        self.index(addr).is_some()
    }

    /// Validator at `index` in address order.
    pub fn get_by_index(&self, index: usize) -> Option<&Address> {
        self.validators.get(index)
    }

    /// Looks up a validator by address, returning its index and address.
    pub fn get_by_address(&self, addr: &Address) -> Option<(usize, &Address)> {
        let i = self.index(addr)?;
        Some((i, &self.validators[i]))
    }

    /// Maximum number of faulty validators tolerated.
    pub fn f(&self) -> usize {
        max_faulty(self.len())
    }

    /// Number of distinct signers needed for a quorum certificate.
    pub fn quorum_size(&self) -> usize {
        quorum_size(self.len())
    }

    /// Proposer of the current round.
    pub fn proposer(&self) -> Address {
        self.proposer
    }

    /// Whether `addr` is the proposer of the current round.
    pub fn is_proposer(&self, addr: &Address) -> bool {
        self.proposer == *addr
    }

    /// Computes the proposer of `round`, given the proposer of the last block.
    /// A pure function of the roster, the policy and the arguments.
    pub fn proposer_for(&self, last_proposer: &Address, round: Round) -> Address {
        let index = self.index(last_proposer).map(|i| i as u64);
        let seed = match self.policy {
            ProposerPolicy::RoundRobin => index.map_or(round, |i| i + round + 1),
            // `Vrf` is rejected at construction.
            ProposerPolicy::Sticky | ProposerPolicy::Vrf => index.map_or(round, |i| i + round),
        };
        self.validators[(seed % self.len() as u64) as usize]
    }

    /// Sets the proposer of `round`, given the proposer of the last block.
    pub fn calc_proposer(&mut self, last_proposer: &Address, round: Round) {
        self.proposer = self.proposer_for(last_proposer, round);
    }

    /// Adds a validator. Returns false if it was already a member.
    pub fn add_validator(&mut self, addr: Address) -> bool {
        match self.validators.binary_search(&addr) {
            Ok(_) => false,
            Err(i) => {
                self.validators.insert(i, addr);
                true
            }
        }
    }

    /// Removes a validator. Returns false if it wasn't a member or is the
    /// last one, since a set can't become empty.
    pub fn remove_validator(&mut self, addr: &Address) -> bool {
        if self.len() == 1 {
            return false;
        }
        let Ok(i) = self.validators.binary_search(addr) else {
            return false;
        };
        self.validators.remove(i);
        if self.proposer == *addr {
            self.proposer = self.validators[i % self.len()];
        }
        true
    }
}
