//! uncommitted spark effects
//!
//! Holds the coins and linking tags of transactions accepted to the mempool
//! but not yet mined. Committed-state cross checks live in
//! [`SparkState`](crate::SparkState); this type only deduplicates within the
//! overlay itself.

use std::collections::{HashMap, HashSet};

use spark_primitives::{Coin, GroupElement, Hash256};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparkMempoolState {
    mints: HashSet<Coin>,
    ltags: HashMap<GroupElement, Hash256>,
}

impl SparkMempoolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_mint(&self, coin: &Coin) -> bool {
        self.mints.contains(coin)
    }

    /// Returns false if the coin is already pending.
    pub fn add_mint_to_mempool(&mut self, coin: Coin) -> bool {
        self.mints.insert(coin)
    }

    pub fn remove_mint_from_mempool(&mut self, coin: &Coin) -> bool {
        self.mints.remove(coin)
    }

    pub fn has_ltag(&self, tag: &GroupElement) -> bool {
        self.ltags.contains_key(tag)
    }

    /// Claim `tag` for `tx_hash`. Returns false if another claim exists.
    pub fn add_spend_to_mempool(&mut self, tag: GroupElement, tx_hash: Hash256) -> bool {
        if self.ltags.contains_key(&tag) {
            return false;
        }
        self.ltags.insert(tag, tx_hash);
        true
    }

    /// The mempool transaction holding `tag`, if any.
    pub fn mempool_conflicting_tx_hash(&self, tag: &GroupElement) -> Option<Hash256> {
        self.ltags.get(tag).copied()
    }

    pub fn remove_spend_from_mempool(&mut self, tag: &GroupElement) -> Option<Hash256> {
        self.ltags.remove(tag)
    }

    pub fn ltags(&self) -> &HashMap<GroupElement, Hash256> {
        &self.ltags
    }

    pub fn is_empty(&self) -> bool {
        self.mints.is_empty() && self.ltags.is_empty()
    }

    pub fn reset(&mut self) {
        self.mints.clear();
        self.ltags.clear();
    }
}
