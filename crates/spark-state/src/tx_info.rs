//! per-block accumulator of spark effects
//!
//! Validation fills a [`SparkTxInfo`] while walking a block. Once `complete`
//! is called the record is frozen and may be merged into the ledger.

use std::collections::{BTreeSet, HashMap, HashSet};

use spark_primitives::{Coin, GroupElement, Hash256};

use crate::error::TxInfoError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparkTxInfo {
    sp_transactions: BTreeSet<Hash256>,
    mints: Vec<Coin>,
    /// lookup index over `mints`
    mint_index: HashSet<Coin>,
    spent_ltags: HashMap<GroupElement, u32>,
    complete: bool,
}

impl SparkTxInfo {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), TxInfoError> {
        if self.complete {
            return Err(TxInfoError::Frozen);
        }
        Ok(())
    }

    /// Record a spark transaction hash. Returns false if it was already known.
    pub fn add_transaction(&mut self, tx_hash: Hash256) -> Result<bool, TxInfoError> {
        self.ensure_open()?;
        Ok(self.sp_transactions.insert(tx_hash))
    }

    /// Append a minted coin; block order is kept.
    pub fn add_mint(&mut self, coin: Coin) -> Result<(), TxInfoError> {
        self.ensure_open()?;
        self.mint_index.insert(coin.clone());
        self.mints.push(coin);
        Ok(())
    }

    pub fn add_spend(&mut self, tag: GroupElement, coin_group_id: u32) -> Result<(), TxInfoError> {
        self.ensure_open()?;
        if self.spent_ltags.contains_key(&tag) {
            return Err(TxInfoError::DuplicateLinkingTag(tag));
        }
        self.spent_ltags.insert(tag, coin_group_id);
        Ok(())
    }

    /// Freeze the record.
    pub fn complete(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_empty(&self) -> bool {
        self.mints.is_empty() && self.spent_ltags.is_empty()
    }

    pub fn transactions(&self) -> &BTreeSet<Hash256> {
        &self.sp_transactions
    }

    pub fn mints(&self) -> &[Coin] {
        &self.mints
    }

    pub fn spent_ltags(&self) -> &HashMap<GroupElement, u32> {
        &self.spent_ltags
    }

    pub fn contains_mint(&self, coin: &Coin) -> bool {
        self.mint_index.contains(coin)
    }

    pub fn contains_ltag(&self, tag: &GroupElement) -> bool {
        self.spent_ltags.contains_key(tag)
    }
}
