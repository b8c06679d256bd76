//! committed spark ledger state
//!
//! Coins are appended to numbered anonymity groups, opened in order starting
//! at 1. A block's mints always land in a single group: the open one if they
//! fit under `max_coins_in_group`, otherwise a fresh group. Linking tags of
//! spent coins are recorded with the group they were spent from.
//!
//! Every mutation has an inverse so that disconnecting a block restores the
//! exact state that preceded it. The mempool overlay is owned here so that
//! admission can be checked against committed state and the overlay together.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use spark_primitives::{ltag_hash, Coin, GroupElement, Hash256};
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::mempool::SparkMempoolState;
use crate::mint_info::MintedCoinInfo;
use crate::params::SparkParams;
use crate::tx_info::SparkTxInfo;

/// Summary of one anonymity group. Block references are heights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparkCoinGroupInfo {
    pub first_block: Option<u32>,
    pub last_block: Option<u32>,
    pub n_coins: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparkState {
    params: SparkParams,
    /// highest group id in use, 0 when no coin has been minted
    latest_coin_id: u32,
    coin_groups: HashMap<u32, SparkCoinGroupInfo>,
    /// coins of each group in mint order
    group_coins: HashMap<u32, Vec<Coin>>,
    minted_coins: HashMap<Coin, MintedCoinInfo>,
    used_ltags: HashMap<GroupElement, u32>,
    coin_hashes: HashMap<Hash256, Coin>,
    ltag_hashes: HashMap<Hash256, GroupElement>,
    /// public mints per height
    mint_meta_info: BTreeMap<u32, usize>,
    /// all coins (public and spend outputs) per height
    extended_mint_meta_info: BTreeMap<u32, usize>,
    /// spent linking tags per height
    spend_meta_info: BTreeMap<u32, usize>,
    last_height: Option<u32>,
    /// heights of connected blocks, tip last
    connected: Vec<u32>,
    mempool: SparkMempoolState,
}

impl SparkState {
    pub fn new(params: SparkParams) -> Self {
        Self {
            params,
            latest_coin_id: 0,
            coin_groups: HashMap::new(),
            group_coins: HashMap::new(),
            minted_coins: HashMap::new(),
            used_ltags: HashMap::new(),
            coin_hashes: HashMap::new(),
            ltag_hashes: HashMap::new(),
            mint_meta_info: BTreeMap::new(),
            extended_mint_meta_info: BTreeMap::new(),
            spend_meta_info: BTreeMap::new(),
            last_height: None,
            connected: Vec::new(),
            mempool: SparkMempoolState::new(),
        }
    }

    pub fn params(&self) -> &SparkParams {
        &self.params
    }

    /// Height of the last connected block.
    pub fn last_height(&self) -> Option<u32> {
        self.last_height
    }

    // ----- committed queries -----

    pub fn is_used_ltag(&self, tag: &GroupElement) -> bool {
        self.used_ltags.contains_key(tag)
    }

    pub fn is_used_ltag_hash(&self, hash: &Hash256) -> Option<GroupElement> {
        self.ltag_hashes.get(hash).copied()
    }

    /// `(height, coin_group_id)` of a committed coin.
    pub fn minted_coin_height_and_id(&self, coin: &Coin) -> Option<(u32, u32)> {
        self.minted_coins
            .get(coin)
            .map(|info| (info.height, info.coin_group_id))
    }

    pub fn has_coin(&self, coin: &Coin) -> bool {
        self.minted_coins.contains_key(coin)
    }

    pub fn has_coin_hash(&self, hash: &Hash256) -> Option<&Coin> {
        self.coin_hashes.get(hash)
    }

    pub fn coin_group_info(&self, group_id: u32) -> Option<SparkCoinGroupInfo> {
        self.coin_groups.get(&group_id).copied()
    }

    pub fn latest_coin_id(&self) -> u32 {
        self.latest_coin_id
    }

    pub fn total_coins(&self) -> usize {
        self.minted_coins.len()
    }

    pub fn mints(&self) -> &HashMap<Coin, MintedCoinInfo> {
        &self.minted_coins
    }

    pub fn spends(&self) -> &HashMap<GroupElement, u32> {
        &self.used_ltags
    }

    pub fn coin_groups(&self) -> &HashMap<u32, SparkCoinGroupInfo> {
        &self.coin_groups
    }

    /// Coins of `group_id` in mint order.
    pub fn group_coins(&self, group_id: u32) -> &[Coin] {
        self.group_coins
            .get(&group_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The set a spend from `group_id` proves membership in: the last
    /// `start_group_size` coins of the previous group followed by the
    /// group's own coins.
    pub fn anonymity_set(&self, group_id: u32) -> Option<Vec<Coin>> {
        if !self.coin_groups.contains_key(&group_id) {
            return None;
        }
        let previous = self.group_coins(group_id.saturating_sub(1));
        let carried = previous.len().min(self.params.start_group_size);
        let mut set = Vec::with_capacity(carried + self.group_coins(group_id).len());
        set.extend_from_slice(&previous[previous.len() - carried..]);
        set.extend_from_slice(self.group_coins(group_id));
        Some(set)
    }

    /// Group a block minting `mint_count` coins would be assigned to.
    pub fn next_group_id(&self, mint_count: usize) -> u32 {
        let latest = self.latest_coin_id.max(1);
        match self.coin_groups.get(&latest) {
            Some(group) if group.n_coins + mint_count > self.params.max_coins_in_group => latest + 1,
            _ => latest,
        }
    }

    /// Public mints at or below `height`.
    pub fn mints_up_to(&self, height: u32) -> usize {
        self.mint_meta_info.range(..=height).map(|(_, n)| n).sum()
    }

    /// All coins, including spend outputs, at or below `height`.
    pub fn extended_mints_up_to(&self, height: u32) -> usize {
        self.extended_mint_meta_info.range(..=height).map(|(_, n)| n).sum()
    }

    /// Linking tags spent by connected blocks at or below `height`.
    pub fn spends_up_to(&self, height: u32) -> usize {
        self.spend_meta_info.range(..=height).map(|(_, n)| n).sum()
    }

    // ----- committed mutation -----

    /// Commit a coin. Returns false, changing nothing, if it already exists.
    ///
    /// Coins must be added in non-decreasing height order within a group.
    pub fn add_mint(&mut self, coin: Coin, info: MintedCoinInfo) -> bool {
        if self.minted_coins.contains_key(&coin) {
            return false;
        }
        debug_assert!(info.coin_group_id > 0, "coin group ids start at 1");

        let group = self.coin_groups.entry(info.coin_group_id).or_default();
        group.n_coins += 1;
        group.first_block = Some(group.first_block.map_or(info.height, |h| h.min(info.height)));
        group.last_block = Some(group.last_block.map_or(info.height, |h| h.max(info.height)));
        self.latest_coin_id = self.latest_coin_id.max(info.coin_group_id);

        bump(&mut self.extended_mint_meta_info, info.height, 1);
        if coin.is_mint() {
            bump(&mut self.mint_meta_info, info.height, 1);
        }

        self.mempool.remove_mint_from_mempool(&coin);
        self.group_coins
            .entry(info.coin_group_id)
            .or_default()
            .push(coin.clone());
        self.coin_hashes.insert(coin.hash(), coin.clone());
        self.minted_coins.insert(coin, info);
        true
    }

    /// Undo [`add_mint`](Self::add_mint). Returns false if the coin is unknown.
    pub fn remove_mint(&mut self, coin: &Coin) -> bool {
        let Some(info) = self.minted_coins.remove(coin) else {
            return false;
        };
        self.coin_hashes.remove(&coin.hash());
        drop_count(&mut self.extended_mint_meta_info, info.height, 1);
        if coin.is_mint() {
            drop_count(&mut self.mint_meta_info, info.height, 1);
        }

        let gid = info.coin_group_id;
        if let Some(coins) = self.group_coins.get_mut(&gid) {
            if let Some(pos) = coins.iter().rposition(|c| c == coin) {
                coins.remove(pos);
            }
        }

        let remaining = self.coin_groups.get_mut(&gid).map(|g| {
            g.n_coins = g.n_coins.saturating_sub(1);
            g.n_coins
        });
        match remaining {
            Some(0) => {
                self.coin_groups.remove(&gid);
                self.group_coins.remove(&gid);
                self.latest_coin_id = self.coin_groups.keys().copied().max().unwrap_or(0);
            }
            Some(_) => {
                let first = self.first_coin_height(gid);
                let last = self.last_coin_height(gid);
                if let Some(group) = self.coin_groups.get_mut(&gid) {
                    group.first_block = first;
                    group.last_block = last;
                }
            }
            None => {}
        }
        true
    }

    fn first_coin_height(&self, gid: u32) -> Option<u32> {
        let coin = self.group_coins(gid).first()?;
        self.minted_coins.get(coin).map(|i| i.height)
    }

    fn last_coin_height(&self, gid: u32) -> Option<u32> {
        let coin = self.group_coins(gid).last()?;
        self.minted_coins.get(coin).map(|i| i.height)
    }

    /// Mark a linking tag spent from `group_id`. Returns false if already spent.
    ///
    /// Any mempool claim on the tag is released.
    pub fn add_spend(&mut self, tag: GroupElement, group_id: u32) -> bool {
        if self.used_ltags.contains_key(&tag) {
            return false;
        }
        self.mempool.remove_spend_from_mempool(&tag);
        self.ltag_hashes.insert(ltag_hash(&tag), tag);
        self.used_ltags.insert(tag, group_id);
        true
    }

    pub fn remove_spend(&mut self, tag: &GroupElement) -> bool {
        if self.used_ltags.remove(tag).is_none() {
            return false;
        }
        self.ltag_hashes.remove(&ltag_hash(tag));
        true
    }

    /// Merge a completed block record at `height`.
    ///
    /// Checks every coin and tag before touching state, so a rejected block
    /// leaves the ledger unchanged.
    pub fn add_block(&mut self, height: u32, block: &SparkTxInfo) -> Result<()> {
        if !block.is_complete() {
            debug_assert!(false, "block spark info merged before completion");
            return Err(LedgerError::IncompleteBlockInfo);
        }
        if let Some(last) = self.last_height {
            if height <= last {
                return Err(LedgerError::OutOfOrder { last, got: height });
            }
        }
        if !block.is_empty() && !self.params.is_spark_allowed(height) {
            return Err(LedgerError::NotActive { height });
        }
        let max = self.params.max_coins_in_group;
        if block.mints().len() > max {
            return Err(LedgerError::GroupOverflow {
                count: block.mints().len(),
                max,
            });
        }

        let mut seen = HashSet::with_capacity(block.mints().len());
        for coin in block.mints() {
            if self.minted_coins.contains_key(coin) || !seen.insert(coin) {
                return Err(LedgerError::MintExists(coin.hash()));
            }
        }
        for tag in block.spent_ltags().keys() {
            if self.used_ltags.contains_key(tag) {
                return Err(LedgerError::LinkingTagUsed(*tag));
            }
        }

        if !block.mints().is_empty() {
            let group_id = self.next_group_id(block.mints().len());
            if group_id != self.latest_coin_id {
                info!(group_id, height, "opening coin group");
            }
            for coin in block.mints() {
                self.add_mint(coin.clone(), MintedCoinInfo::make(group_id, height));
            }
        }
        for (tag, group_id) in block.spent_ltags() {
            self.add_spend(*tag, *group_id);
        }
        bump(&mut self.spend_meta_info, height, block.spent_ltags().len());

        self.last_height = Some(height);
        self.connected.push(height);
        debug!(
            height,
            mints = block.mints().len(),
            spends = block.spent_ltags().len(),
            "merged block spark info"
        );
        Ok(())
    }

    /// Undo [`add_block`](Self::add_block) for the block at `height`.
    ///
    /// Only the tip can be removed.
    pub fn remove_block(&mut self, height: u32, block: &SparkTxInfo) -> Result<()> {
        if self.connected.last() != Some(&height) {
            debug_assert!(false, "removing block {height} which is not the tip");
            return Err(LedgerError::NotTip {
                last: self.last_height,
                got: height,
            });
        }

        let mut removed = 0;
        for tag in block.spent_ltags().keys() {
            if self.remove_spend(tag) {
                removed += 1;
            }
        }
        drop_count(&mut self.spend_meta_info, height, removed);

        for coin in block.mints().iter().rev() {
            self.remove_mint(coin);
        }

        self.connected.pop();
        self.last_height = self.connected.last().copied();
        debug!(
            height,
            mints = block.mints().len(),
            spends = removed,
            "reverted block spark info"
        );
        Ok(())
    }

    // ----- mempool -----

    pub fn mempool(&self) -> &SparkMempoolState {
        &self.mempool
    }

    pub fn mempool_ltags(&self) -> &HashMap<GroupElement, Hash256> {
        self.mempool.ltags()
    }

    pub fn can_add_mint_to_mempool(&self, coin: &Coin) -> bool {
        !self.has_coin(coin) && !self.mempool.has_mint(coin)
    }

    pub fn can_add_spend_to_mempool(&self, tag: &GroupElement) -> bool {
        !self.is_used_ltag(tag) && !self.mempool.has_ltag(tag)
    }

    /// Claim every tag for `tx_hash`, or none of them.
    ///
    /// Fails if any tag is spent, already claimed, or repeated in `tags`.
    pub fn add_spend_to_mempool(&mut self, tags: &[GroupElement], tx_hash: Hash256) -> bool {
        let mut seen = HashSet::with_capacity(tags.len());
        for tag in tags {
            if !self.can_add_spend_to_mempool(tag) || !seen.insert(tag) {
                debug!(%tx_hash, %tag, "mempool spend conflict");
                return false;
            }
        }
        for tag in tags {
            self.mempool.add_spend_to_mempool(*tag, tx_hash);
        }
        true
    }

    /// Add coins one by one, skipping any already committed or pending.
    /// Returns how many were added.
    pub fn add_mints_to_mempool(&mut self, coins: &[Coin]) -> usize {
        let mut added = 0;
        for coin in coins {
            if self.has_coin(coin) {
                debug!(coin = %coin.hash(), "skipping committed coin");
                continue;
            }
            if self.mempool.add_mint_to_mempool(coin.clone()) {
                added += 1;
            }
        }
        added
    }

    pub fn remove_mint_from_mempool(&mut self, coin: &Coin) -> bool {
        self.mempool.remove_mint_from_mempool(coin)
    }

    pub fn mempool_conflicting_tx_hash(&self, tag: &GroupElement) -> Option<Hash256> {
        self.mempool.mempool_conflicting_tx_hash(tag)
    }

    pub fn remove_spend_from_mempool(&mut self, tags: &[GroupElement]) {
        for tag in tags {
            self.mempool.remove_spend_from_mempool(tag);
        }
    }

    /// Drop all committed and pending state, keeping the parameters.
    pub fn reset(&mut self) {
        *self = Self::new(self.params.clone());
    }
}

impl Default for SparkState {
    fn default() -> Self {
        Self::new(SparkParams::default())
    }
}

fn bump(map: &mut BTreeMap<u32, usize>, height: u32, by: usize) {
    if by > 0 {
        *map.entry(height).or_insert(0) += by;
    }
}

fn drop_count(map: &mut BTreeMap<u32, usize>, height: u32, by: usize) {
    if let Entry::Occupied(mut entry) = map.entry(height) {
        let n = entry.get_mut();
        *n = n.saturating_sub(by);
        if *n == 0 {
            entry.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mint_coin, spend_coin, tag};
    use proptest::prelude::*;

    const START: u32 = 1_000;

    fn params(max: usize, carry: usize) -> SparkParams {
        SparkParams::regtest().with_group_limits(max, carry)
    }

    fn block(mints: impl IntoIterator<Item = Coin>, spends: &[(GroupElement, u32)]) -> SparkTxInfo {
        let mut info = SparkTxInfo::new();
        for coin in mints {
            info.add_mint(coin).unwrap();
        }
        for (t, g) in spends {
            info.add_spend(*t, *g).unwrap();
        }
        info.complete();
        info
    }

    #[test]
    fn test_empty_state() {
        let state = SparkState::new(params(10, 2));
        assert_eq!(state.latest_coin_id(), 0);
        assert_eq!(state.total_coins(), 0);
        assert_eq!(state.next_group_id(5), 1);
        assert!(state.anonymity_set(1).is_none());
    }

    #[test]
    fn test_mint_lookup_and_hash_index() {
        let mut state = SparkState::new(params(10, 2));
        let coin = mint_coin(1);
        assert!(state.add_mint(coin.clone(), MintedCoinInfo::make(1, START)));
        assert!(!state.add_mint(coin.clone(), MintedCoinInfo::make(1, START + 1)));

        assert!(state.has_coin(&coin));
        assert_eq!(state.minted_coin_height_and_id(&coin), Some((START, 1)));
        assert_eq!(state.has_coin_hash(&coin.hash()), Some(&coin));
        assert_eq!(state.coin_group_info(1).unwrap().n_coins, 1);
        assert_eq!(state.total_coins(), 1);
    }

    #[test]
    fn test_remove_last_coin_drops_group() {
        let mut state = SparkState::new(params(10, 2));
        state.add_mint(mint_coin(1), MintedCoinInfo::make(1, START));
        state.add_mint(mint_coin(2), MintedCoinInfo::make(2, START + 1));
        assert_eq!(state.latest_coin_id(), 2);

        assert!(state.remove_mint(&mint_coin(2)));
        assert!(state.coin_group_info(2).is_none());
        assert_eq!(state.latest_coin_id(), 1);
        assert!(state.has_coin_hash(&mint_coin(2).hash()).is_none());

        assert!(state.remove_mint(&mint_coin(1)));
        assert_eq!(state.latest_coin_id(), 0);
        assert!(!state.remove_mint(&mint_coin(1)));
    }

    #[test]
    fn test_remove_mint_shrinks_block_range() {
        let mut state = SparkState::new(params(10, 2));
        state.add_mint(mint_coin(1), MintedCoinInfo::make(1, START));
        state.add_mint(mint_coin(2), MintedCoinInfo::make(1, START + 3));
        let g = state.coin_group_info(1).unwrap();
        assert_eq!((g.first_block, g.last_block), (Some(START), Some(START + 3)));

        state.remove_mint(&mint_coin(2));
        let g = state.coin_group_info(1).unwrap();
        assert_eq!((g.first_block, g.last_block, g.n_coins), (Some(START), Some(START), 1));
    }

    #[test]
    fn test_spend_lookup() {
        let mut state = SparkState::new(params(10, 2));
        assert!(state.add_spend(tag(1), 1));
        assert!(!state.add_spend(tag(1), 2));
        assert!(state.is_used_ltag(&tag(1)));
        assert_eq!(state.is_used_ltag_hash(&ltag_hash(&tag(1))), Some(tag(1)));
        assert_eq!(state.spends().get(&tag(1)), Some(&1));

        assert!(state.remove_spend(&tag(1)));
        assert!(!state.is_used_ltag(&tag(1)));
        assert!(state.is_used_ltag_hash(&ltag_hash(&tag(1))).is_none());
        assert!(!state.remove_spend(&tag(1)));
    }

    #[test]
    fn test_block_granular_group_rollover() {
        let mut state = SparkState::new(params(4, 2));
        state.add_block(START, &block((0..3).map(mint_coin), &[])).unwrap();
        assert_eq!(state.latest_coin_id(), 1);

        // 3 + 2 > 4: the whole block opens group 2
        assert_eq!(state.next_group_id(2), 2);
        state.add_block(START + 1, &block((3..5).map(mint_coin), &[])).unwrap();
        assert_eq!(state.latest_coin_id(), 2);
        assert_eq!(state.coin_group_info(1).unwrap().n_coins, 3);
        assert_eq!(state.coin_group_info(2).unwrap().n_coins, 2);

        // 2 + 2 fits exactly
        state.add_block(START + 2, &block((5..7).map(mint_coin), &[])).unwrap();
        assert_eq!(state.latest_coin_id(), 2);
        assert_eq!(state.coin_group_info(2).unwrap().n_coins, 4);
    }

    #[test]
    fn test_anonymity_set_carries_previous_tail() {
        let mut state = SparkState::new(params(4, 2));
        state.add_block(START, &block((0..4).map(mint_coin), &[])).unwrap();
        state.add_block(START + 1, &block((4..6).map(mint_coin), &[])).unwrap();

        assert_eq!(state.anonymity_set(1).unwrap(), (0..4).map(mint_coin).collect::<Vec<_>>());
        let expected: Vec<Coin> = [2, 3, 4, 5].into_iter().map(mint_coin).collect();
        assert_eq!(state.anonymity_set(2).unwrap(), expected);
        // carried coins are not counted in the group
        assert_eq!(state.coin_group_info(2).unwrap().n_coins, 2);
    }

    #[test]
    fn test_meta_counters() {
        let mut state = SparkState::new(params(10, 2));
        state
            .add_block(START, &block([mint_coin(1), spend_coin(2)], &[]))
            .unwrap();
        state
            .add_block(START + 1, &block([mint_coin(3)], &[(tag(1), 1), (tag(2), 1)]))
            .unwrap();

        assert_eq!(state.mints_up_to(START), 1);
        assert_eq!(state.extended_mints_up_to(START), 2);
        assert_eq!(state.mints_up_to(START + 1), 2);
        assert_eq!(state.extended_mints_up_to(START + 1), 3);
        assert_eq!(state.spends_up_to(START), 0);
        assert_eq!(state.spends_up_to(START + 5), 2);
    }

    #[test]
    fn test_add_block_rejects_incomplete_info() {
        let mut state = SparkState::new(params(10, 2));
        let info = SparkTxInfo::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| state.add_block(START, &info)));
        // debug builds assert, release builds return the error
        match result {
            Ok(r) => assert_eq!(r, Err(LedgerError::IncompleteBlockInfo)),
            Err(_) => assert!(cfg!(debug_assertions)),
        }
    }

    #[test]
    fn test_add_block_is_atomic_on_conflict() {
        let mut state = SparkState::new(params(10, 2));
        state
            .add_block(START, &block([mint_coin(1)], &[(tag(1), 1)]))
            .unwrap();
        let before = state.clone();

        let dup_mint = block([mint_coin(2), mint_coin(1)], &[]);
        assert_eq!(
            state.add_block(START + 1, &dup_mint),
            Err(LedgerError::MintExists(mint_coin(1).hash()))
        );
        let dup_tag = block([mint_coin(3)], &[(tag(1), 1)]);
        assert_eq!(
            state.add_block(START + 1, &dup_tag),
            Err(LedgerError::LinkingTagUsed(tag(1)))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_block_height_order() {
        let mut state = SparkState::new(params(10, 2));
        state.add_block(START + 1, &block([mint_coin(1)], &[])).unwrap();
        assert_eq!(
            state.add_block(START + 1, &block([mint_coin(2)], &[])),
            Err(LedgerError::OutOfOrder { last: START + 1, got: START + 1 })
        );
    }

    #[test]
    fn test_remove_block_only_at_tip() {
        let mut state = SparkState::new(params(10, 2));
        let first = block([mint_coin(1)], &[]);
        let second = block([mint_coin(2)], &[]);
        state.add_block(START, &first).unwrap();
        state.add_block(START + 1, &second).unwrap();
        let before = state.clone();

        for height in [START, START + 2] {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                state.remove_block(height, &first)
            }));
            match result {
                Ok(r) => assert_eq!(
                    r,
                    Err(LedgerError::NotTip { last: Some(START + 1), got: height })
                ),
                Err(_) => assert!(cfg!(debug_assertions)),
            }
            assert_eq!(state, before);
        }

        state.remove_block(START + 1, &second).unwrap();
        assert_eq!(state.last_height(), Some(START));
        // START is the tip again
        assert_eq!(
            state.add_block(START, &block([mint_coin(3)], &[])),
            Err(LedgerError::OutOfOrder { last: START, got: START })
        );
        state.remove_block(START, &first).unwrap();
        assert_eq!(state, SparkState::new(params(10, 2)));
    }

    #[test]
    fn test_block_larger_than_group_rejected() {
        let mut state = SparkState::new(params(2, 1));
        assert_eq!(
            state.add_block(START, &block((0..3).map(mint_coin), &[])),
            Err(LedgerError::GroupOverflow { count: 3, max: 2 })
        );
        assert_eq!(state.total_coins(), 0);
        assert_eq!(state.last_height(), None);

        state.add_block(START, &block((0..2).map(mint_coin), &[])).unwrap();
        state.add_block(START + 1, &block([mint_coin(3)], &[])).unwrap();
        for group in state.coin_groups().values() {
            assert!(group.n_coins <= 2);
        }
    }

    #[test]
    fn test_add_block_respects_activation() {
        let mut state = SparkState::new(params(10, 2));
        assert_eq!(
            state.add_block(START - 1, &block([mint_coin(1)], &[])),
            Err(LedgerError::NotActive { height: START - 1 })
        );
        // empty blocks before activation only advance the height
        state.add_block(START - 1, &block([], &[])).unwrap();
        assert_eq!(state.last_height(), Some(START - 1));
        assert_eq!(state.total_coins(), 0);
    }

    #[test]
    fn test_promotion_clears_mempool() {
        let mut state = SparkState::new(params(10, 2));
        let tx = Hash256([9; 32]);
        assert_eq!(state.add_mints_to_mempool(&[mint_coin(1)]), 1);
        assert!(state.add_spend_to_mempool(&[tag(1)], tx));

        state
            .add_block(START, &block([mint_coin(1)], &[(tag(1), 1)]))
            .unwrap();
        assert!(state.mempool().is_empty());
        assert!(!state.can_add_mint_to_mempool(&mint_coin(1)));
        assert!(!state.can_add_spend_to_mempool(&tag(1)));
    }

    #[test]
    fn test_mempool_spend_all_or_nothing() {
        let mut state = SparkState::new(params(10, 2));
        let a = Hash256([1; 32]);
        let b = Hash256([2; 32]);
        assert!(state.add_spend_to_mempool(&[tag(1), tag(2)], a));

        // tag(2) is held by a, so tag(3) must not be claimed either
        assert!(!state.add_spend_to_mempool(&[tag(3), tag(2)], b));
        assert!(state.can_add_spend_to_mempool(&tag(3)));
        assert_eq!(state.mempool_conflicting_tx_hash(&tag(2)), Some(a));

        // repeated tag within one transaction
        assert!(!state.add_spend_to_mempool(&[tag(4), tag(4)], b));
        assert!(state.can_add_spend_to_mempool(&tag(4)));

        // fresh tag next to a committed one
        state.add_spend(tag(5), 1);
        assert!(!state.add_spend_to_mempool(&[tag(6), tag(5)], b));
        assert!(state.mempool_conflicting_tx_hash(&tag(6)).is_none());
        assert!(state.mempool_conflicting_tx_hash(&tag(5)).is_none());

        state.remove_spend_from_mempool(&[tag(1), tag(2)]);
        assert!(state.mempool_ltags().is_empty());
    }

    #[test]
    fn test_mempool_mints_best_effort() {
        let mut state = SparkState::new(params(10, 2));
        state.add_mint(mint_coin(1), MintedCoinInfo::make(1, START));
        let added = state.add_mints_to_mempool(&[mint_coin(1), mint_coin(2), mint_coin(2), mint_coin(3)]);
        assert_eq!(added, 2);
        assert!(!state.mempool().has_mint(&mint_coin(1)));
        assert!(state.mempool().has_mint(&mint_coin(3)));

        assert!(state.remove_mint_from_mempool(&mint_coin(2)));
        assert!(state.can_add_mint_to_mempool(&mint_coin(2)));
    }

    #[test]
    fn test_reset_keeps_params() {
        let mut state = SparkState::new(params(7, 3));
        state.add_block(START, &block([mint_coin(1)], &[(tag(1), 1)])).unwrap();
        state.add_mints_to_mempool(&[mint_coin(2)]);
        state.reset();
        assert_eq!(state, SparkState::new(params(7, 3)));
    }

    proptest! {
        #[test]
        fn prop_connect_then_disconnect_restores_state(
            blocks in prop::collection::vec((0usize..6, 0usize..3), 1..12)
        ) {
            let mut state = SparkState::new(params(5, 2));
            state.add_block(START - 1, &block([], &[])).unwrap();

            let mut next_coin = 0u64;
            let mut next_tag = 0u64;
            let mut infos = Vec::new();
            let mut snapshots = Vec::new();
            for (i, (n_mints, n_spends)) in blocks.iter().enumerate() {
                let mints: Vec<Coin> = (next_coin..next_coin + *n_mints as u64)
                    .map(|n| if n % 3 == 0 { spend_coin(n) } else { mint_coin(n) })
                    .collect();
                next_coin += *n_mints as u64;
                let spends: Vec<(GroupElement, u32)> = (next_tag..next_tag + *n_spends as u64)
                    .map(|n| (tag(n), 1))
                    .collect();
                next_tag += *n_spends as u64;

                let info = block(mints, &spends);
                snapshots.push(state.clone());
                state.add_block(START + i as u32, &info).unwrap();

                for group in state.coin_groups().values() {
                    prop_assert!(group.n_coins <= 5);
                }
                infos.push(info);
            }

            prop_assert_eq!(state.total_coins() as u64, next_coin);
            let total: usize = state.coin_groups().values().map(|g| g.n_coins).sum();
            prop_assert_eq!(total, state.total_coins());

            for (i, info) in infos.iter().enumerate().rev() {
                state.remove_block(START + i as u32, info).unwrap();
                prop_assert_eq!(&state, &snapshots[i]);
            }
        }

        #[test]
        fn prop_tag_never_pending_and_committed(
            ops in prop::collection::vec((0u64..6, any::<bool>()), 1..40)
        ) {
            let mut state = SparkState::new(params(5, 2));
            for (n, commit) in ops {
                if commit {
                    state.add_spend(tag(n), 1);
                } else {
                    state.add_spend_to_mempool(&[tag(n)], Hash256([n as u8; 32]));
                }
                for t in state.mempool_ltags().keys() {
                    prop_assert!(!state.is_used_ltag(t));
                }
            }
        }
    }
}
