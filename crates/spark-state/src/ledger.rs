//! shared ledger handle
//!
//! [`SparkLedger`] owns one [`SparkState`] behind a lock. Every mutating
//! entry point runs its checks and its writes under a single write guard,
//! so readers never observe a half-merged block or a partially admitted
//! transaction.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use spark_primitives::Hash256;
use tracing::{debug, info};

use crate::chain::{Block, Transaction};
use crate::error::{LedgerError, Result, ValidationError};
use crate::params::SparkParams;
use crate::script::{transaction_linking_tags, transaction_mints};
use crate::state::SparkState;
use crate::tx_info::SparkTxInfo;
use crate::validation::{check_spark_transaction, validate_block, CheckContext};

pub struct SparkLedger {
    params: SparkParams,
    state: RwLock<SparkState>,
}

impl SparkLedger {
    pub fn new(params: SparkParams) -> Self {
        Self::from_state(SparkState::new(params))
    }

    pub fn from_state(state: SparkState) -> Self {
        Self {
            params: state.params().clone(),
            state: RwLock::new(state),
        }
    }

    pub fn params(&self) -> &SparkParams {
        &self.params
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, SparkState>> {
        self.state
            .read()
            .map_err(|e| LedgerError::Lock(e.to_string()))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, SparkState>> {
        self.state
            .write()
            .map_err(|e| LedgerError::Lock(e.to_string()))
    }

    /// Validate `block` and merge it. Returns the record needed to disconnect it.
    pub fn connect_block(&self, block: &Block) -> Result<SparkTxInfo> {
        let mut state = self.write()?;
        let info = validate_block(&state, block)?;
        state.add_block(block.height, &info)?;
        if !info.is_empty() {
            info!(
                height = block.height,
                mints = info.mints().len(),
                spends = info.spent_ltags().len(),
                latest_group = state.latest_coin_id(),
                "connected spark block"
            );
        }
        Ok(info)
    }

    /// Merge a record produced by [`prevalidate_blocks`](crate::prevalidate_blocks).
    pub fn merge_block(&self, height: u32, info: &SparkTxInfo) -> Result<()> {
        let mut state = self.write()?;
        state.add_block(height, info)?;
        debug!(height, "merged prevalidated block");
        Ok(())
    }

    pub fn disconnect_block(&self, height: u32, info: &SparkTxInfo) -> Result<()> {
        let mut state = self.write()?;
        state.remove_block(height, info)?;
        info!(
            height,
            mints = info.mints().len(),
            spends = info.spent_ltags().len(),
            "disconnected spark block"
        );
        Ok(())
    }

    /// Admit `tx` to the mempool overlay, checked against the next block height.
    ///
    /// Either every coin and linking tag of the transaction is admitted or
    /// nothing is.
    pub fn accept_to_mempool(&self, tx: &Transaction) -> Result<Hash256> {
        let tx_hash = tx.txid();
        let mut state = self.write()?;
        let height = state.last_height().map_or(0, |h| h + 1);
        check_spark_transaction(tx, &state, tx_hash, &CheckContext::new(height), None)?;

        let coins = transaction_mints(tx).map_err(ValidationError::from)?;
        if let Some(coin) = coins.iter().find(|c| !state.can_add_mint_to_mempool(c)) {
            return Err(ValidationError::MempoolMintConflict(coin.hash()).into());
        }

        let tags = transaction_linking_tags(tx).map_err(ValidationError::from)?;
        if !tags.is_empty() && !state.add_spend_to_mempool(&tags, tx_hash) {
            let conflict = tags
                .iter()
                .find_map(|t| state.mempool_conflicting_tx_hash(t).map(|h| (*t, h)));
            return Err(match conflict {
                Some((tag, tx)) => ValidationError::MempoolSpendConflict { tag, tx },
                None => ValidationError::DuplicateLinkingTag(tags[0]),
            }
            .into());
        }
        state.add_mints_to_mempool(&coins);

        debug!(%tx_hash, mints = coins.len(), spends = tags.len(), "accepted to spark mempool");
        Ok(tx_hash)
    }

    /// Evict `tx`, releasing only the linking tags it holds.
    pub fn remove_from_mempool(&self, tx: &Transaction) -> Result<()> {
        let tx_hash = tx.txid();
        let coins = transaction_mints(tx).map_err(ValidationError::from)?;
        let tags = transaction_linking_tags(tx).map_err(ValidationError::from)?;

        let mut state = self.write()?;
        for coin in &coins {
            state.remove_mint_from_mempool(coin);
        }
        let owned: Vec<_> = tags
            .into_iter()
            .filter(|t| state.mempool_conflicting_tx_hash(t) == Some(tx_hash))
            .collect();
        state.remove_spend_from_mempool(&owned);
        debug!(%tx_hash, "evicted from spark mempool");
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        self.write()?.reset();
        info!("spark state reset");
        Ok(())
    }
}

impl Default for SparkLedger {
    fn default() -> Self {
        Self::new(SparkParams::default())
    }
}
