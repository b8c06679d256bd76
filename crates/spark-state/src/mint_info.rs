//! per-coin records: ledger placement and wallet metadata

use std::sync::OnceLock;

use bincode::Options;
use serde::{Deserialize, Serialize};
use spark_primitives::{nonce_hash, Hash256, Scalar};

use crate::error::ScriptError;

/// Where a committed coin sits: its group and the height that minted it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MintedCoinInfo {
    pub coin_group_id: u32,
    pub height: u32,
}

impl MintedCoinInfo {
    pub fn make(coin_group_id: u32, height: u32) -> Self {
        Self {
            coin_group_id,
            height,
        }
    }
}

/// Wallet-side metadata for an owned coin.
///
/// Serialized field order is fixed: height, id, is_used, txid, i, d, v, k,
/// memo, serial_context. The nonce hash is a derived cache and is neither
/// persisted nor compared.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SparkMintMeta {
    pub height: i32,
    pub id: i32,
    pub is_used: bool,
    pub txid: Hash256,
    /// diversifier
    pub i: u64,
    /// encrypted diversifier
    pub d: Vec<u8>,
    pub v: u64,
    /// nonce
    pub k: Scalar,
    pub memo: String,
    pub serial_context: Vec<u8>,
    #[serde(skip)]
    nonce_hash: OnceLock<Hash256>,
}

impl SparkMintMeta {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        height: i32,
        id: i32,
        txid: Hash256,
        i: u64,
        d: Vec<u8>,
        v: u64,
        k: Scalar,
        memo: String,
        serial_context: Vec<u8>,
    ) -> Self {
        Self {
            height,
            id,
            is_used: false,
            txid,
            i,
            d,
            v,
            k,
            memo,
            serial_context,
            nonce_hash: OnceLock::new(),
        }
    }

    /// Hash of the nonce `k`, computed on first use.
    pub fn nonce_hash(&self) -> Hash256 {
        *self.nonce_hash.get_or_init(|| nonce_hash(&self.k))
    }

    /// Change the nonce, dropping the cached hash.
    pub fn set_nonce(&mut self, k: Scalar) {
        self.k = k;
        self.nonce_hash = OnceLock::new();
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ScriptError> {
        Ok(codec().serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScriptError> {
        Ok(codec().deserialize(bytes)?)
    }
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

impl PartialEq for SparkMintMeta {
    fn eq(&self, other: &Self) -> bool {
        self.height == other.height
            && self.id == other.id
            && self.is_used == other.is_used
            && self.txid == other.txid
            && self.i == other.i
            && self.d == other.d
            && self.v == other.v
            && self.k == other.k
            && self.memo == other.memo
            && self.serial_context == other.serial_context
    }
}

impl Eq for SparkMintMeta {}
