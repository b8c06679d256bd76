//! minimal chain model the spark checks read from
//!
//! Only what the ledger needs: outputs carry scripts, spend transactions
//! carry their spark payload in an input script, and blocks are addressed by
//! height through [`ChainView`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use spark_primitives::Hash256;

use crate::script::{OP_SPARKMINT, OP_SPARKSMINT, OP_SPARKSPEND};

/// Raw output or input script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script(pub Vec<u8>);

impl Script {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn opcode(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Public (value-carrying) mint.
    pub fn is_spark_mint(&self) -> bool {
        self.opcode() == Some(OP_SPARKMINT)
    }

    /// Private mint created as a spend output.
    pub fn is_spark_smint(&self) -> bool {
        self.opcode() == Some(OP_SPARKSMINT)
    }

    pub fn is_spark_spend(&self) -> bool {
        self.opcode() == Some(OP_SPARKSPEND)
    }

    pub fn is_spark_any_mint(&self) -> bool {
        self.is_spark_mint() || self.is_spark_smint()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, index: u32) -> Self {
        Self { txid, index }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prev_out: OutPoint,
    pub script: Script,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script: Script,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    pub fn txid(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update((self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.prev_out.txid.as_bytes());
            hasher.update(input.prev_out.index.to_le_bytes());
            hash_script(&mut hasher, &input.script);
        }
        hash_outputs(&mut hasher, &self.outputs);
        Hash256(hasher.finalize().into())
    }

    pub fn is_spark_mint(&self) -> bool {
        self.outputs.iter().any(|o| o.script.is_spark_any_mint())
    }

    pub fn is_spark_spend(&self) -> bool {
        self.inputs.iter().any(|i| i.script.is_spark_spend())
    }

    pub fn is_spark_transaction(&self) -> bool {
        self.is_spark_mint() || self.is_spark_spend()
    }
}

pub(crate) fn hash_script(hasher: &mut Sha256, script: &Script) {
    hasher.update((script.0.len() as u32).to_le_bytes());
    hasher.update(&script.0);
}

pub(crate) fn hash_outputs(hasher: &mut Sha256, outputs: &[TxOut]) {
    hasher.update((outputs.len() as u32).to_le_bytes());
    for output in outputs {
        hasher.update(output.value.to_le_bytes());
        hash_script(hasher, &output.script);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u32,
    pub prev_hash: Hash256,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(height: u32, prev_hash: Hash256, transactions: Vec<Transaction>) -> Self {
        Self {
            height,
            prev_hash,
            transactions,
        }
    }
}

/// Read access to connected blocks by height.
pub trait ChainView {
    fn block_at(&self, height: u32) -> Option<&Block>;
}

impl ChainView for [Block] {
    fn block_at(&self, height: u32) -> Option<&Block> {
        self.iter().find(|b| b.height == height)
    }
}

impl ChainView for Vec<Block> {
    fn block_at(&self, height: u32) -> Option<&Block> {
        self.as_slice().block_at(height)
    }
}

impl ChainView for BTreeMap<u32, Block> {
    fn block_at(&self, height: u32) -> Option<&Block> {
        self.get(&height)
    }
}
