//! spark script opcodes and payload parsing
//!
//! Spark scripts are a single opcode followed by a payload:
//!
//! - `OP_SPARKMINT  || coin`   public mint, output carries the value
//! - `OP_SPARKSMINT || coin`   spend output, zero-value output
//! - `OP_SPARKSPEND || spend`  spend input, bincode [`SparkSpend`]

use bincode::Options;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use spark_primitives::{Coin, GroupElement, Hash256, SchnorrProof};

use crate::chain::{hash_outputs, Script, Transaction, TxOut};
use crate::error::ScriptError;

pub const OP_SPARKMINT: u8 = 0xd1;
pub const OP_SPARKSMINT: u8 = 0xd2;
pub const OP_SPARKSPEND: u8 = 0xd3;

const SPEND_CONTEXT_DOMAIN: &[u8] = b"spark.spend-context.v1";

/// One consumed coin: its linking tag and the ownership proof over `y`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendInput {
    pub linking_tag: GroupElement,
    pub y: GroupElement,
    pub a: GroupElement,
    pub b: GroupElement,
    pub proof: SchnorrProof,
}

/// Spend payload spending from a single coin group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparkSpend {
    pub coin_group_id: u32,
    pub inputs: Vec<SpendInput>,
}

impl SparkSpend {
    pub fn linking_tags(&self) -> Vec<GroupElement> {
        self.inputs.iter().map(|i| i.linking_tag).collect()
    }

    /// Seed for the transcript shared by this spend's ownership proofs.
    ///
    /// Commits to the spending transaction's outputs, the group and every
    /// linking tag, but not to the proofs themselves.
    pub fn transcript_seed(&self, outputs: &[TxOut]) -> Hash256 {
        spend_context(outputs, self.coin_group_id, self.inputs.iter().map(|i| &i.linking_tag))
    }
}

/// Spend transcript seed, computable before any proof exists.
pub fn spend_context<'a>(
    outputs: &[TxOut],
    coin_group_id: u32,
    tags: impl IntoIterator<Item = &'a GroupElement>,
) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(SPEND_CONTEXT_DOMAIN);
    hash_outputs(&mut hasher, outputs);
    hasher.update(coin_group_id.to_le_bytes());
    for tag in tags {
        hasher.update(tag.as_bytes());
    }
    Hash256(hasher.finalize().into())
}

fn payload_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

pub fn mint_script(coin: &Coin) -> Result<Script, ScriptError> {
    Ok(tagged(OP_SPARKMINT, coin.to_bytes()?))
}

pub fn smint_script(coin: &Coin) -> Result<Script, ScriptError> {
    Ok(tagged(OP_SPARKSMINT, coin.to_bytes()?))
}

pub fn spend_script(spend: &SparkSpend) -> Result<Script, ScriptError> {
    Ok(tagged(OP_SPARKSPEND, payload_codec().serialize(spend)?))
}

fn tagged(opcode: u8, payload: Vec<u8>) -> Script {
    let mut bytes = Vec::with_capacity(payload.len() + 1);
    bytes.push(opcode);
    bytes.extend_from_slice(&payload);
    Script(bytes)
}

/// Decode the coin carried by a mint or spend-output script.
pub fn parse_spark_mint_coin(script: &Script) -> Result<Coin, ScriptError> {
    let (&opcode, payload) = script.as_bytes().split_first().ok_or(ScriptError::Empty)?;
    if opcode != OP_SPARKMINT && opcode != OP_SPARKSMINT {
        return Err(ScriptError::NotSparkMint(opcode));
    }
    Ok(Coin::from_bytes(payload)?)
}

/// Decode every coin of a transaction's mint outputs, failing on the first bad one.
pub fn parse_spark_mint_transaction(scripts: &[&Script]) -> Result<Vec<Coin>, ScriptError> {
    scripts.iter().map(|s| parse_spark_mint_coin(s)).collect()
}

/// Coins created by the spark mint outputs of `tx`.
pub fn transaction_mints(tx: &Transaction) -> Result<Vec<Coin>, ScriptError> {
    let scripts: Vec<&Script> = tx
        .outputs
        .iter()
        .map(|o| &o.script)
        .filter(|s| s.is_spark_any_mint())
        .collect();
    parse_spark_mint_transaction(&scripts)
}

/// Linking tags revealed by the spark spend inputs of `tx`.
pub fn transaction_linking_tags(tx: &Transaction) -> Result<Vec<GroupElement>, ScriptError> {
    let mut tags = Vec::new();
    for input in tx.inputs.iter().filter(|i| i.script.is_spark_spend()) {
        tags.extend(parse_spark_spend(&input.script)?.linking_tags());
    }
    Ok(tags)
}

pub fn parse_spark_spend(script: &Script) -> Result<SparkSpend, ScriptError> {
    let (&opcode, payload) = script.as_bytes().split_first().ok_or(ScriptError::Empty)?;
    if opcode != OP_SPARKSPEND {
        return Err(ScriptError::NotSparkSpend(opcode));
    }
    Ok(payload_codec().deserialize(payload)?)
}
