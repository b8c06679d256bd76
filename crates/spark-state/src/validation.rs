//! spark transaction checks and block prevalidation

use std::collections::HashSet;

use rand_core::{CryptoRng, RngCore};
use spark_primitives::{
    Coin, GroupElement, Generators, Hash256, PrimitivesError, Scalar, SchnorrMode, SchnorrProver,
    SchnorrVerifier, Sha256Transcript,
};
use tracing::debug;

use crate::chain::{Block, ChainView, OutPoint, Script, Transaction, TxIn, TxOut};
use crate::error::ValidationError;
use crate::script::{
    parse_spark_mint_coin, parse_spark_mint_transaction, parse_spark_spend, spend_context,
    SparkSpend, SpendInput,
};
use crate::state::SparkState;
use crate::tx_info::SparkTxInfo;

/// How a transaction is being checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckContext {
    /// height the transaction will be (or was) included at
    pub height: u32,
    /// re-verifying blocks already merged into the ledger
    pub is_verify_db: bool,
    /// wallet rescan
    pub is_check_wallet: bool,
    /// check against committed state
    pub stateful: bool,
}

impl CheckContext {
    pub fn new(height: u32) -> Self {
        Self {
            height,
            stateful: true,
            ..Self::default()
        }
    }

    /// Structural and proof checks only.
    pub fn stateless(height: u32) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    fn checks_state(&self) -> bool {
        self.stateful && !self.is_verify_db && !self.is_check_wallet
    }
}

/// Check the spark parts of `tx`.
///
/// Non-spark transactions pass. When `tx_info` is given and still open, the
/// transaction's coins and linking tags are recorded into it; nothing is
/// recorded unless every check passes. Block-level duplicates are detected
/// against what `tx_info` already holds.
pub fn check_spark_transaction(
    tx: &Transaction,
    state: &SparkState,
    tx_hash: Hash256,
    ctx: &CheckContext,
    tx_info: Option<&mut SparkTxInfo>,
) -> Result<(), ValidationError> {
    let result = check_and_record(tx, state, tx_hash, ctx, tx_info);
    if let Err(e) = &result {
        debug!(%tx_hash, height = ctx.height, "spark check failed: {}", e);
    }
    result
}

fn check_and_record(
    tx: &Transaction,
    state: &SparkState,
    tx_hash: Hash256,
    ctx: &CheckContext,
    tx_info: Option<&mut SparkTxInfo>,
) -> Result<(), ValidationError> {
    if !tx.is_spark_transaction() {
        return Ok(());
    }
    let is_spend = tx.is_spark_spend();
    if !state.params().is_spark_allowed(ctx.height) {
        return Err(ValidationError::NotActive { height: ctx.height });
    }

    let block_info = tx_info.as_deref();
    let coins = check_mint_outputs(tx, state, ctx, is_spend, block_info)?;
    let count = coins.len() + block_info.map_or(0, |info| info.mints().len());
    let max = state.params().max_coins_in_group;
    if count > max {
        return Err(ValidationError::TooManyMints { count, max });
    }
    let spend = if is_spend {
        Some(check_spend(tx, state, ctx, block_info)?)
    } else {
        None
    };

    if let Some(info) = tx_info {
        if !info.is_complete() {
            info.add_transaction(tx_hash)?;
            for coin in coins {
                info.add_mint(coin)?;
            }
            if let Some(spend) = &spend {
                for input in &spend.inputs {
                    info.add_spend(input.linking_tag, spend.coin_group_id)?;
                }
            }
        }
    }
    Ok(())
}

fn check_mint_outputs(
    tx: &Transaction,
    state: &SparkState,
    ctx: &CheckContext,
    is_spend: bool,
    block_info: Option<&SparkTxInfo>,
) -> Result<Vec<Coin>, ValidationError> {
    let outputs: Vec<&TxOut> = tx
        .outputs
        .iter()
        .filter(|o| o.script.is_spark_any_mint())
        .collect();
    let scripts: Vec<&Script> = outputs.iter().map(|o| &o.script).collect();
    let coins = parse_spark_mint_transaction(&scripts)?;

    let mut seen = HashSet::with_capacity(coins.len());
    for (output, coin) in outputs.iter().zip(&coins) {
        let hash = coin.hash();
        if !coin.is_valid() {
            return Err(ValidationError::InvalidCoin(hash));
        }
        if output.script.is_spark_mint() {
            if !coin.is_mint() {
                return Err(ValidationError::WrongCoinType(hash));
            }
            if output.value == 0 || coin.value != Some(output.value) {
                return Err(ValidationError::MintValueMismatch {
                    output: output.value,
                    coin: coin.value,
                });
            }
        } else {
            if coin.is_mint() {
                return Err(ValidationError::WrongCoinType(hash));
            }
            if !is_spend {
                return Err(ValidationError::PrivateMintWithoutSpend(hash));
            }
            if output.value != 0 {
                return Err(ValidationError::MintValueMismatch {
                    output: output.value,
                    coin: None,
                });
            }
        }
        if !seen.insert(coin) || block_info.is_some_and(|info| info.contains_mint(coin)) {
            return Err(ValidationError::DuplicateMint(hash));
        }
        if ctx.checks_state() && state.has_coin(coin) {
            return Err(ValidationError::MintExists(hash));
        }
    }
    Ok(coins)
}

fn check_spend(
    tx: &Transaction,
    state: &SparkState,
    ctx: &CheckContext,
    block_info: Option<&SparkTxInfo>,
) -> Result<SparkSpend, ValidationError> {
    let input = match tx.inputs.as_slice() {
        [input] if input.script.is_spark_spend() => input,
        inputs => return Err(ValidationError::SpendInputCount(inputs.len())),
    };
    let spend = parse_spark_spend(&input.script)?;
    if spend.inputs.is_empty() {
        return Err(ValidationError::EmptySpend);
    }
    if ctx.checks_state() && state.coin_group_info(spend.coin_group_id).is_none() {
        return Err(ValidationError::UnknownCoinGroup(spend.coin_group_id));
    }

    let mut seen = HashSet::with_capacity(spend.inputs.len());
    for input in &spend.inputs {
        let tag = input.linking_tag;
        if tag.is_infinity() || !tag.is_member() {
            return Err(ValidationError::InvalidLinkingTag(tag));
        }
        if !seen.insert(tag) || block_info.is_some_and(|info| info.contains_ltag(&tag)) {
            return Err(ValidationError::DuplicateLinkingTag(tag));
        }
        if ctx.checks_state() && state.is_used_ltag(&tag) {
            return Err(ValidationError::LinkingTagUsed(tag));
        }
    }

    verify_spend_proofs(&spend, &tx.outputs, state.params().schnorr_mode(ctx.height))?;
    Ok(spend)
}

/// Verify every ownership proof of `spend` in order on one shared transcript.
pub fn verify_spend_proofs(
    spend: &SparkSpend,
    outputs: &[TxOut],
    mode: SchnorrMode,
) -> Result<(), ValidationError> {
    let verifier = SchnorrVerifier::new(Generators::default(), mode);
    let seed = spend.transcript_seed(outputs);
    let mut transcript = Sha256Transcript::with_seed(seed.as_bytes());
    for (index, input) in spend.inputs.iter().enumerate() {
        let (ok, next) = verifier.verify(&input.y, &input.a, &input.b, &input.proof, transcript);
        if !ok {
            return Err(ValidationError::InvalidProof { index });
        }
        transcript = next;
    }
    Ok(())
}

/// Secret opening of one spent coin, used to build a [`SparkSpend`].
#[derive(Clone, Debug)]
pub struct SpendWitness {
    pub linking_tag: GroupElement,
    pub p: Scalar,
    pub t: Scalar,
    pub a: GroupElement,
    pub b: GroupElement,
}

/// Prove ownership of every witness against the outputs of the spending transaction.
pub fn prove_spend<R: RngCore + CryptoRng>(
    coin_group_id: u32,
    witnesses: &[SpendWitness],
    outputs: &[TxOut],
    mode: SchnorrMode,
    rng: &mut R,
) -> Result<SparkSpend, PrimitivesError> {
    let generators = Generators::default();
    let prover = SchnorrProver::new(generators, mode);
    let seed = spend_context(outputs, coin_group_id, witnesses.iter().map(|w| &w.linking_tag));
    let mut transcript = Sha256Transcript::with_seed(seed.as_bytes());

    let mut inputs = Vec::with_capacity(witnesses.len());
    for w in witnesses {
        let y = generators.commit(&w.p, &w.t)?;
        let (proof, next) = prover.prove(&w.p, &w.t, &y, &w.a, &w.b, transcript, rng)?;
        transcript = next;
        inputs.push(SpendInput {
            linking_tag: w.linking_tag,
            y,
            a: w.a,
            b: w.b,
            proof,
        });
    }
    Ok(SparkSpend {
        coin_group_id,
        inputs,
    })
}

/// Single spend input wrapping `spend`, as carried by a spend transaction.
pub fn spend_tx_input(spend: &SparkSpend) -> Result<TxIn, ValidationError> {
    Ok(TxIn {
        prev_out: OutPoint::default(),
        script: crate::script::spend_script(spend)?,
    })
}

/// Check every transaction of `block` against `state`, collecting its completed record.
pub fn validate_block(state: &SparkState, block: &Block) -> Result<SparkTxInfo, ValidationError> {
    let ctx = CheckContext::new(block.height);
    let mut info = SparkTxInfo::new();
    for tx in &block.transactions {
        check_spark_transaction(tx, state, tx.txid(), &ctx, Some(&mut info))?;
    }
    info.complete();
    Ok(info)
}

/// Validate independent blocks against one committed snapshot.
///
/// Records must still be merged one at a time in height order; conflicts
/// between the blocks themselves surface at merge.
#[cfg(feature = "parallel")]
pub fn prevalidate_blocks(
    state: &SparkState,
    blocks: &[Block],
) -> Vec<Result<SparkTxInfo, ValidationError>> {
    use rayon::prelude::*;
    blocks.par_iter().map(|b| validate_block(state, b)).collect()
}

#[cfg(not(feature = "parallel"))]
pub fn prevalidate_blocks(
    state: &SparkState,
    blocks: &[Block],
) -> Vec<Result<SparkTxInfo, ValidationError>> {
    blocks.iter().map(|b| validate_block(state, b)).collect()
}

/// Find the output that created `coin` within `block`.
pub fn get_out_point_from_block(coin: &Coin, block: &Block) -> Option<OutPoint> {
    for tx in &block.transactions {
        for (index, output) in tx.outputs.iter().enumerate() {
            if !output.script.is_spark_any_mint() {
                continue;
            }
            if parse_spark_mint_coin(&output.script).ok().as_ref() == Some(coin) {
                return Some(OutPoint::new(tx.txid(), index as u32));
            }
        }
    }
    None
}

/// Locate a committed coin's creating output through its mint height.
pub fn get_out_point<C: ChainView + ?Sized>(
    state: &SparkState,
    chain: &C,
    coin: &Coin,
) -> Option<OutPoint> {
    let (height, _) = state.minted_coin_height_and_id(coin)?;
    get_out_point_from_block(coin, chain.block_at(height)?)
}

pub fn get_out_point_by_hash<C: ChainView + ?Sized>(
    state: &SparkState,
    chain: &C,
    coin_hash: &Hash256,
) -> Option<OutPoint> {
    let coin = state.has_coin_hash(coin_hash)?;
    get_out_point(state, chain, coin)
}
