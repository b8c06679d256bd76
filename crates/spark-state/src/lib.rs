//! spark ledger state
//!
//! Tracks the committed spark coin set and spent linking tags of a chain,
//! alongside the mempool overlay of not-yet-mined spark transactions.
//!
//! ## usage
//!
//! ```ignore
//! use spark_state::{SparkLedger, SparkParams};
//!
//! let ledger = SparkLedger::new(SparkParams::regtest());
//! let info = ledger.connect_block(&block)?;
//! // on reorg
//! ledger.disconnect_block(block.height, &info)?;
//! ```
//!
//! Blocks can also be validated ahead of time with [`prevalidate_blocks`]
//! and merged in height order with [`SparkLedger::merge_block`].

pub mod chain;
mod error;
pub mod ledger;
pub mod mempool;
pub mod mint_info;
pub mod params;
pub mod script;
pub mod state;
pub mod tx_info;
pub mod validation;

#[cfg(test)]
mod testing;

pub use chain::{Block, ChainView, OutPoint, Script, Transaction, TxIn, TxOut};
pub use error::{LedgerError, Result, ScriptError, TxInfoError, ValidationError};
pub use ledger::SparkLedger;
pub use mempool::SparkMempoolState;
pub use mint_info::{MintedCoinInfo, SparkMintMeta};
pub use params::{Network, SparkParams};
pub use script::{
    mint_script, parse_spark_mint_coin, parse_spark_mint_transaction, parse_spark_spend,
    smint_script, spend_script, SparkSpend, SpendInput, OP_SPARKMINT, OP_SPARKSMINT,
    OP_SPARKSPEND,
};
pub use state::{SparkCoinGroupInfo, SparkState};
pub use tx_info::SparkTxInfo;
pub use validation::{
    check_spark_transaction, get_out_point, get_out_point_by_hash, get_out_point_from_block,
    prevalidate_blocks, prove_spend, spend_tx_input, validate_block, verify_spend_proofs,
    CheckContext, SpendWitness,
};

pub use spark_primitives as primitives;
