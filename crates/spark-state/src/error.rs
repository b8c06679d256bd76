//! error types for the spark ledger

use spark_primitives::{GroupElement, Hash256, PrimitivesError};
use thiserror::Error;

/// Misuse of a per-block [`SparkTxInfo`](crate::SparkTxInfo) record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxInfoError {
    #[error("block spark info is complete and can no longer be extended")]
    Frozen,

    #[error("linking tag {0} recorded twice in one block")]
    DuplicateLinkingTag(GroupElement),
}

/// Malformed spark scripts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("empty script")]
    Empty,

    #[error("not a spark mint script (opcode {0:#04x})")]
    NotSparkMint(u8),

    #[error("not a spark spend script (opcode {0:#04x})")]
    NotSparkSpend(u8),

    #[error("coin decoding failed: {0}")]
    Coin(#[from] PrimitivesError),

    #[error("payload encoding error: {0}")]
    Encoding(String),
}

impl From<bincode::Error> for ScriptError {
    fn from(e: bincode::Error) -> Self {
        ScriptError::Encoding(e.to_string())
    }
}

/// Reasons a transaction fails the spark checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("spark is not active at height {height}")]
    NotActive { height: u32 },

    #[error("invalid spark script: {0}")]
    Script(#[from] ScriptError),

    #[error("coin {0} is malformed")]
    InvalidCoin(Hash256),

    #[error("mint output value {output} does not match coin value {coin:?}")]
    MintValueMismatch { output: u64, coin: Option<u64> },

    #[error("coin {0} has the wrong type for its output script")]
    WrongCoinType(Hash256),

    #[error("spend-output coin {0} outside a spend transaction")]
    PrivateMintWithoutSpend(Hash256),

    #[error("coin {0} appears twice in the transaction or block")]
    DuplicateMint(Hash256),

    #[error("coin {0} is already minted")]
    MintExists(Hash256),

    #[error("block mints {count} coins, more than a coin group holds ({max})")]
    TooManyMints { count: usize, max: usize },

    #[error("spark spend must have exactly one spend input, found {0}")]
    SpendInputCount(usize),

    #[error("spark spend has no inputs")]
    EmptySpend,

    #[error("coin group {0} does not exist")]
    UnknownCoinGroup(u32),

    #[error("linking tag {0} is malformed")]
    InvalidLinkingTag(GroupElement),

    #[error("linking tag {0} appears twice in the transaction or block")]
    DuplicateLinkingTag(GroupElement),

    #[error("linking tag {0} is already spent")]
    LinkingTagUsed(GroupElement),

    #[error("ownership proof {index} failed verification")]
    InvalidProof { index: usize },

    #[error("linking tag {tag} conflicts with mempool transaction {tx}")]
    MempoolSpendConflict { tag: GroupElement, tx: Hash256 },

    #[error("coin {0} is already in the mempool")]
    MempoolMintConflict(Hash256),

    #[error("block spark info: {0}")]
    TxInfo(#[from] TxInfoError),
}

/// Ledger-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger lock poisoned: {0}")]
    Lock(String),

    #[error("block spark info merged before completion")]
    IncompleteBlockInfo,

    #[error("block at height {got} is not after the last connected height {last}")]
    OutOfOrder { last: u32, got: u32 },

    #[error("block at height {got} is not the connected tip {last:?}")]
    NotTip { last: Option<u32>, got: u32 },

    #[error("block mints {count} coins, more than a coin group holds ({max})")]
    GroupOverflow { count: usize, max: usize },

    #[error("spark is not active at height {height}")]
    NotActive { height: u32 },

    #[error("coin {0} is already minted")]
    MintExists(Hash256),

    #[error("linking tag {0} is already spent")]
    LinkingTagUsed(GroupElement),

    #[error("transaction rejected: {0}")]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
