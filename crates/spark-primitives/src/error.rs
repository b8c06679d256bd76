//! error types for spark primitives

use thiserror::Error;

/// Decoding and construction failures.
///
/// Proof verification never produces one of these: an invalid proof is a
/// plain `false` from the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitivesError {
    #[error("invalid group element encoding")]
    InvalidGroupElement,

    #[error("non-canonical scalar encoding")]
    InvalidScalar,

    #[error("truncated encoding: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    #[error("unknown coin type: {0}")]
    UnknownCoinType(u8),

    #[error("{0} trailing bytes after encoding")]
    TrailingBytes(usize),

    #[error("malformed coin: {0}")]
    MalformedCoin(&'static str),
}

pub type Result<T> = core::result::Result<T, PrimitivesError>;
