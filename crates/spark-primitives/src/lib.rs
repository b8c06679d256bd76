//! spark primitives
//!
//! Value types shared by the spark ledger and its proof checks:
//!
//! - [`GroupElement`] / [`Scalar`]: ristretto255 elements kept in wire form,
//!   with membership tests for untrusted input
//! - [`Coin`]: the public commitment of a minted coin
//! - [`hash`]: domain-separated coin, linking tag and nonce hashes
//! - [`ChallengeGenerator`]: fiat-shamir transcript
//! - [`SchnorrVerifier`] / [`SchnorrProver`]: two-generator schnorr proofs
//!   with the legacy and fixed challenge transcripts
//!
//! All group arithmetic is delegated to `curve25519-dalek`.

pub mod challenge;
pub mod coin;
mod error;
pub mod group;
pub mod hash;
pub mod schnorr;

pub use challenge::{ChallengeGenerator, Sha256Transcript};
pub use coin::{Coin, CoinType};
pub use error::{PrimitivesError, Result};
pub use group::{GroupElement, Scalar};
pub use hash::{coin_hash, ltag_hash, nonce_hash, Hash256};
pub use schnorr::{Generators, SchnorrMode, SchnorrProof, SchnorrProver, SchnorrVerifier};
