//! domain-separated hashes of coins, linking tags and nonces
//!
//! These are the 256-bit identifiers used for hash-indexed lookups
//! (`has_coin_hash`, `is_used_ltag_hash`) and for the memoized nonce hash in
//! wallet mint metadata. In-memory maps key on the values themselves through
//! their derived `Hash` impls.

use core::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::coin::Coin;
use crate::group::{GroupElement, Scalar};

/// domain separator for coin hashes
pub const COIN_HASH_DOMAIN: &[u8] = b"spark.coin-hash.v1";
/// domain separator for linking tag hashes
pub const LTAG_HASH_DOMAIN: &[u8] = b"spark.ltag-hash.v1";
/// domain separator for nonce hashes
pub const NONCE_HASH_DOMAIN: &[u8] = b"spark.nonce-hash.v1";

/// A 256-bit hash (transaction ids, block hashes, coin and tag hashes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn domain_hasher(domain: &[u8]) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update((domain.len() as u32).to_le_bytes());
    hasher.update(domain);
    hasher
}

fn domain_hash(domain: &[u8], data: &[u8]) -> Hash256 {
    let mut hasher = domain_hasher(domain);
    hasher.update(data);
    Hash256(hasher.finalize().into())
}

/// Hash of a coin's public fields.
///
/// The value is written with a presence flag, so coins whose value does not
/// match their type still hash apart from every well-formed coin.
pub fn coin_hash(coin: &Coin) -> Hash256 {
    let mut hasher = domain_hasher(COIN_HASH_DOMAIN);
    hasher.update([coin.coin_type.to_byte()]);
    hasher.update(coin.s.as_bytes());
    hasher.update(coin.k.as_bytes());
    hasher.update(coin.c.as_bytes());
    match coin.value {
        Some(value) => {
            hasher.update([1]);
            hasher.update(value.to_le_bytes());
        }
        None => hasher.update([0]),
    }
    for field in [&coin.encrypted, &coin.serial_context] {
        hasher.update((field.len() as u32).to_le_bytes());
        hasher.update(field);
    }
    Hash256(hasher.finalize().into())
}

/// Hash of a linking tag.
pub fn ltag_hash(tag: &GroupElement) -> Hash256 {
    domain_hash(LTAG_HASH_DOMAIN, tag.as_bytes())
}

/// Hash of a coin nonce.
pub fn nonce_hash(nonce: &Scalar) -> Hash256 {
    domain_hash(NONCE_HASH_DOMAIN, nonce.as_bytes())
}
