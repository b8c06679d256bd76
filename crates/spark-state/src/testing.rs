//! deterministic fixtures for unit tests

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::scalar::Scalar as DalekScalar;
use spark_primitives::{Coin, GroupElement};

/// `n·G` for `n >= 1`, distinct per `n`.
pub fn point(n: u64) -> GroupElement {
    GroupElement::from_point(&(RISTRETTO_BASEPOINT_POINT * DalekScalar::from(n)))
}

pub fn mint_coin(n: u64) -> Coin {
    Coin::new_mint(
        point(3 * n + 1),
        point(3 * n + 2),
        point(3 * n + 3),
        n + 1,
        vec![0xee; 4],
        n.to_le_bytes().to_vec(),
    )
}

pub fn spend_coin(n: u64) -> Coin {
    Coin::new_spend(
        point(3 * n + 1),
        point(3 * n + 2),
        point(3 * n + 3),
        vec![0xdd; 4],
        n.to_le_bytes().to_vec(),
    )
}

/// Linking tags drawn from a range disjoint from coin points.
pub fn tag(n: u64) -> GroupElement {
    point(1_000_000 + n)
}
