//! group and field elements in their wire encoding
//!
//! Both types keep the raw 32 bytes they were decoded from, so a value
//! received from the network can exist before anyone has checked that it is
//! a valid ristretto point or a canonical scalar. Arithmetic goes through
//! [`GroupElement::point`] and [`Scalar::inner`], which return `None` for
//! malformed encodings.

use core::fmt;

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar as DalekScalar,
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

/// A ristretto255 point, stored compressed.
///
/// The ristretto encoding is canonical, so byte equality is group equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupElement([u8; 32]);

impl GroupElement {
    pub const SIZE: usize = 32;

    /// The group identity (encodes as all zeros).
    pub const fn identity() -> Self {
        Self([0u8; 32])
    }

    pub fn generator() -> Self {
        Self::from_point(&RISTRETTO_BASEPOINT_POINT)
    }

    pub fn from_point(point: &RistrettoPoint) -> Self {
        Self(point.compress().to_bytes())
    }

    /// Wrap raw bytes without validating them.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash arbitrary bytes to a point with no known discrete log.
    pub fn hash_to_group(label: &[u8]) -> Self {
        Self::from_point(&RistrettoPoint::hash_from_bytes::<Sha512>(label))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decompress, or `None` if the bytes are not a valid encoding.
    pub fn point(&self) -> Option<RistrettoPoint> {
        CompressedRistretto(self.0).decompress()
    }

    pub fn is_member(&self) -> bool {
        self.point().is_some()
    }

    pub fn is_infinity(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupElement({})", hex::encode(self.0))
    }
}

impl fmt::Display for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<RistrettoPoint> for GroupElement {
    fn from(point: RistrettoPoint) -> Self {
        Self::from_point(&point)
    }
}

/// A scalar mod the ristretto group order, stored as 32 little-endian bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Scalar([u8; 32]);

impl Scalar {
    pub const SIZE: usize = 32;

    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn one() -> Self {
        Self::from_dalek(&DalekScalar::ONE)
    }

    pub fn from_u64(v: u64) -> Self {
        Self::from_dalek(&DalekScalar::from(v))
    }

    pub fn from_dalek(s: &DalekScalar) -> Self {
        Self(s.to_bytes())
    }

    /// Wrap raw bytes without checking canonicity.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Reduce a 32-byte digest mod the group order.
    pub fn from_hash(digest: [u8; 32]) -> Self {
        Self::from_dalek(&DalekScalar::from_bytes_mod_order(digest))
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_dalek(&DalekScalar::random(rng))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The field element, or `None` if the encoding is not canonical.
    pub fn inner(&self) -> Option<DalekScalar> {
        DalekScalar::from_canonical_bytes(self.0).into()
    }

    pub fn is_member(&self) -> bool {
        self.inner().is_some()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", hex::encode(self.0))
    }
}

impl From<DalekScalar> for Scalar {
    fn from(s: DalekScalar) -> Self {
        Self::from_dalek(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::traits::Identity;
    use rand::rngs::OsRng;

    #[test]
    fn test_identity_encoding() {
        let id = GroupElement::from_point(&RistrettoPoint::identity());
        assert_eq!(id, GroupElement::identity());
        assert!(id.is_infinity());
        assert!(id.is_member());
        assert!(!GroupElement::generator().is_infinity());
    }

    #[test]
    fn test_malformed_point_is_not_member() {
        // 0xff.. is not a canonical field element, so never a valid encoding
        let bad = GroupElement::from_bytes([0xff; 32]);
        assert!(!bad.is_member());
        assert!(bad.point().is_none());
    }

    #[test]
    fn test_hash_to_group_is_deterministic() {
        let a = GroupElement::hash_to_group(b"label");
        let b = GroupElement::hash_to_group(b"label");
        let c = GroupElement::hash_to_group(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_member());
    }

    #[test]
    fn test_scalar_canonicity() {
        let s = Scalar::random(&mut OsRng);
        assert!(s.is_member());
        assert!(!s.is_zero());

        // group order is ~2^252, so 2^256-1 is never canonical
        let non_canonical = Scalar::from_bytes([0xff; 32]);
        assert!(!non_canonical.is_member());

        assert!(Scalar::zero().is_zero());
        assert!(Scalar::zero().is_member());
        assert_eq!(Scalar::from_u64(1), Scalar::one());
    }
}
