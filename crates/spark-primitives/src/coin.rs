//! spark coins
//!
//! A coin is the public commitment published when value enters the shielded
//! pool. The hidden parts (diversifier, value for spend outputs, nonce, memo)
//! travel only inside `encrypted`; equality and hashing look at the public
//! encoding alone.

use serde::{Deserialize, Serialize};

use crate::error::{PrimitivesError, Result};
use crate::group::GroupElement;
use crate::hash::{coin_hash, Hash256};

/// How a coin entered the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinType {
    /// created by a transparent-to-shielded mint, value is public
    Mint,
    /// created as an output of a shielded spend, value is hidden
    Spend,
}

impl CoinType {
    pub fn to_byte(self) -> u8 {
        match self {
            CoinType::Mint => 0,
            CoinType::Spend => 1,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(CoinType::Mint),
            1 => Ok(CoinType::Spend),
            other => Err(PrimitivesError::UnknownCoinType(other)),
        }
    }
}

/// A minted spark coin.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub coin_type: CoinType,
    /// serial commitment
    pub s: GroupElement,
    /// recovery key
    pub k: GroupElement,
    /// value commitment
    pub c: GroupElement,
    /// public value, present only for mint coins
    pub value: Option<u64>,
    /// encrypted recipient data
    pub encrypted: Vec<u8>,
    /// binds the coin to the transaction that created it
    pub serial_context: Vec<u8>,
}

impl Coin {
    pub fn new_mint(
        s: GroupElement,
        k: GroupElement,
        c: GroupElement,
        value: u64,
        encrypted: Vec<u8>,
        serial_context: Vec<u8>,
    ) -> Self {
        Self {
            coin_type: CoinType::Mint,
            s,
            k,
            c,
            value: Some(value),
            encrypted,
            serial_context,
        }
    }

    pub fn new_spend(
        s: GroupElement,
        k: GroupElement,
        c: GroupElement,
        encrypted: Vec<u8>,
        serial_context: Vec<u8>,
    ) -> Self {
        Self {
            coin_type: CoinType::Spend,
            s,
            k,
            c,
            value: None,
            encrypted,
            serial_context,
        }
    }

    pub fn is_mint(&self) -> bool {
        self.coin_type == CoinType::Mint
    }

    /// Structural validity: well-formed, non-identity points and a value
    /// that is present exactly when the coin type says it is public.
    pub fn is_valid(&self) -> bool {
        let points_ok = [&self.s, &self.k, &self.c]
            .iter()
            .all(|p| p.is_member() && !p.is_infinity());
        let value_ok = match self.coin_type {
            CoinType::Mint => self.value.is_some(),
            CoinType::Spend => self.value.is_none(),
        };
        points_ok && value_ok
    }

    pub fn hash(&self) -> Hash256 {
        coin_hash(self)
    }

    /// Serialize for scripts. Fails if the value does not match the coin type.
    ///
    /// layout: type (1) | s (32) | k (32) | c (32) | value (8, mint only)
    /// | len (4) | encrypted | len (4) | serial_context
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match (self.coin_type, self.value) {
            (CoinType::Mint, None) => {
                return Err(PrimitivesError::MalformedCoin("mint coin without a value"))
            }
            (CoinType::Spend, Some(_)) => {
                return Err(PrimitivesError::MalformedCoin("spend coin with a public value"))
            }
            _ => {}
        }
        let mut buf = Vec::with_capacity(1 + 96 + 8 + 8 + self.encrypted.len() + self.serial_context.len());
        buf.push(self.coin_type.to_byte());
        buf.extend_from_slice(self.s.as_bytes());
        buf.extend_from_slice(self.k.as_bytes());
        buf.extend_from_slice(self.c.as_bytes());
        if let Some(value) = self.value {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&(self.encrypted.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.encrypted);
        buf.extend_from_slice(&(self.serial_context.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.serial_context);
        Ok(buf)
    }

    /// Deserialize. Points are not validated here, see [`Coin::is_valid`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let coin_type = CoinType::from_byte(r.byte()?)?;
        let s = GroupElement::from_bytes(r.array()?);
        let k = GroupElement::from_bytes(r.array()?);
        let c = GroupElement::from_bytes(r.array()?);
        let value = match coin_type {
            CoinType::Mint => Some(u64::from_le_bytes(r.array()?)),
            CoinType::Spend => None,
        };
        let encrypted = r.var_bytes()?.to_vec();
        let serial_context = r.var_bytes()?.to_vec();
        r.finish()?;

        Ok(Self {
            coin_type,
            s,
            k,
            c,
            value,
            encrypted,
            serial_context,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.bytes.len() - self.offset;
        if remaining < n {
            return Err(PrimitivesError::Truncated {
                need: self.offset + n,
                got: self.bytes.len(),
            });
        }
        let out = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = u32::from_le_bytes(self.array()?) as usize;
        self.take(len)
    }

    fn finish(self) -> Result<()> {
        match self.bytes.len() - self.offset {
            0 => Ok(()),
            n => Err(PrimitivesError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::ristretto::RistrettoPoint;
    use rand::rngs::OsRng;

    fn random_point() -> GroupElement {
        GroupElement::from_point(&RistrettoPoint::random(&mut OsRng))
    }

    fn mint_coin(value: u64) -> Coin {
        Coin::new_mint(
            random_point(),
            random_point(),
            random_point(),
            value,
            vec![7u8; 48],
            b"serial-context".to_vec(),
        )
    }

    #[test]
    fn test_mint_encoding() {
        let coin = mint_coin(5_000);
        let bytes = coin.to_bytes().unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(Coin::from_bytes(&bytes).unwrap(), coin);
    }

    #[test]
    fn test_spend_coin_has_no_value_field() {
        let mint = mint_coin(1);
        let spend = Coin::new_spend(
            mint.s,
            mint.k,
            mint.c,
            mint.encrypted.clone(),
            mint.serial_context.clone(),
        );
        assert_eq!(mint.to_bytes().unwrap().len(), spend.to_bytes().unwrap().len() + 8);
        assert_eq!(Coin::from_bytes(&spend.to_bytes().unwrap()).unwrap(), spend);
    }

    #[test]
    fn test_truncated_and_trailing() {
        let bytes = mint_coin(9).to_bytes().unwrap();
        assert!(matches!(
            Coin::from_bytes(&bytes[..bytes.len() - 1]),
            Err(PrimitivesError::Truncated { .. })
        ));

        let mut long = bytes.clone();
        long.push(0);
        assert_eq!(Coin::from_bytes(&long), Err(PrimitivesError::TrailingBytes(1)));

        let mut bad_type = bytes;
        bad_type[0] = 9;
        assert_eq!(Coin::from_bytes(&bad_type), Err(PrimitivesError::UnknownCoinType(9)));
    }

    #[test]
    fn test_validity() {
        let coin = mint_coin(3);
        assert!(coin.is_valid());

        let mut identity = coin.clone();
        identity.k = GroupElement::identity();
        assert!(!identity.is_valid());

        let mut malformed = coin.clone();
        malformed.c = GroupElement::from_bytes([0xff; 32]);
        assert!(!malformed.is_valid());

        let mut no_value = coin;
        no_value.value = None;
        assert!(!no_value.is_valid());
    }

    #[test]
    fn test_value_must_match_type() {
        let zero = mint_coin(0);
        let mut missing = zero.clone();
        missing.value = None;
        assert_eq!(
            missing.to_bytes(),
            Err(PrimitivesError::MalformedCoin("mint coin without a value"))
        );
        assert_ne!(missing.hash(), zero.hash());

        let mut public = Coin::new_spend(zero.s, zero.k, zero.c, vec![], vec![]);
        public.value = Some(4);
        assert!(public.to_bytes().is_err());
    }

    #[test]
    fn test_equality_is_structural() {
        let a = mint_coin(10);
        let mut b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());

        b.serial_context.push(1);
        assert_ne!(a, b);
        assert_ne!(a.hash(), b.hash());
    }

    proptest::proptest! {
        #[test]
        fn prop_decoding_is_canonical(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..200)) {
            // the point bytes need not be on the curve, decoding is structural
            if let Ok(coin) = Coin::from_bytes(&bytes) {
                proptest::prop_assert_eq!(coin.to_bytes().unwrap(), bytes);
            }
        }

        #[test]
        fn prop_decode_accepts_any_payload(
            encrypted in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
            context in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
        ) {
            let mut bytes = vec![1u8];
            bytes.extend_from_slice(&[0u8; 96]);
            bytes.extend_from_slice(&(encrypted.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&encrypted);
            bytes.extend_from_slice(&(context.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&context);
            let coin = Coin::from_bytes(&bytes).unwrap();
            proptest::prop_assert_eq!(&coin.encrypted, &encrypted);
            proptest::prop_assert_eq!(&coin.serial_context, &context);
            proptest::prop_assert!(!coin.is_mint());
        }
    }
}
