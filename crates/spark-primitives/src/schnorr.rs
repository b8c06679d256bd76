//! two-generator schnorr proofs
//!
//! Proves knowledge of `(P, T)` with `y = g·P + h·T`. The prover commits
//! `u = g·r + h·s`, derives `c` from the transcript, and answers
//! `P1 = r − c·P`, `T1 = s − c·T`. The verifier accepts iff
//! `u == y·c + g·P1 + h·T1`.
//!
//! The transcript the challenge is drawn from changed in a protocol upgrade:
//!
//! - [`SchnorrMode::Legacy`]: a fresh transcript fed only `u`; the caller's
//!   transcript is dropped and the fresh one handed back
//! - [`SchnorrMode::Fixed`]: the caller's transcript is fed the
//!   [`SCHNORR_PROOF_LABEL`] and then `u, y, a, b`, binding the challenge to
//!   the whole statement, and handed back with those additions
//!
//! Transcripts move in and out by value, so the replacement in legacy mode
//! is visible in the return value rather than through a shared handle.

use curve25519_dalek::{
    ristretto::RistrettoPoint,
    scalar::Scalar as DalekScalar,
    traits::MultiscalarMul,
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::challenge::ChallengeGenerator;
use crate::error::{PrimitivesError, Result};
use crate::group::{GroupElement, Scalar};

/// domain separator fed to fixed-mode transcripts
pub const SCHNORR_PROOF_LABEL: &[u8] = b"SCHNORR_PROOF";

/// label hashed to the second generator `h`
pub const GENERATOR_H_LABEL: &[u8] = b"spark.schnorr.generator-h.v1";

/// A schnorr proof `{u, P1, T1}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    pub u: GroupElement,
    pub p1: Scalar,
    pub t1: Scalar,
}

impl SchnorrProof {
    pub const SIZE: usize = 96;

    pub fn to_bytes(&self) -> [u8; 96] {
        let mut buf = [0u8; 96];
        buf[0..32].copy_from_slice(self.u.as_bytes());
        buf[32..64].copy_from_slice(self.p1.as_bytes());
        buf[64..96].copy_from_slice(self.t1.as_bytes());
        buf
    }

    /// Elements are not validated here; the verifier rejects malformed ones.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(PrimitivesError::Truncated {
                need: Self::SIZE,
                got: bytes.len(),
            });
        }
        let mut u = [0u8; 32];
        let mut p1 = [0u8; 32];
        let mut t1 = [0u8; 32];
        u.copy_from_slice(&bytes[0..32]);
        p1.copy_from_slice(&bytes[32..64]);
        t1.copy_from_slice(&bytes[64..96]);
        Ok(Self {
            u: GroupElement::from_bytes(u),
            p1: Scalar::from_bytes(p1),
            t1: Scalar::from_bytes(t1),
        })
    }
}

/// Which challenge transcript a proof is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchnorrMode {
    Legacy,
    Fixed,
}

impl SchnorrMode {
    pub fn from_fixes(with_fixes: bool) -> Self {
        if with_fixes {
            SchnorrMode::Fixed
        } else {
            SchnorrMode::Legacy
        }
    }

    /// Feed the statement into a transcript and draw the challenge.
    ///
    /// Returns the challenge and the transcript the caller should keep using:
    /// a fresh one in legacy mode, the given one extended in fixed mode.
    pub fn derive_challenge<C: ChallengeGenerator + Default>(
        self,
        u: &GroupElement,
        y: &GroupElement,
        a: &GroupElement,
        b: &GroupElement,
        transcript: C,
    ) -> (Scalar, C) {
        let mut transcript = match self {
            SchnorrMode::Legacy => {
                drop(transcript);
                let mut fresh = C::default();
                fresh.add_elements(&[*u]);
                fresh
            }
            SchnorrMode::Fixed => {
                let mut t = transcript;
                t.add_bytes(SCHNORR_PROOF_LABEL);
                t.add_elements(&[*u, *y, *a, *b]);
                t
            }
        };
        let c = transcript.challenge();
        (c, transcript)
    }
}

/// The public generators `g` and `h`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generators {
    g: RistrettoPoint,
    h: RistrettoPoint,
}

impl Generators {
    pub fn new(g: &GroupElement, h: &GroupElement) -> Result<Self> {
        let g = g.point().ok_or(PrimitivesError::InvalidGroupElement)?;
        let h = h.point().ok_or(PrimitivesError::InvalidGroupElement)?;
        Ok(Self { g, h })
    }

    /// `g·p + h·t`
    pub fn commit(&self, p: &Scalar, t: &Scalar) -> Result<GroupElement> {
        let p = p.inner().ok_or(PrimitivesError::InvalidScalar)?;
        let t = t.inner().ok_or(PrimitivesError::InvalidScalar)?;
        Ok(GroupElement::from_point(&RistrettoPoint::multiscalar_mul(
            [p, t],
            [self.g, self.h],
        )))
    }
}

impl Default for Generators {
    /// ristretto basepoint and a nothing-up-my-sleeve `h`
    fn default() -> Self {
        Self {
            g: curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT,
            h: RistrettoPoint::hash_from_bytes::<sha2::Sha512>(GENERATOR_H_LABEL),
        }
    }
}

/// Schnorr verifier for a fixed pair of generators and transcript mode.
#[derive(Clone, Copy, Debug)]
pub struct SchnorrVerifier {
    generators: Generators,
    mode: SchnorrMode,
}

impl SchnorrVerifier {
    pub fn new(generators: Generators, mode: SchnorrMode) -> Self {
        Self { generators, mode }
    }

    pub fn mode(&self) -> SchnorrMode {
        self.mode
    }

    /// Verify `proof` for statement `y` bound to auxiliary commitments `a, b`.
    ///
    /// The challenge is drawn before any validity check, so the returned
    /// transcript reflects the proof even when the proof is rejected.
    pub fn verify<C: ChallengeGenerator + Default>(
        &self,
        y: &GroupElement,
        a: &GroupElement,
        b: &GroupElement,
        proof: &SchnorrProof,
        transcript: C,
    ) -> (bool, C) {
        let (c, transcript) = self.mode.derive_challenge(&proof.u, y, a, b, transcript);
        (self.check(y, a, b, proof, &c), transcript)
    }

    fn check(
        &self,
        y: &GroupElement,
        a: &GroupElement,
        b: &GroupElement,
        proof: &SchnorrProof,
        c: &Scalar,
    ) -> bool {
        if proof.u.is_infinity() || y.is_infinity() || proof.p1.is_zero() || proof.t1.is_zero() {
            return false;
        }
        if !(a.is_member() && b.is_member()) {
            return false;
        }

        let (Some(u), Some(y), Some(p1), Some(t1), Some(c)) = (
            proof.u.point(),
            y.point(),
            proof.p1.inner(),
            proof.t1.inner(),
            c.inner(),
        ) else {
            return false;
        };

        let right = RistrettoPoint::multiscalar_mul(
            [c, p1, t1],
            [y, self.generators.g, self.generators.h],
        );
        u == right
    }
}

/// Produces proofs the matching [`SchnorrVerifier`] accepts.
#[derive(Clone, Copy, Debug)]
pub struct SchnorrProver {
    generators: Generators,
    mode: SchnorrMode,
}

impl SchnorrProver {
    pub fn new(generators: Generators, mode: SchnorrMode) -> Self {
        Self { generators, mode }
    }

    /// Prove knowledge of `(p, t)` opening `y = g·p + h·t`.
    ///
    /// `transcript` must be in the same state the verifier's will be in.
    pub fn prove<C, R>(
        &self,
        p: &Scalar,
        t: &Scalar,
        y: &GroupElement,
        a: &GroupElement,
        b: &GroupElement,
        transcript: C,
        rng: &mut R,
    ) -> Result<(SchnorrProof, C)>
    where
        C: ChallengeGenerator + Default,
        R: RngCore + CryptoRng,
    {
        let p = p.inner().ok_or(PrimitivesError::InvalidScalar)?;
        let t = t.inner().ok_or(PrimitivesError::InvalidScalar)?;

        let r = DalekScalar::random(rng);
        let s = DalekScalar::random(rng);
        let u = GroupElement::from_point(&RistrettoPoint::multiscalar_mul(
            [r, s],
            [self.generators.g, self.generators.h],
        ));

        let (c, transcript) = self.mode.derive_challenge(&u, y, a, b, transcript);
        let c = c.inner().ok_or(PrimitivesError::InvalidScalar)?;

        let proof = SchnorrProof {
            u,
            p1: Scalar::from_dalek(&(r - c * p)),
            t1: Scalar::from_dalek(&(s - c * t)),
        };
        Ok((proof, transcript))
    }
}
