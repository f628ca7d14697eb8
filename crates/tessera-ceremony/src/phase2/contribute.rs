//! Contributions and their verification.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::{Field, PrimeField, UniformRand, Zero};
use rand::rngs::StdRng;
use rand::{CryptoRng, Rng, SeedableRng};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use super::{ContributionProof, Phase2};
use crate::codec::{self, Repr};
use crate::error::{CeremonyError, VerificationError};
use crate::phase1::short_hash;

const HASH_TO_G2_DOMAIN: &[u8] = b"tessera/phase2/pok";
const BATCH_DOMAIN: &[u8] = b"tessera/phase2/batch";
const HASH_TO_G2_ATTEMPTS: u32 = 256;

/// `e(a1, b2) == e(b1, a2)`: the G1 pair and the G2 pair share a ratio.
pub fn same_ratio(a1: G1Affine, b1: G1Affine, a2: G2Affine, b2: G2Affine) -> bool {
    Bn254::pairing(a1, b2) == Bn254::pairing(b1, a2)
}

/// Deterministically map `(sg, sxg, challenge)` to a non-identity point of
/// the G2 subgroup by try-and-increment over `x`.
pub fn hash_to_g2(sg: &G1Affine, sxg: &G1Affine, challenge: &[u8; 32]) -> Option<G2Affine> {
    let mut seed = Vec::with_capacity(HASH_TO_G2_DOMAIN.len() + 2 * codec::G1_SIZE + 32);
    seed.extend_from_slice(HASH_TO_G2_DOMAIN);
    codec::encode_g1(sg, Repr::Canonical, &mut seed);
    codec::encode_g1(sxg, Repr::Canonical, &mut seed);
    seed.extend_from_slice(challenge);

    let coordinate = |counter: u32, limb: u8| -> Fq {
        let mut hasher = Sha256::new();
        hasher.update(&seed);
        hasher.update(counter.to_le_bytes());
        hasher.update([limb]);
        Fq::from_le_bytes_mod_order(&hasher.finalize())
    };

    (0..HASH_TO_G2_ATTEMPTS).find_map(|counter| {
        let x = Fq2::new(coordinate(counter, 0), coordinate(counter, 1));
        G2Affine::get_point_from_x_unchecked(x, false)
            .map(|p| p.clear_cofactor())
            .filter(|p| !p.is_zero())
    })
}

fn nonzero_scalar<R: Rng>(rng: &mut R) -> Fr {
    loop {
        let s = Fr::rand(rng);
        if !s.is_zero() {
            return s;
        }
    }
}

fn scale_all(points: &[G1Affine], factor: Fr) -> Vec<G1Affine> {
    let scaled: Vec<G1Projective> = points.par_iter().map(|p| *p * factor).collect();
    G1Projective::normalize_batch(&scaled)
}

/// Random linear combinations `(Σ rᵢ·nextᵢ, Σ rᵢ·prevᵢ)` with coefficients
/// drawn from a generator seeded by both state hashes.
fn batch(
    next: &[G1Affine],
    prev: &[G1Affine],
    prev_hash: &[u8; 32],
    next_hash: &[u8; 32],
    label: &[u8],
) -> (G1Affine, G1Affine) {
    let mut hasher = Sha256::new();
    hasher.update(BATCH_DOMAIN);
    hasher.update(label);
    hasher.update(prev_hash);
    hasher.update(next_hash);
    let mut rng = StdRng::from_seed(hasher.finalize().into());
    let coeffs: Vec<Fr> = (0..next.len()).map(|_| Fr::rand(&mut rng)).collect();
    (
        G1Projective::msm_unchecked(next, &coeffs).into_affine(),
        G1Projective::msm_unchecked(prev, &coeffs).into_affine(),
    )
}

impl Phase2 {
    /// `phase2_contribute`: apply a fresh secret drawn from `rng`.
    ///
    /// The secret is dropped before returning; the new state carries only
    /// its effect and a proof of knowledge bound to `self.hash`.
    pub fn contribute<R: Rng + CryptoRng>(&self, rng: &mut R) -> Result<Phase2, CeremonyError> {
        let delta = nonzero_scalar(rng);
        let delta_inv = delta
            .inverse()
            .ok_or(VerificationError::Degenerate("contribution secret"))?;

        let s = nonzero_scalar(rng);
        let sg = (G1Affine::generator() * s).into_affine();
        let sxg = (sg * delta).into_affine();
        let r = hash_to_g2(&sg, &sxg, &self.hash).ok_or(VerificationError::HashToCurve)?;
        let xr = (r * delta).into_affine();

        let next = Phase2 {
            origin: self.origin,
            contributions: self.contributions.wrapping_add(1),
            delta_g1: (self.delta_g1 * delta).into_affine(),
            delta_g2: (self.delta_g2 * delta).into_affine(),
            l: scale_all(&self.l, delta_inv),
            z: scale_all(&self.z, delta_inv),
            proof: ContributionProof { sg, sxg, xr },
            hash: [0u8; 32],
        }
        .seal();

        tracing::info!(
            contribution = next.contributions,
            previous = %short_hash(&self.hash),
            hash = %short_hash(&next.hash),
            "phase 2 contribution applied"
        );
        Ok(next)
    }

    /// `phase2_verify`: check that `next` is a valid contribution on top of
    /// `prev`.
    pub fn verify(prev: &Phase2, next: &Phase2) -> Result<(), VerificationError> {
        if prev.origin != next.origin {
            return Err(VerificationError::OriginMismatch);
        }
        if prev.hash != prev.compute_hash() {
            return Err(VerificationError::HashMismatch { which: "previous" });
        }
        if next.hash != next.compute_hash() {
            return Err(VerificationError::HashMismatch { which: "contribution" });
        }
        if next.contributions != prev.contributions.wrapping_add(1) {
            return Err(VerificationError::LengthMismatch {
                what: "contribution count",
                previous: prev.contributions as usize,
                contribution: next.contributions as usize,
            });
        }
        for (what, previous, contribution) in [
            ("L", prev.l.len(), next.l.len()),
            ("Z", prev.z.len(), next.z.len()),
        ] {
            if previous != contribution {
                return Err(VerificationError::LengthMismatch {
                    what,
                    previous,
                    contribution,
                });
            }
        }

        let proof = &next.proof;
        if proof.sg.is_zero() || proof.sxg.is_zero() {
            return Err(VerificationError::Degenerate("proof of knowledge"));
        }
        if proof.xr.is_zero() {
            return Err(VerificationError::Degenerate("proof of knowledge"));
        }
        if next.delta_g1.is_zero() || next.delta_g2.is_zero() {
            return Err(VerificationError::Degenerate("delta"));
        }

        let r = hash_to_g2(&proof.sg, &proof.sxg, &prev.hash).ok_or(VerificationError::HashToCurve)?;
        if !same_ratio(proof.sg, proof.sxg, r, proof.xr) {
            return Err(VerificationError::InvalidProofOfKnowledge);
        }
        if !same_ratio(prev.delta_g1, next.delta_g1, r, proof.xr) {
            return Err(VerificationError::DeltaNotFromContribution);
        }
        if !same_ratio(prev.delta_g1, next.delta_g1, prev.delta_g2, next.delta_g2) {
            return Err(VerificationError::InconsistentDelta);
        }

        // next = prev / x, so e(next, x·δ₂) = e(prev, δ₂).
        let (next_l, prev_l) = batch(&next.l, &prev.l, &prev.hash, &next.hash, b"L");
        if !same_ratio(next_l, prev_l, prev.delta_g2, next.delta_g2) {
            return Err(VerificationError::InvalidL);
        }
        let (next_z, prev_z) = batch(&next.z, &prev.z, &prev.hash, &next.hash, b"Z");
        if !same_ratio(next_z, prev_z, prev.delta_g2, next.delta_g2) {
            return Err(VerificationError::InvalidZ);
        }

        tracing::info!(
            contribution = next.contributions,
            hash = %short_hash(&next.hash),
            "phase 2 contribution verified"
        );
        Ok(())
    }
}
