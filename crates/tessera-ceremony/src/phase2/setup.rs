//! Phase 2 initialisation: QAP evaluation in the Lagrange basis.

use ark_bn254::{Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_poly::{EvaluationDomain, Radix2EvaluationDomain};
use rayon::prelude::*;

use super::{origin_digest, ContributionProof, Phase2, Phase2Evaluations};
use crate::error::{CeremonyError, CeremonyFileError};
use crate::phase1::{short_hash, Phase1};
use crate::r1cs::R1cs;

/// `[L_i(τ)]` for the size-`n` domain, from the first `n` monomial powers.
fn lagrange_g1(domain: &Radix2EvaluationDomain<Fr>, powers: &[G1Affine]) -> Vec<G1Affine> {
    let monomial: Vec<G1Projective> = powers.par_iter().map(|p| p.into_group()).collect();
    G1Projective::normalize_batch(&domain.ifft(&monomial))
}

fn lagrange_g2(domain: &Radix2EvaluationDomain<Fr>, powers: &[G2Affine]) -> Vec<G2Affine> {
    let monomial: Vec<G2Projective> = powers.par_iter().map(|p| p.into_group()).collect();
    G2Projective::normalize_batch(&domain.ifft(&monomial))
}

impl Phase2 {
    /// `phase2_init`: derive the initial state and the evaluations for
    /// `r1cs` from `phase1`.
    ///
    /// The QAP layout matches arkworks' libsnark reduction: a domain of
    /// `next_pow2(constraints + instance wires)`, with one extra row per
    /// instance wire copying it into `A`. Keys extracted from the result are
    /// usable with `ark_groth16`'s prover and verifier.
    ///
    /// Deterministic: the same inputs always produce byte-identical output.
    pub fn init(r1cs: &R1cs, phase1: &Phase1) -> Result<(Phase2, Phase2Evaluations), CeremonyError> {
        phase1.check_lengths()?;
        let num_wires = r1cs.num_wires as usize;
        let num_instance = r1cs.num_instance();
        if num_instance > num_wires {
            return Err(CeremonyFileError::InconsistentHeader(
                "public wires exceed the wire count",
            )
            .into());
        }
        let num_constraints = r1cs.num_constraints();
        let n = r1cs.domain_size();
        if n > phase1.domain_size() {
            return Err(CeremonyError::DomainTooLarge {
                required: n,
                available: phase1.domain_size(),
            });
        }
        let domain = Radix2EvaluationDomain::<Fr>::new(n).ok_or(CeremonyError::DomainTooLarge {
            required: n,
            available: phase1.domain_size(),
        })?;

        let tau = lagrange_g1(&domain, &phase1.tau_g1[..n]);
        let alpha_tau = lagrange_g1(&domain, &phase1.alpha_tau_g1[..n]);
        let beta_tau = lagrange_g1(&domain, &phase1.beta_tau_g1[..n]);
        let tau_g2 = lagrange_g2(&domain, &phase1.tau_g2[..n]);

        let mut a = vec![G1Projective::zero(); num_wires];
        let mut b_g1 = vec![G1Projective::zero(); num_wires];
        let mut b_g2 = vec![G2Projective::zero(); num_wires];
        // βA + αB + C per wire.
        let mut combined = vec![G1Projective::zero(); num_wires];

        for (row, constraint) in r1cs.constraints.iter().enumerate() {
            for &(wire, coeff) in &constraint.a {
                let w = check_wire(wire, r1cs.num_wires)?;
                a[w] += tau[row] * coeff;
                combined[w] += beta_tau[row] * coeff;
            }
            for &(wire, coeff) in &constraint.b {
                let w = check_wire(wire, r1cs.num_wires)?;
                b_g1[w] += tau[row] * coeff;
                b_g2[w] += tau_g2[row] * coeff;
                combined[w] += alpha_tau[row] * coeff;
            }
            for &(wire, coeff) in &constraint.c {
                let w = check_wire(wire, r1cs.num_wires)?;
                combined[w] += tau[row] * coeff;
            }
        }
        // Input copy rows keep the instance polynomials linearly independent.
        for i in 0..num_instance {
            a[i] += tau[num_constraints + i];
            combined[i] += beta_tau[num_constraints + i];
        }

        let combined = G1Projective::normalize_batch(&combined);
        let vkk = combined[..num_instance].to_vec();
        let l = combined[num_instance..].to_vec();

        let z: Vec<G1Projective> = (0..n - 1)
            .into_par_iter()
            .map(|i| phase1.tau_g1[i + n].into_group() - phase1.tau_g1[i])
            .collect();
        let z = G1Projective::normalize_batch(&z);

        let origin = origin_digest(phase1, r1cs);
        let state = Phase2 {
            origin,
            contributions: 0,
            delta_g1: G1Affine::generator(),
            delta_g2: G2Affine::generator(),
            l,
            z,
            proof: ContributionProof::none(),
            hash: [0u8; 32],
        }
        .seal();
        let evals = Phase2Evaluations {
            origin,
            a: G1Projective::normalize_batch(&a),
            b_g1: G1Projective::normalize_batch(&b_g1),
            b_g2: G2Projective::normalize_batch(&b_g2),
            vkk,
        };

        tracing::info!(
            domain = n,
            constraints = num_constraints,
            wires = num_wires,
            hash = %short_hash(&state.hash),
            "phase 2 initialised"
        );
        Ok((state, evals))
    }
}

fn check_wire(wire: u32, wires: u32) -> Result<usize, CeremonyFileError> {
    if wire < wires {
        Ok(wire as usize)
    } else {
        Err(CeremonyFileError::WireOutOfRange { wire, wires })
    }
}
