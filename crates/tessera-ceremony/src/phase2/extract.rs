//! Key extraction.

use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};

use super::{origin_digest, Phase2, Phase2Evaluations};
use crate::error::{CeremonyError, CeremonyFileError};
use crate::phase1::{short_hash, Phase1};
use crate::r1cs::R1cs;

fn expect_len(what: &'static str, actual: usize, expected: usize) -> Result<(), CeremonyError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CeremonyError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// `phase2_extract`: assemble the Groth16 keys from the final Phase 2 state.
///
/// `phase2` and `evals` must both have been initialised from exactly `r1cs`
/// and `phase1`. γ is fixed to one, so `gamma_g2` is the G2 generator and the
/// instance query is the raw `VKK` evaluations.
pub fn extract(
    r1cs: &R1cs,
    phase1: &Phase1,
    phase2: &Phase2,
    evals: &Phase2Evaluations,
) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), CeremonyError> {
    let origin = origin_digest(phase1, r1cs);
    if phase2.origin != origin {
        return Err(CeremonyError::StageMismatch { artifact: "phase 2 state" });
    }
    if evals.origin != origin {
        return Err(CeremonyError::StageMismatch { artifact: "phase 2 evaluations" });
    }
    if phase2.hash != phase2.compute_hash() {
        return Err(CeremonyFileError::HashMismatch { artifact: "phase 2" }.into());
    }

    let wires = r1cs.num_wires as usize;
    expect_len("A", evals.a.len(), wires)?;
    expect_len("B in G1", evals.b_g1.len(), wires)?;
    expect_len("B in G2", evals.b_g2.len(), wires)?;
    expect_len("VKK", evals.vkk.len(), r1cs.num_instance())?;
    expect_len("L", phase2.l.len(), r1cs.num_witness())?;
    expect_len("Z", phase2.z.len(), r1cs.domain_size() - 1)?;

    let vk = VerifyingKey::<Bn254> {
        alpha_g1: phase1.alpha_tau_g1[0],
        beta_g2: phase1.beta_g2,
        gamma_g2: phase1.tau_g2[0],
        delta_g2: phase2.delta_g2,
        gamma_abc_g1: evals.vkk.clone(),
    };
    let pk = ProvingKey::<Bn254> {
        vk: vk.clone(),
        beta_g1: phase1.beta_tau_g1[0],
        delta_g1: phase2.delta_g1,
        a_query: evals.a.clone(),
        b_g1_query: evals.b_g1.clone(),
        b_g2_query: evals.b_g2.clone(),
        h_query: phase2.z.clone(),
        l_query: phase2.l.clone(),
    };

    tracing::info!(
        contributions = phase2.contributions,
        public_inputs = r1cs.num_instance() - 1,
        hash = %short_hash(&phase2.hash),
        "groth16 keys extracted"
    );
    Ok((pk, vk))
}

#[cfg(test)]
mod tests {
    use ark_bn254::{Fr, G1Affine};
    use ark_ec::AffineRepr;
    use ark_groth16::Groth16;
    use ark_snark::SNARK;

    use super::*;
    use crate::testing::{dev_phase1, rng, CubeCircuit};

    #[test]
    fn extracted_keys_prove_and_verify() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let phase1 = dev_phase1(3);
        let (s0, evals) = Phase2::init(&r1cs, &phase1).unwrap();
        let mut rng = rng(10);
        let s1 = s0.contribute(&mut rng).unwrap();
        let s2 = s1.contribute(&mut rng).unwrap();
        Phase2::verify(&s0, &s1).unwrap();
        Phase2::verify(&s1, &s2).unwrap();

        let (pk, vk) = extract(&r1cs, &phase1, &s2, &evals).unwrap();
        assert_eq!(pk.vk, vk);
        assert_eq!(vk.gamma_g2, ark_bn254::G2Affine::generator());

        let (circuit, out) = CubeCircuit::with_witness(3);
        assert_eq!(out, Fr::from(35u64));
        let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng).unwrap();
        assert!(Groth16::<Bn254>::verify(&vk, &[out], &proof).unwrap());
        assert!(!Groth16::<Bn254>::verify(&vk, &[out + Fr::from(1u64)], &proof).unwrap());
    }

    #[test]
    fn keys_from_the_initial_state_also_work() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let phase1 = dev_phase1(4);
        let (s0, evals) = Phase2::init(&r1cs, &phase1).unwrap();
        let (pk, vk) = extract(&r1cs, &phase1, &s0, &evals).unwrap();
        let (circuit, out) = CubeCircuit::with_witness(9);
        let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng(11)).unwrap();
        assert!(Groth16::<Bn254>::verify(&vk, &[out], &proof).unwrap());
    }

    #[test]
    fn mismatched_phase1_is_a_stage_mismatch() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let (s0, evals) = Phase2::init(&r1cs, &dev_phase1(3)).unwrap();
        let err = extract(&r1cs, &dev_phase1(4), &s0, &evals).unwrap_err();
        assert!(matches!(err, CeremonyError::StageMismatch { artifact: "phase 2 state" }));
    }

    #[test]
    fn evaluations_from_another_circuit_are_rejected() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let phase1 = dev_phase1(3);
        let (s0, mut evals) = Phase2::init(&r1cs, &phase1).unwrap();
        evals.origin[0] ^= 1;
        assert!(matches!(
            extract(&r1cs, &phase1, &s0, &evals).unwrap_err(),
            CeremonyError::StageMismatch { artifact: "phase 2 evaluations" }
        ));
    }

    #[test]
    fn truncated_evaluations_are_rejected() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let phase1 = dev_phase1(3);
        let (s0, mut evals) = Phase2::init(&r1cs, &phase1).unwrap();
        evals.a.push(G1Affine::generator());
        assert!(matches!(
            extract(&r1cs, &phase1, &s0, &evals).unwrap_err(),
            CeremonyError::ShapeMismatch { what: "A", .. }
        ));
    }
}
