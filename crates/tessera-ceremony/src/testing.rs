//! Shared fixtures for unit tests.

use ark_bn254::Fr;
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::phase1::Phase1;
use crate::ptau::Ptau;

/// Proves knowledge of `x` with `x³ + x + 5 = out`, `out` public.
#[derive(Clone)]
pub struct CubeCircuit {
    pub x: Option<Fr>,
}

impl CubeCircuit {
    pub fn blank() -> Self {
        Self { x: None }
    }

    pub fn with_witness(x: u64) -> (Self, Fr) {
        let x = Fr::from(x);
        (Self { x: Some(x) }, x * x * x + x + Fr::from(5u64))
    }
}

impl ConstraintSynthesizer<Fr> for CubeCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let x_val = self.x;
        let x2_val = x_val.map(|x| x * x);
        let x3_val = x2_val.zip(x_val).map(|(x2, x)| x2 * x);
        let out_val = x3_val.zip(x_val).map(|(x3, x)| x3 + x + Fr::from(5u64));

        let out = cs.new_input_variable(|| out_val.ok_or(SynthesisError::AssignmentMissing))?;
        let x = cs.new_witness_variable(|| x_val.ok_or(SynthesisError::AssignmentMissing))?;
        let x2 = cs.new_witness_variable(|| x2_val.ok_or(SynthesisError::AssignmentMissing))?;
        let x3 = cs.new_witness_variable(|| x3_val.ok_or(SynthesisError::AssignmentMissing))?;

        cs.enforce_constraint(lc!() + x, lc!() + x, lc!() + x2)?;
        cs.enforce_constraint(lc!() + x2, lc!() + x, lc!() + x3)?;
        cs.enforce_constraint(
            lc!() + x3 + x + (Fr::from(5u64), Variable::One),
            lc!() + Variable::One,
            lc!() + out,
        )?;
        Ok(())
    }
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn dev_ptau(power: u32) -> Ptau {
    Ptau::insecure_dev(power, &mut rng(0xC0FFEE)).unwrap()
}

pub fn dev_phase1(power: u32) -> Phase1 {
    Phase1::from_ptau(&dev_ptau(power)).unwrap()
}
