//! # Consensus Circuit
//!
//! A fixed-shape R1CS over BN254 with [`SLOTS`] validator slots. The public
//! inputs, in order, are:
//!
//! | # | Input |
//! |---|---|
//! | 0 | trusted validator-set root |
//! | 1 | untrusted validator-set root |
//! | 2 | vote sign digest |
//! | 3 | signed voting power of the untrusted commit |
//! | 4 | total voting power of the untrusted commit |
//!
//! Digests enter the field by little-endian reduction modulo `r`.
//!
//! Per slot the witness holds the signer bit, the validator's power and
//! their product. The circuit constrains every bit to be boolean, every
//! product to be `bit · power`, and inputs 3 and 4 to be the sums of the
//! products and of the powers. Unused slots carry zero power. The roots
//! and the vote digest are bound by the verifying key's input terms only;
//! signature and Merkle gadgets are not part of this circuit.
//!
//! The constraint system is identical for every request, so one set of
//! keys proves them all.

use ark_bn254::Fr;
use ark_ff::{PrimeField, Zero};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable};

use tessera_ceremony::codec;
use tessera_core::{validator_set_root, HexBytes, ProveRequest, MAX_VALIDATORS};

use crate::traits::ProofError;

/// Validator slots in the circuit.
pub const SLOTS: usize = MAX_VALIDATORS;

/// Public inputs, excluding the constant one.
pub const NUM_PUBLIC_INPUTS: usize = 5;

/// Map a 32-byte digest into the scalar field.
pub fn digest_to_field(digest: &[u8; 32]) -> Fr {
    Fr::from_le_bytes_mod_order(digest)
}

/// Encode a scalar as the 32-byte little-endian public input format.
pub fn encode_input(value: &Fr) -> HexBytes {
    let mut out = Vec::with_capacity(codec::FIELD_SIZE);
    codec::encode_fr(value, &mut out);
    HexBytes(out)
}

/// Everything the prover needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusWitness {
    /// Root of the trusted validator set.
    pub trusted_root: [u8; 32],
    /// Root of the untrusted validator set.
    pub untrusted_root: [u8; 32],
    /// Digest of the vote's canonical sign bytes.
    pub vote_digest: [u8; 32],
    /// Signer bits, padded to [`SLOTS`].
    pub bits: Vec<bool>,
    /// Voting powers, padded to [`SLOTS`] with zeros.
    pub powers: Vec<u64>,
}

impl ConsensusWitness {
    /// Validate `request` and lay it out over the circuit's slots.
    pub fn from_request(request: &ProveRequest) -> Result<Self, ProofError> {
        request.validate()?;
        let commit = &request.untrusted_commit;
        let mut bits = vec![false; SLOTS];
        let mut powers = vec![0u64; SLOTS];
        for (slot, validator) in commit.validators.iter().enumerate() {
            bits[slot] = commit.signed(slot);
            powers[slot] = validator.voting_power;
        }
        Ok(Self {
            trusted_root: validator_set_root(&request.trusted_commit.validators),
            untrusted_root: validator_set_root(&commit.validators),
            vote_digest: request.vote.sign_digest()?,
            bits,
            powers,
        })
    }

    /// Sum of the powers of the signing slots.
    pub fn signed_power(&self) -> Fr {
        self.bits
            .iter()
            .zip(&self.powers)
            .filter(|(bit, _)| **bit)
            .map(|(_, power)| Fr::from(*power))
            .sum()
    }

    /// Sum of all slot powers.
    pub fn total_power(&self) -> Fr {
        self.powers.iter().map(|p| Fr::from(*p)).sum()
    }

    /// The public inputs in circuit order.
    pub fn public_inputs(&self) -> [Fr; NUM_PUBLIC_INPUTS] {
        [
            digest_to_field(&self.trusted_root),
            digest_to_field(&self.untrusted_root),
            digest_to_field(&self.vote_digest),
            self.signed_power(),
            self.total_power(),
        ]
    }
}

/// The consensus circuit; blank for setup, with a witness for proving.
#[derive(Debug, Clone, Default)]
pub struct ConsensusCircuit {
    witness: Option<ConsensusWitness>,
    inputs: Option<[Fr; NUM_PUBLIC_INPUTS]>,
}

impl ConsensusCircuit {
    /// The circuit without assignments, for compilation and key generation.
    pub fn blank() -> Self {
        Self::default()
    }

    /// The circuit assigned for `witness`.
    pub fn with_witness(witness: ConsensusWitness) -> Self {
        Self {
            inputs: Some(witness.public_inputs()),
            witness: Some(witness),
        }
    }
}

impl ConstraintSynthesizer<Fr> for ConsensusCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let witness = self.witness.as_ref();
        let inputs = self.inputs;
        let input = |i: usize| inputs.map(|v| v[i]).ok_or(SynthesisError::AssignmentMissing);

        let _trusted_root = cs.new_input_variable(|| input(0))?;
        let _untrusted_root = cs.new_input_variable(|| input(1))?;
        let _vote_digest = cs.new_input_variable(|| input(2))?;
        let signed_power = cs.new_input_variable(|| input(3))?;
        let total_power = cs.new_input_variable(|| input(4))?;

        let mut signed_sum = lc!();
        let mut total_sum = lc!();
        for slot in 0..SLOTS {
            let bit_val = witness.map(|w| w.bits[slot]);
            let power_val = witness.map(|w| Fr::from(w.powers[slot]));
            let weighted_val = bit_val
                .zip(power_val)
                .map(|(bit, power)| if bit { power } else { Fr::zero() });

            let bit = cs.new_witness_variable(|| {
                bit_val
                    .map(|b| Fr::from(u64::from(b)))
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
            let power =
                cs.new_witness_variable(|| power_val.ok_or(SynthesisError::AssignmentMissing))?;
            let weighted =
                cs.new_witness_variable(|| weighted_val.ok_or(SynthesisError::AssignmentMissing))?;

            // bit · (1 - bit) = 0
            cs.enforce_constraint(lc!() + bit, lc!() + Variable::One - bit, lc!())?;
            cs.enforce_constraint(lc!() + bit, lc!() + power, lc!() + weighted)?;

            signed_sum = signed_sum + weighted;
            total_sum = total_sum + power;
        }
        cs.enforce_constraint(signed_sum, lc!() + Variable::One, lc!() + signed_power)?;
        cs.enforce_constraint(total_sum, lc!() + Variable::One, lc!() + total_power)?;
        Ok(())
    }
}
