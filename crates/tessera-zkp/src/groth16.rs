//! # Groth16 Backend
//!
//! Groth16 over BN254 via `ark-groth16`, proving the
//! [consensus circuit](crate::circuit).
//!
//! ## Properties
//!
//! - **Proof size:** 128 bytes compressed (two G1 points, one G2 point).
//! - **Verification:** three pairings against a prepared verifying key.
//! - **Trusted setup:** circuit-specific. Production keys come from a
//!   `tessera-ceremony` Phase 2 run; `compile_or_load` falls back to a
//!   single-party setup only when no artifacts exist at all.
//!
//! ## Artifacts
//!
//! Three files, see [`ArtifactPaths`]: the compiled circuit (circom `r1cs`
//! encoding), the proving key and the verifying key. Loading checks that the
//! stored circuit is the one this binary compiles and that the keys fit it.

use std::path::{Path, PathBuf};

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::{CryptoRng, RngCore};

use tessera_ceremony::{codec, R1cs};
use tessera_core::{HexBytes, ProveRequest, ProveResponse};

use crate::circuit::{encode_input, ConsensusCircuit, ConsensusWitness, NUM_PUBLIC_INPUTS};
use crate::keys;
use crate::policy::ProofBackend;
use crate::traits::{BackendError, BackendStats, ProofError, ProvingBackend, VerifyError};

/// Where the circuit and its keys live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Compiled circuit.
    pub r1cs: PathBuf,
    /// Groth16 proving key.
    pub proving_key: PathBuf,
    /// Groth16 verifying key.
    pub verifying_key: PathBuf,
}

impl ArtifactPaths {
    /// `consensus.r1cs`, `consensus.pk` and `consensus.vk` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            r1cs: dir.join("consensus.r1cs"),
            proving_key: dir.join("consensus.pk"),
            verifying_key: dir.join("consensus.vk"),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.r1cs, &self.proving_key, &self.verifying_key]
    }

    /// True when none of the three artifacts exist yet.
    pub fn none_exist(&self) -> bool {
        self.all().iter().all(|p| !p.exists())
    }
}

/// Groth16 prover and verifier for the consensus circuit.
pub struct Groth16Backend {
    r1cs: R1cs,
    pk: ProvingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
    vk_bytes: Vec<u8>,
    pk_size: usize,
}

impl std::fmt::Debug for Groth16Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Groth16Backend")
            .field("constraints", &self.r1cs.num_constraints())
            .field("proving_key_bytes", &self.pk_size)
            .field("verifying_key_bytes", &self.vk_bytes.len())
            .finish()
    }
}

/// Compile the consensus circuit.
pub fn compile() -> Result<R1cs, BackendError> {
    Ok(R1cs::from_circuit(ConsensusCircuit::blank())?)
}

impl Groth16Backend {
    /// `compile_or_load`: compile the circuit and load its keys from
    /// `paths`, or, when none of the three artifacts exist, run a
    /// single-party setup and persist the result there.
    ///
    /// A partial artifact set is an error; nothing is regenerated over it.
    pub fn compile_or_load<R: RngCore + CryptoRng>(
        paths: &ArtifactPaths,
        rng: &mut R,
    ) -> Result<Self, BackendError> {
        let r1cs = compile()?;
        if paths.none_exist() {
            tracing::warn!(
                r1cs = %paths.r1cs.display(),
                "no circuit artifacts found; generating single-party development keys"
            );
            let backend = Self::setup(r1cs, rng)?;
            backend.persist(paths)?;
            return Ok(backend);
        }
        if let Some(missing) = paths.all().iter().find(|p| !p.exists()) {
            return Err(BackendError::IncompleteArtifacts {
                missing: missing.to_path_buf(),
            });
        }

        let stored = R1cs::open(&paths.r1cs)?;
        if stored.digest() != r1cs.digest() {
            return Err(BackendError::CircuitMismatch {
                path: paths.r1cs.clone(),
            });
        }
        let pk = keys::load_proving_key(&paths.proving_key)?;
        let vk = keys::load_verifying_key(&paths.verifying_key)?;
        if pk.vk != vk {
            return Err(BackendError::KeyMismatch(
                "verifying key file differs from the proving key's".to_string(),
            ));
        }
        let backend = Self::from_keys(r1cs, pk)?;
        tracing::info!(
            constraints = backend.r1cs.num_constraints(),
            proving_key_bytes = backend.pk_size,
            "loaded groth16 artifacts"
        );
        Ok(backend)
    }

    /// Single-party setup for `r1cs`. The toxic waste lives in this
    /// process's memory, so the keys are for development only.
    pub fn setup<R: RngCore + CryptoRng>(r1cs: R1cs, rng: &mut R) -> Result<Self, BackendError> {
        let (pk, _) = Groth16::<Bn254>::circuit_specific_setup(ConsensusCircuit::blank(), rng)
            .map_err(|e| BackendError::Setup(e.to_string()))?;
        Self::from_keys(r1cs, pk)
    }

    /// Wrap existing keys, checking that they fit `r1cs`.
    pub fn from_keys(r1cs: R1cs, pk: ProvingKey<Bn254>) -> Result<Self, BackendError> {
        let shape = [
            ("instance query", pk.vk.gamma_abc_g1.len(), r1cs.num_instance()),
            ("A query", pk.a_query.len(), r1cs.num_wires as usize),
            ("B query", pk.b_g2_query.len(), r1cs.num_wires as usize),
            ("L query", pk.l_query.len(), r1cs.num_witness()),
            ("H query", pk.h_query.len(), r1cs.domain_size() - 1),
        ];
        for (what, actual, expected) in shape {
            if actual != expected {
                return Err(BackendError::KeyMismatch(format!(
                    "{what} has {actual} entries, circuit needs {expected}"
                )));
            }
        }
        let vk_bytes = keys::to_bytes(&pk.vk);
        let pk_size = pk.uncompressed_size();
        let pvk = Groth16::<Bn254>::process_vk(&pk.vk)
            .map_err(|e| BackendError::Setup(e.to_string()))?;
        Ok(Self {
            r1cs,
            pk,
            pvk,
            vk_bytes,
            pk_size,
        })
    }

    /// Write the circuit and both keys to `paths`.
    pub fn persist(&self, paths: &ArtifactPaths) -> Result<(), BackendError> {
        let mut file = std::fs::File::create(&paths.r1cs).map_err(keys::io_err(&paths.r1cs))?;
        self.r1cs
            .write_to(&mut file)
            .map_err(keys::io_err(&paths.r1cs))?;
        keys::save_proving_key(&paths.proving_key, &self.pk)?;
        keys::save_verifying_key(&paths.verifying_key, &self.pk.vk)
    }

    /// The verifying key.
    pub fn vk(&self) -> &VerifyingKey<Bn254> {
        &self.pk.vk
    }

    /// The compiled circuit.
    pub fn r1cs(&self) -> &R1cs {
        &self.r1cs
    }
}

fn decode_inputs(public_inputs: &[HexBytes]) -> Result<Vec<Fr>, VerifyError> {
    if public_inputs.len() != NUM_PUBLIC_INPUTS {
        return Err(VerifyError::WrongInputCount {
            expected: NUM_PUBLIC_INPUTS,
            actual: public_inputs.len(),
        });
    }
    public_inputs
        .iter()
        .enumerate()
        .map(|(index, bytes)| {
            if bytes.len() != codec::FIELD_SIZE {
                return Err(VerifyError::MalformedPublicInput { index });
            }
            codec::decode_fr(bytes.as_slice()).ok_or(VerifyError::MalformedPublicInput { index })
        })
        .collect()
}

impl ProvingBackend for Groth16Backend {
    fn kind(&self) -> ProofBackend {
        ProofBackend::Groth16
    }

    fn prove(&self, request: &ProveRequest) -> Result<ProveResponse, ProofError> {
        let witness = ConsensusWitness::from_request(request)?;
        let inputs = witness.public_inputs();
        let response_roots = (witness.trusted_root, witness.untrusted_root);

        let proof = Groth16::<Bn254>::prove(
            &self.pk,
            ConsensusCircuit::with_witness(witness),
            &mut rand::thread_rng(),
        )
        .map_err(|e| ProofError::GenerationFailed(e.to_string()))?;

        let mut bytes = Vec::with_capacity(proof.compressed_size());
        proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::GenerationFailed(e.to_string()))?;

        Ok(ProveResponse {
            proof: HexBytes(bytes),
            public_inputs: inputs.iter().map(encode_input).collect(),
            trusted_validator_set_root: HexBytes(response_roots.0.to_vec()),
            untrusted_validator_set_root: HexBytes(response_roots.1.to_vec()),
        })
    }

    fn verify(&self, proof: &[u8], public_inputs: &[HexBytes]) -> Result<bool, VerifyError> {
        let proof = Proof::<Bn254>::deserialize_compressed(proof)
            .map_err(|e| VerifyError::MalformedProof(e.to_string()))?;
        let inputs = decode_inputs(public_inputs)?;
        Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, &inputs, &proof)
            .map_err(|e| VerifyError::VerificationFailed(e.to_string()))
    }

    fn verifying_key(&self) -> Vec<u8> {
        self.vk_bytes.clone()
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            backend: ProofBackend::Groth16,
            constraints: self.r1cs.num_constraints(),
            public_inputs: self.r1cs.num_instance() - 1,
            witness_variables: self.r1cs.num_witness(),
            proving_key_bytes: self.pk_size,
            verifying_key_bytes: self.vk_bytes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::circuit::tests::request;

    fn backend() -> &'static Groth16Backend {
        static BACKEND: OnceLock<Groth16Backend> = OnceLock::new();
        BACKEND.get_or_init(|| {
            Groth16Backend::setup(compile().unwrap(), &mut StdRng::seed_from_u64(5)).unwrap()
        })
    }

    #[test]
    fn prove_then_verify() {
        let backend = backend();
        let response = backend.prove(&request(1)).unwrap();
        assert_eq!(response.proof.len(), 128);
        assert_eq!(response.public_inputs.len(), NUM_PUBLIC_INPUTS);
        assert!(backend
            .verify(response.proof.as_slice(), &response.public_inputs)
            .unwrap());
    }

    #[test]
    fn proof_does_not_verify_against_other_inputs() {
        let backend = backend();
        let response = backend.prove(&request(1)).unwrap();
        let mut inputs = response.public_inputs.clone();
        inputs[3] = encode_input(&Fr::from(1_000u64));
        assert!(!backend.verify(response.proof.as_slice(), &inputs).unwrap());
    }

    #[test]
    fn wrong_input_count_is_an_error() {
        let backend = backend();
        let response = backend.prove(&request(2)).unwrap();
        assert!(matches!(
            backend.verify(response.proof.as_slice(), &response.public_inputs[..4]),
            Err(VerifyError::WrongInputCount { expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn non_canonical_input_is_rejected() {
        let backend = backend();
        let response = backend.prove(&request(3)).unwrap();
        let mut inputs = response.public_inputs.clone();
        inputs[0] = HexBytes(vec![0xff; 32]);
        assert!(matches!(
            backend.verify(response.proof.as_slice(), &inputs),
            Err(VerifyError::MalformedPublicInput { index: 0 })
        ));
    }

    #[test]
    fn garbage_proof_is_malformed() {
        let inputs = vec![encode_input(&Fr::from(0u64)); NUM_PUBLIC_INPUTS];
        assert!(matches!(
            backend().verify(&[1, 2, 3], &inputs),
            Err(VerifyError::MalformedProof(_))
        ));
    }

    #[test]
    fn stats_describe_the_circuit() {
        let stats = backend().stats();
        assert_eq!(stats.backend, ProofBackend::Groth16);
        assert_eq!(stats.public_inputs, NUM_PUBLIC_INPUTS);
        assert_eq!(stats.constraints, 258);
        assert_eq!(stats.verifying_key_bytes, backend().verifying_key().len());
        assert!(stats.proving_key_bytes > stats.verifying_key_bytes);
    }

    #[test]
    fn compile_or_load_generates_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let first = Groth16Backend::compile_or_load(&paths, &mut StdRng::seed_from_u64(8)).unwrap();
        assert!(paths.all().iter().all(|p| p.exists()));

        let second = Groth16Backend::compile_or_load(&paths, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(first.vk(), second.vk());
        let response = first.prove(&request(4)).unwrap();
        assert!(second
            .verify(response.proof.as_slice(), &response.public_inputs)
            .unwrap());
    }

    #[test]
    fn partial_artifacts_are_not_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        Groth16Backend::compile_or_load(&paths, &mut StdRng::seed_from_u64(8)).unwrap();
        std::fs::remove_file(&paths.verifying_key).unwrap();
        let err = Groth16Backend::compile_or_load(&paths, &mut StdRng::seed_from_u64(8)).unwrap_err();
        assert!(matches!(err, BackendError::IncompleteArtifacts { missing } if missing == paths.verifying_key));
    }

    #[test]
    fn stale_circuit_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        Groth16Backend::compile_or_load(&paths, &mut StdRng::seed_from_u64(8)).unwrap();
        let mut stale = compile().unwrap();
        stale.constraints.pop();
        let mut bytes = Vec::new();
        stale.write_to(&mut bytes).unwrap();
        std::fs::write(&paths.r1cs, bytes).unwrap();
        assert!(matches!(
            Groth16Backend::compile_or_load(&paths, &mut StdRng::seed_from_u64(8)),
            Err(BackendError::CircuitMismatch { .. })
        ));
    }

    #[test]
    fn keys_for_another_circuit_are_rejected() {
        let mut pk = backend().pk.clone();
        pk.l_query.pop();
        assert!(matches!(
            Groth16Backend::from_keys(compile().unwrap(), pk),
            Err(BackendError::KeyMismatch(_))
        ));
    }
}
