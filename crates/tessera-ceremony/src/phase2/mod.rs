//! # Phase 2 (circuit-specific) MPC
//!
//! Pipeline:
//!
//! 1. [`Phase2::init`] evaluates the circuit's QAP over the Phase 1 powers in
//!    the Lagrange basis, producing the initial [`Phase2`] state (δ = 1) and
//!    the δ-independent [`Phase2Evaluations`].
//! 2. [`Phase2::contribute`] multiplies δ by a fresh secret and divides the
//!    `L` and `Z` queries by it, attaching a proof of knowledge of the secret
//!    bound to the previous state's hash.
//! 3. [`Phase2::verify`] checks a contribution against its predecessor with
//!    pairing equations and random linear combinations.
//! 4. [`extract`] assembles the Groth16 proving and verifying keys.
//!
//! Every state records an origin digest binding it to the exact
//! `(phase1, r1cs)` pair it was initialised from; mixing artifacts from
//! different circuits fails with [`CeremonyError::StageMismatch`] or
//! [`VerificationError::OriginMismatch`].
//!
//! [`VerificationError::OriginMismatch`]: crate::error::VerificationError::OriginMismatch

mod contribute;
mod extract;
mod setup;

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use ark_bn254::{G1Affine, G2Affine};
use sha2::{Digest, Sha256};

use crate::binfile::{SectionReader, SectionWriter};
use crate::codec::{self, Repr, G1_SIZE, G2_SIZE};
use crate::error::{CeremonyError, CeremonyFileError};
use crate::phase1::{read_hash, Phase1};
use crate::r1cs::R1cs;

pub use contribute::{hash_to_g2, same_ratio};
pub use extract::extract;

/// Phase 2 state magic.
pub const PHASE2_MAGIC: &[u8; 4] = b"tph2";
/// Evaluations magic.
pub const EVALUATIONS_MAGIC: &[u8; 4] = b"tevl";

mod section {
    pub const HEADER: u32 = 1;
    pub const DELTA_G1: u32 = 2;
    pub const DELTA_G2: u32 = 3;
    pub const L: u32 = 4;
    pub const Z: u32 = 5;
    pub const PROOF: u32 = 6;
    pub const HASH: u32 = 7;
}

mod eval_section {
    pub const ORIGIN: u32 = 1;
    pub const A: u32 = 2;
    pub const B_G1: u32 = 3;
    pub const B_G2: u32 = 4;
    pub const VKK: u32 = 5;
    pub const HASH: u32 = 6;
}

/// Proof that a contributor knows the secret `x` they applied.
///
/// `sxg = x · sg` for a random `sg`, and `xr = x · r` where
/// `r = hash_to_g2(sg, sxg, previous hash)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionProof {
    /// `[s]₁`.
    pub sg: G1Affine,
    /// `[s·x]₁`.
    pub sxg: G1Affine,
    /// `x · r` in G2.
    pub xr: G2Affine,
}

impl ContributionProof {
    /// The placeholder carried by the initial state.
    pub fn none() -> Self {
        Self {
            sg: G1Affine::identity(),
            sxg: G1Affine::identity(),
            xr: G2Affine::identity(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * G1_SIZE + G2_SIZE);
        codec::encode_g1(&self.sg, Repr::Canonical, &mut out);
        codec::encode_g1(&self.sxg, Repr::Canonical, &mut out);
        codec::encode_g2(&self.xr, Repr::Canonical, &mut out);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, CeremonyFileError> {
        let tag = section::PROOF;
        Ok(Self {
            sg: codec::decode_g1(&bytes[..G1_SIZE], Repr::Canonical).map_err(|e| e.at(tag, 0))?,
            sxg: codec::decode_g1(&bytes[G1_SIZE..2 * G1_SIZE], Repr::Canonical)
                .map_err(|e| e.at(tag, 1))?,
            xr: codec::decode_g2(&bytes[2 * G1_SIZE..], Repr::Canonical)
                .map_err(|e| e.at(tag, 2))?,
        })
    }
}

/// The δ-dependent part of the Groth16 parameters, updated by each
/// contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase2 {
    /// Digest of the `(phase1, r1cs)` pair this state derives from.
    pub origin: [u8; 32],
    /// Contributions applied so far.
    pub contributions: u32,
    /// `[δ]₁`.
    pub delta_g1: G1Affine,
    /// `[δ]₂`.
    pub delta_g2: G2Affine,
    /// `[(βA_i(τ) + αB_i(τ) + C_i(τ)) / δ]₁` for each witness wire.
    pub l: Vec<G1Affine>,
    /// `[τ^i (τ^n - 1) / δ]₁` for `i < n - 1`.
    pub z: Vec<G1Affine>,
    /// Proof for the latest contribution.
    pub proof: ContributionProof,
    /// SHA-256 of the encoded state, excluding this field.
    pub hash: [u8; 32],
}

/// The δ-independent part of the Groth16 parameters, fixed at init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase2Evaluations {
    /// Digest of the `(phase1, r1cs)` pair these derive from.
    pub origin: [u8; 32],
    /// `[A_i(τ)]₁` for every wire.
    pub a: Vec<G1Affine>,
    /// `[B_i(τ)]₁` for every wire.
    pub b_g1: Vec<G1Affine>,
    /// `[B_i(τ)]₂` for every wire.
    pub b_g2: Vec<G2Affine>,
    /// `[βA_i(τ) + αB_i(τ) + C_i(τ)]₁` for each instance wire.
    pub vkk: Vec<G1Affine>,
}

/// Digest binding Phase 2 artifacts to their inputs.
pub fn origin_digest(phase1: &Phase1, r1cs: &R1cs) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"tessera/phase2/origin");
    hasher.update(phase1.hash);
    hasher.update(r1cs.digest());
    hasher.finalize().into()
}

impl Phase2 {
    fn body(&self) -> SectionWriter {
        let mut header = self.origin.to_vec();
        header.extend_from_slice(&self.contributions.to_le_bytes());
        let mut w = SectionWriter::new(PHASE2_MAGIC);
        w.section(section::HEADER, header)
            .section(
                section::DELTA_G1,
                codec::encode_g1_slice(std::slice::from_ref(&self.delta_g1), Repr::Canonical),
            )
            .section(
                section::DELTA_G2,
                codec::encode_g2_slice(std::slice::from_ref(&self.delta_g2), Repr::Canonical),
            )
            .section(section::L, codec::encode_g1_vec(&self.l))
            .section(section::Z, codec::encode_g1_vec(&self.z))
            .section(section::PROOF, self.proof.encode());
        w
    }

    /// SHA-256 over the encoded state, excluding the hash section.
    pub fn compute_hash(&self) -> [u8; 32] {
        Sha256::digest(self.body().to_bytes()).into()
    }

    pub(crate) fn seal(mut self) -> Self {
        self.hash = self.compute_hash();
        self
    }

    /// Encode the state, including its stored hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = self.body();
        w.section(section::HASH, self.hash.to_vec());
        w.to_bytes()
    }

    /// Write the state to `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.to_bytes())
    }

    /// Decode a state and check its stored hash.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CeremonyFileError> {
        let mut file = SectionReader::open(reader, PHASE2_MAGIC)?;
        file.require_version()?;

        let header = file.read_section_sized(section::HEADER, 36)?;
        let mut origin = [0u8; 32];
        origin.copy_from_slice(&header[..32]);
        let contributions = u32::from_le_bytes([header[32], header[33], header[34], header[35]]);

        let delta_g1 = read_g1_point(&mut file, section::DELTA_G1)?;
        let delta_g2 = read_g2_point(&mut file, section::DELTA_G2)?;
        let l = codec::decode_g1_vec(&file.read_section(section::L)?, section::L)?;
        let z = codec::decode_g1_vec(&file.read_section(section::Z)?, section::Z)?;
        let proof = ContributionProof::decode(
            &file.read_section_sized(section::PROOF, (2 * G1_SIZE + G2_SIZE) as u64)?,
        )?;
        let hash = read_hash(&mut file, section::HASH)?;

        let state = Self {
            origin,
            contributions,
            delta_g1,
            delta_g2,
            l,
            z,
            proof,
            hash,
        };
        if state.compute_hash() != hash {
            return Err(CeremonyFileError::HashMismatch { artifact: "phase 2" });
        }
        Ok(state)
    }

    /// Decode a state from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CeremonyFileError> {
        Self::read(std::io::Cursor::new(bytes))
    }

    /// Read a state from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CeremonyError> {
        let file = File::open(path).map_err(CeremonyFileError::from)?;
        Ok(Self::read(BufReader::new(file))?)
    }
}

impl Phase2Evaluations {
    fn body(&self) -> SectionWriter {
        let mut w = SectionWriter::new(EVALUATIONS_MAGIC);
        w.section(eval_section::ORIGIN, self.origin.to_vec())
            .section(eval_section::A, codec::encode_g1_vec(&self.a))
            .section(eval_section::B_G1, codec::encode_g1_vec(&self.b_g1))
            .section(eval_section::B_G2, codec::encode_g2_vec(&self.b_g2))
            .section(eval_section::VKK, codec::encode_g1_vec(&self.vkk));
        w
    }

    /// SHA-256 over the encoded evaluations.
    pub fn compute_hash(&self) -> [u8; 32] {
        Sha256::digest(self.body().to_bytes()).into()
    }

    /// Encode, appending the content hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = self.body();
        w.section(eval_section::HASH, self.compute_hash().to_vec());
        w.to_bytes()
    }

    /// Write the evaluations to `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.to_bytes())
    }

    /// Decode evaluations and check the content hash.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CeremonyFileError> {
        let mut file = SectionReader::open(reader, EVALUATIONS_MAGIC)?;
        file.require_version()?;

        let origin = read_hash(&mut file, eval_section::ORIGIN)?;
        let a = codec::decode_g1_vec(&file.read_section(eval_section::A)?, eval_section::A)?;
        let b_g1 = codec::decode_g1_vec(&file.read_section(eval_section::B_G1)?, eval_section::B_G1)?;
        let b_g2 = codec::decode_g2_vec(&file.read_section(eval_section::B_G2)?, eval_section::B_G2)?;
        let vkk = codec::decode_g1_vec(&file.read_section(eval_section::VKK)?, eval_section::VKK)?;
        let hash = read_hash(&mut file, eval_section::HASH)?;

        let evals = Self {
            origin,
            a,
            b_g1,
            b_g2,
            vkk,
        };
        if evals.compute_hash() != hash {
            return Err(CeremonyFileError::HashMismatch { artifact: "phase 2 evaluations" });
        }
        Ok(evals)
    }

    /// Decode evaluations from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CeremonyFileError> {
        Self::read(std::io::Cursor::new(bytes))
    }

    /// Read evaluations from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CeremonyError> {
        let file = File::open(path).map_err(CeremonyFileError::from)?;
        Ok(Self::read(BufReader::new(file))?)
    }
}

fn read_g1_point<R: Read + Seek>(
    file: &mut SectionReader<R>,
    tag: u32,
) -> Result<G1Affine, CeremonyFileError> {
    let bytes = file.read_section_sized(tag, G1_SIZE as u64)?;
    codec::decode_g1(&bytes, Repr::Canonical).map_err(|e| e.at(tag, 0))
}

fn read_g2_point<R: Read + Seek>(
    file: &mut SectionReader<R>,
    tag: u32,
) -> Result<G2Affine, CeremonyFileError> {
    let bytes = file.read_section_sized(tag, G2_SIZE as u64)?;
    codec::decode_g2(&bytes, Repr::Canonical).map_err(|e| e.at(tag, 0))
}
