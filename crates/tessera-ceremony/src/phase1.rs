//! # Phase 1 Artifact
//!
//! The circuit-independent powers of tau, lifted out of a snarkjs `ptau`
//! file into tessera's canonical artifact encoding:
//!
//! | tag | contents                                   |
//! |-----|--------------------------------------------|
//! | 1   | `power u32`                                |
//! | 2   | `[τ^i]₁`, `2N - 1` points                  |
//! | 3   | `[ατ^i]₁`, `N` points                      |
//! | 4   | `[βτ^i]₁`, `N` points                      |
//! | 5   | `[τ^i]₂`, `N` points                       |
//! | 6   | `[β]₂`                                     |
//! | 7   | SHA-256 of sections 1-6 as a container     |
//!
//! Vectors are length-prefixed; coordinates are canonical little-endian.
//! The stored hash is checked on load, so a corrupted artifact fails before
//! it reaches Phase 2.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use ark_bn254::{G1Affine, G2Affine};
use sha2::{Digest, Sha256};

use crate::binfile::{SectionReader, SectionWriter};
use crate::codec::{self, Repr, G2_SIZE};
use crate::error::{CeremonyError, CeremonyFileError};
use crate::ptau::{Ptau, MAX_POWER};

/// Artifact magic.
pub const PHASE1_MAGIC: &[u8; 4] = b"tph1";

mod section {
    pub const HEADER: u32 = 1;
    pub const TAU_G1: u32 = 2;
    pub const ALPHA_TAU_G1: u32 = 3;
    pub const BETA_TAU_G1: u32 = 4;
    pub const TAU_G2: u32 = 5;
    pub const BETA_G2: u32 = 6;
    pub const HASH: u32 = 7;
}

/// Phase 1 output for domains up to `2^power`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase1 {
    /// `log2` of the supported domain size.
    pub power: u32,
    /// `[τ^i]₁` for `i < 2N - 1`.
    pub tau_g1: Vec<G1Affine>,
    /// `[ατ^i]₁` for `i < N`.
    pub alpha_tau_g1: Vec<G1Affine>,
    /// `[βτ^i]₁` for `i < N`.
    pub beta_tau_g1: Vec<G1Affine>,
    /// `[τ^i]₂` for `i < N`.
    pub tau_g2: Vec<G2Affine>,
    /// `[β]₂`.
    pub beta_g2: G2Affine,
    /// Digest over the encoded content.
    pub hash: [u8; 32],
}

impl Phase1 {
    /// Build from a decoded `ptau`. Vector lengths are checked against the
    /// declared power.
    pub fn from_ptau(ptau: &Ptau) -> Result<Self, CeremonyError> {
        let mut phase1 = Self {
            power: ptau.header.power,
            tau_g1: ptau.tau_g1.clone(),
            alpha_tau_g1: ptau.alpha_tau_g1.clone(),
            beta_tau_g1: ptau.beta_tau_g1.clone(),
            tau_g2: ptau.tau_g2.clone(),
            beta_g2: ptau.beta_g2,
            hash: [0u8; 32],
        };
        phase1.check_lengths()?;
        phase1.hash = phase1.compute_hash();
        Ok(phase1)
    }

    /// `phase1_init`: load a `ptau` file and lift it into a Phase 1 artifact.
    pub fn init(ptau_path: impl AsRef<Path>) -> Result<Self, CeremonyError> {
        let ptau = Ptau::open(ptau_path)?;
        let phase1 = Self::from_ptau(&ptau)?;
        tracing::info!(
            power = phase1.power,
            hash = %short_hash(&phase1.hash),
            "phase 1 initialised"
        );
        Ok(phase1)
    }

    /// Domain size `N = 2^power`.
    pub fn domain_size(&self) -> usize {
        1usize << self.power
    }

    pub(crate) fn check_lengths(&self) -> Result<(), CeremonyError> {
        if self.power > MAX_POWER {
            return Err(CeremonyFileError::UnsupportedPower(self.power).into());
        }
        let n = self.domain_size();
        let checks = [
            ("tau_g1", self.tau_g1.len(), 2 * n - 1),
            ("alpha_tau_g1", self.alpha_tau_g1.len(), n),
            ("beta_tau_g1", self.beta_tau_g1.len(), n),
            ("tau_g2", self.tau_g2.len(), n),
        ];
        for (what, actual, expected) in checks {
            if actual != expected {
                return Err(CeremonyError::IncompletePhase1 {
                    what,
                    power: self.power,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn body(&self) -> SectionWriter {
        let mut w = SectionWriter::new(PHASE1_MAGIC);
        w.section(section::HEADER, self.power.to_le_bytes().to_vec())
            .section(section::TAU_G1, codec::encode_g1_vec(&self.tau_g1))
            .section(section::ALPHA_TAU_G1, codec::encode_g1_vec(&self.alpha_tau_g1))
            .section(section::BETA_TAU_G1, codec::encode_g1_vec(&self.beta_tau_g1))
            .section(section::TAU_G2, codec::encode_g2_vec(&self.tau_g2))
            .section(
                section::BETA_G2,
                codec::encode_g2_slice(std::slice::from_ref(&self.beta_g2), Repr::Canonical),
            );
        w
    }

    /// SHA-256 over the encoded content, excluding the hash section.
    pub fn compute_hash(&self) -> [u8; 32] {
        Sha256::digest(self.body().to_bytes()).into()
    }

    /// Encode the artifact, including its stored hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = self.body();
        w.section(section::HASH, self.hash.to_vec());
        w.to_bytes()
    }

    /// Write the artifact to `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.to_bytes())
    }

    /// Decode an artifact and check its stored hash.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CeremonyError> {
        let mut file = SectionReader::open(reader, PHASE1_MAGIC)?;
        file.require_version()?;

        let header = file.seek_unique_section(section::HEADER)?;
        let power = file.read_u32()?;
        file.expect_section_end(&header)?;

        let tau_g1 = codec::decode_g1_vec(&file.read_section(section::TAU_G1)?, section::TAU_G1)?;
        let alpha_tau_g1 = codec::decode_g1_vec(
            &file.read_section(section::ALPHA_TAU_G1)?,
            section::ALPHA_TAU_G1,
        )?;
        let beta_tau_g1 = codec::decode_g1_vec(
            &file.read_section(section::BETA_TAU_G1)?,
            section::BETA_TAU_G1,
        )?;
        let tau_g2 = codec::decode_g2_vec(&file.read_section(section::TAU_G2)?, section::TAU_G2)?;
        let beta_g2 = codec::decode_g2_slice(
            &file.read_section_sized(section::BETA_G2, G2_SIZE as u64)?,
            Repr::Canonical,
            section::BETA_G2,
        )?
        .pop()
        .ok_or(CeremonyFileError::MissingSection { tag: section::BETA_G2 })?;
        let hash = read_hash(&mut file, section::HASH)?;

        let phase1 = Self {
            power,
            tau_g1,
            alpha_tau_g1,
            beta_tau_g1,
            tau_g2,
            beta_g2,
            hash,
        };
        phase1.check_lengths()?;
        if phase1.compute_hash() != hash {
            return Err(CeremonyFileError::HashMismatch { artifact: "phase 1" }.into());
        }
        Ok(phase1)
    }

    /// Decode an artifact from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CeremonyError> {
        Self::read(std::io::Cursor::new(bytes))
    }

    /// Read an artifact from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CeremonyError> {
        let file = File::open(path).map_err(CeremonyFileError::from)?;
        Self::read(BufReader::new(file))
    }
}

pub(crate) fn read_hash<R: Read + Seek>(
    file: &mut SectionReader<R>,
    tag: u32,
) -> Result<[u8; 32], CeremonyFileError> {
    let bytes = file.read_section_sized(tag, 32)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Short hex prefix of an artifact hash for log lines and summaries.
pub fn short_hash(hash: &[u8; 32]) -> String {
    hex::encode(&hash[..8])
}
