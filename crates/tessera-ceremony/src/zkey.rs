//! # snarkjs Groth16 zkey Files
//!
//! Only the parts a verifier needs are read: the protocol id (section 1),
//! the Groth16 header (section 2) and the IC points (section 3). The
//! protocol id is checked before anything else so a PLONK or FFLONK key
//! fails as [`CeremonyFileError::UnsupportedProtocol`] rather than as a
//! confusing header error.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ark_bn254::{Bn254, Fr, G1Affine, G2Affine};
use ark_ff::PrimeField;
use ark_groth16::{ProvingKey, VerifyingKey};
use num_bigint::BigUint;

use crate::binfile::{biguint_le, SectionReader, SectionWriter};
use crate::codec::{self, Repr, FIELD_SIZE, G1_SIZE, G2_SIZE};
use crate::error::CeremonyFileError;
use crate::ptau::bn254_base_prime;

/// File magic.
pub const ZKEY_MAGIC: &[u8; 4] = b"zkey";

/// Protocol id snarkjs assigns to Groth16.
pub const GROTH16_PROTOCOL_ID: u32 = 1;

/// Section tags.
pub mod section {
    /// Protocol id.
    pub const HEADER: u32 = 1;
    /// Groth16 header.
    pub const GROTH16_HEADER: u32 = 2;
    /// IC points.
    pub const IC: u32 = 3;
    /// Coefficients of A and B.
    pub const COEFFS: u32 = 4;
    /// `[A_i(τ)]₁`.
    pub const POINTS_A: u32 = 5;
    /// `[B_i(τ)]₁`.
    pub const POINTS_B1: u32 = 6;
    /// `[B_i(τ)]₂`.
    pub const POINTS_B2: u32 = 7;
    /// `L` query.
    pub const POINTS_C: u32 = 8;
    /// `H` query.
    pub const POINTS_H: u32 = 9;
    /// Contribution transcript.
    pub const CONTRIBUTIONS: u32 = 10;
}

/// Groth16 header of a zkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groth16Header {
    /// Base-field modulus.
    pub q: BigUint,
    /// Scalar-field modulus.
    pub r: BigUint,
    /// Number of wires including the constant one.
    pub n_vars: u32,
    /// Number of public inputs (excluding the constant one).
    pub n_public: u32,
    /// Evaluation domain size.
    pub domain_size: u32,
    /// `[α]₁`.
    pub alpha_g1: G1Affine,
    /// `[β]₁`.
    pub beta_g1: G1Affine,
    /// `[β]₂`.
    pub beta_g2: G2Affine,
    /// `[γ]₂`.
    pub gamma_g2: G2Affine,
    /// `[δ]₁`.
    pub delta_g1: G1Affine,
    /// `[δ]₂`.
    pub delta_g2: G2Affine,
}

impl Groth16Header {
    /// `ceil(log2(domain_size))`.
    pub fn power(&self) -> u32 {
        (self.domain_size as u64).next_power_of_two().trailing_zeros()
    }
}

/// The verifier-facing part of a Groth16 zkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zkey {
    /// Groth16 header.
    pub header: Groth16Header,
    /// `n_public + 1` IC points.
    pub ic: Vec<G1Affine>,
}

impl Zkey {
    /// Read and validate a zkey stream.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CeremonyFileError> {
        let mut file = SectionReader::open(reader, ZKEY_MAGIC)?;
        file.require_version()?;

        let protocol = file.seek_unique_section(section::HEADER)?;
        let protocol_id = file.read_u32()?;
        file.expect_section_end(&protocol)?;
        if protocol_id != GROTH16_PROTOCOL_ID {
            return Err(CeremonyFileError::UnsupportedProtocol { protocol_id });
        }

        let header = read_groth16_header(&mut file)?;
        let ic_len = header.n_public as u64 + 1;
        let ic_bytes = file.read_section_sized(section::IC, ic_len * G1_SIZE as u64)?;
        let ic = codec::decode_g1_slice(&ic_bytes, Repr::Montgomery, section::IC)?;

        Ok(Self { header, ic })
    }

    /// Read and validate a zkey file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CeremonyFileError> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Encode sections 1-3 in snarkjs layout. Prover sections are not
    /// emitted; the result is a verifier-only zkey.
    pub fn to_writer(&self) -> SectionWriter {
        let h = &self.header;
        let mut groth = Vec::with_capacity(8 + 2 * FIELD_SIZE + 12 + 3 * G1_SIZE + 3 * G2_SIZE);
        groth.extend_from_slice(&(FIELD_SIZE as u32).to_le_bytes());
        groth.extend(biguint_le(&h.q, FIELD_SIZE));
        groth.extend_from_slice(&(FIELD_SIZE as u32).to_le_bytes());
        groth.extend(biguint_le(&h.r, FIELD_SIZE));
        groth.extend_from_slice(&h.n_vars.to_le_bytes());
        groth.extend_from_slice(&h.n_public.to_le_bytes());
        groth.extend_from_slice(&h.domain_size.to_le_bytes());
        codec::encode_g1(&h.alpha_g1, Repr::Montgomery, &mut groth);
        codec::encode_g1(&h.beta_g1, Repr::Montgomery, &mut groth);
        codec::encode_g2(&h.beta_g2, Repr::Montgomery, &mut groth);
        codec::encode_g2(&h.gamma_g2, Repr::Montgomery, &mut groth);
        codec::encode_g1(&h.delta_g1, Repr::Montgomery, &mut groth);
        codec::encode_g2(&h.delta_g2, Repr::Montgomery, &mut groth);

        let mut w = SectionWriter::new(ZKEY_MAGIC);
        w.section(section::HEADER, GROTH16_PROTOCOL_ID.to_le_bytes().to_vec())
            .section(section::GROTH16_HEADER, groth)
            .section(section::IC, codec::encode_g1_slice(&self.ic, Repr::Montgomery));
        w
    }

    /// Build a verifier-only zkey from extracted keys.
    pub fn from_keys(pk: &ProvingKey<Bn254>, n_vars: u32, domain_size: u32) -> Self {
        let vk = &pk.vk;
        Self {
            header: Groth16Header {
                q: bn254_base_prime(),
                r: bn254_scalar_prime(),
                n_vars,
                n_public: vk.gamma_abc_g1.len().saturating_sub(1) as u32,
                domain_size,
                alpha_g1: vk.alpha_g1,
                beta_g1: pk.beta_g1,
                beta_g2: vk.beta_g2,
                gamma_g2: vk.gamma_g2,
                delta_g1: pk.delta_g1,
                delta_g2: vk.delta_g2,
            },
            ic: vk.gamma_abc_g1.clone(),
        }
    }

    /// The Groth16 verifying key this zkey commits to.
    pub fn verifying_key(&self) -> VerifyingKey<Bn254> {
        VerifyingKey {
            alpha_g1: self.header.alpha_g1,
            beta_g2: self.header.beta_g2,
            gamma_g2: self.header.gamma_g2,
            delta_g2: self.header.delta_g2,
            gamma_abc_g1: self.ic.clone(),
        }
    }
}

fn read_groth16_header<R: Read + Seek>(
    file: &mut SectionReader<R>,
) -> Result<Groth16Header, CeremonyFileError> {
    let section = file.seek_unique_section(section::GROTH16_HEADER)?;

    let n8q = file.read_u32()?;
    if n8q as usize != FIELD_SIZE {
        return Err(CeremonyFileError::UnsupportedField("zkey q is not 32 bytes"));
    }
    let q = file.read_biguint(FIELD_SIZE)?;
    if q != bn254_base_prime() {
        return Err(CeremonyFileError::UnsupportedField("zkey q is not the BN254 base field"));
    }
    let n8r = file.read_u32()?;
    if n8r as usize != FIELD_SIZE {
        return Err(CeremonyFileError::UnsupportedField("zkey r is not 32 bytes"));
    }
    let r = file.read_biguint(FIELD_SIZE)?;
    if r != bn254_scalar_prime() {
        return Err(CeremonyFileError::UnsupportedField("zkey r is not the BN254 scalar field"));
    }

    let n_vars = file.read_u32()?;
    let n_public = file.read_u32()?;
    let domain_size = file.read_u32()?;
    if n_public >= n_vars {
        return Err(CeremonyFileError::InconsistentHeader("nPublic must be below nVars"));
    }

    let tag = section::GROTH16_HEADER;
    let alpha_g1 = read_g1(file, tag, 0)?;
    let beta_g1 = read_g1(file, tag, 1)?;
    let beta_g2 = read_g2(file, tag, 2)?;
    let gamma_g2 = read_g2(file, tag, 3)?;
    let delta_g1 = read_g1(file, tag, 4)?;
    let delta_g2 = read_g2(file, tag, 5)?;
    file.expect_section_end(&section)?;

    Ok(Groth16Header {
        q,
        r,
        n_vars,
        n_public,
        domain_size,
        alpha_g1,
        beta_g1,
        beta_g2,
        gamma_g2,
        delta_g1,
        delta_g2,
    })
}

fn read_g1<R: Read + Seek>(
    file: &mut SectionReader<R>,
    tag: u32,
    index: usize,
) -> Result<G1Affine, CeremonyFileError> {
    let mut buf = [0u8; G1_SIZE];
    file.read_bytes(&mut buf)?;
    codec::decode_g1(&buf, Repr::Montgomery).map_err(|e| e.at(tag, index))
}

fn read_g2<R: Read + Seek>(
    file: &mut SectionReader<R>,
    tag: u32,
    index: usize,
) -> Result<G2Affine, CeremonyFileError> {
    let mut buf = [0u8; G2_SIZE];
    file.read_bytes(&mut buf)?;
    codec::decode_g2(&buf, Repr::Montgomery).map_err(|e| e.at(tag, index))
}

/// BN254 scalar-field modulus.
pub fn bn254_scalar_prime() -> BigUint {
    BigUint::from_bytes_le(&ark_ff::BigInteger::to_bytes_le(&Fr::MODULUS))
}
