//! # snarkjs Powers-of-Tau Files
//!
//! A `ptau` file carries the universal Phase 1 output for domains up to
//! `2^power`:
//!
//! | tag | section        | contents                      |
//! |-----|----------------|-------------------------------|
//! | 1   | header         | `n8 u32, q[n8], power u32, ceremonyPower u32` |
//! | 2   | tauG1          | `2N - 1` G1 points `[τ^i]₁`   |
//! | 3   | tauG2          | `N` G2 points `[τ^i]₂`        |
//! | 4   | alphaTauG1     | `N` G1 points `[ατ^i]₁`       |
//! | 5   | betaTauG1      | `N` G1 points `[βτ^i]₁`       |
//! | 6   | betaG2         | one G2 point `[β]₂`           |
//! | 7   | contributions  | `nContributions u32, ...`     |
//!
//! Coordinates are Montgomery form. Every point is validated on load.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use ark_bn254::{Fq, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, PrimeField, UniformRand};
use num_bigint::BigUint;
use rand::Rng;

use crate::binfile::{biguint_le, SectionReader, SectionWriter};
use crate::codec::{self, Repr, FIELD_SIZE, G1_SIZE, G2_SIZE};
use crate::error::CeremonyFileError;

/// File magic.
pub const PTAU_MAGIC: &[u8; 4] = b"ptau";

/// Largest power BN254's scalar field supports as an FFT domain.
pub const MAX_POWER: u32 = 28;

/// Section tags.
pub mod section {
    /// Header.
    pub const HEADER: u32 = 1;
    /// `[τ^i]₁`.
    pub const TAU_G1: u32 = 2;
    /// `[τ^i]₂`.
    pub const TAU_G2: u32 = 3;
    /// `[ατ^i]₁`.
    pub const ALPHA_TAU_G1: u32 = 4;
    /// `[βτ^i]₁`.
    pub const BETA_TAU_G1: u32 = 5;
    /// `[β]₂`.
    pub const BETA_G2: u32 = 6;
    /// Contribution transcript.
    pub const CONTRIBUTIONS: u32 = 7;
}

/// Decoded `ptau` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtauHeader {
    /// Bytes per base-field element.
    pub n8: u32,
    /// Base-field prime.
    pub prime: BigUint,
    /// `log2` of the domain size the file supports.
    pub power: u32,
    /// Power the ceremony was originally run at.
    pub ceremony_power: u32,
}

impl PtauHeader {
    /// Domain size `N = 2^power`.
    pub fn domain_size(&self) -> usize {
        1usize << self.power
    }
}

/// A fully decoded and validated `ptau` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ptau {
    /// Header.
    pub header: PtauHeader,
    /// `2N - 1` points.
    pub tau_g1: Vec<G1Affine>,
    /// `N` points.
    pub tau_g2: Vec<G2Affine>,
    /// `N` points.
    pub alpha_tau_g1: Vec<G1Affine>,
    /// `N` points.
    pub beta_tau_g1: Vec<G1Affine>,
    /// `[β]₂`.
    pub beta_g2: G2Affine,
    /// Number of recorded contributions; zero when the section is absent.
    pub contributions: u32,
}

/// BN254 base-field modulus.
pub fn bn254_base_prime() -> BigUint {
    BigUint::from_bytes_le(&ark_ff::BigInteger::to_bytes_le(&Fq::MODULUS))
}

impl Ptau {
    /// Read and validate a `ptau` stream.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CeremonyFileError> {
        let mut file = SectionReader::open(reader, PTAU_MAGIC)?;
        file.require_version()?;
        let header = read_header(&mut file)?;
        let n = header.domain_size() as u64;

        let tau_g1 = read_g1(&mut file, section::TAU_G1, 2 * n - 1)?;
        let tau_g2 = read_g2(&mut file, section::TAU_G2, n)?;
        let alpha_tau_g1 = read_g1(&mut file, section::ALPHA_TAU_G1, n)?;
        let beta_tau_g1 = read_g1(&mut file, section::BETA_TAU_G1, n)?;
        let beta_g2 = read_g2(&mut file, section::BETA_G2, 1)?
            .pop()
            .ok_or(CeremonyFileError::MissingSection { tag: section::BETA_G2 })?;

        let contributions = if file.has_section(section::CONTRIBUTIONS) {
            file.seek_unique_section(section::CONTRIBUTIONS)?;
            file.read_u32()?
        } else {
            0
        };

        tracing::debug!(power = header.power, contributions, "loaded ptau");
        Ok(Self {
            header,
            tau_g1,
            tau_g2,
            alpha_tau_g1,
            beta_tau_g1,
            beta_g2,
            contributions,
        })
    }

    /// Read and validate a `ptau` file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CeremonyFileError> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Domain size the file supports.
    pub fn domain_size(&self) -> usize {
        self.header.domain_size()
    }

    /// Encode as a snarkjs-layout `ptau` container.
    pub fn to_writer(&self) -> SectionWriter {
        let mut header = Vec::with_capacity(12 + FIELD_SIZE);
        header.extend_from_slice(&self.header.n8.to_le_bytes());
        header.extend(biguint_le(&self.header.prime, self.header.n8 as usize));
        header.extend_from_slice(&self.header.power.to_le_bytes());
        header.extend_from_slice(&self.header.ceremony_power.to_le_bytes());

        let mut w = SectionWriter::new(PTAU_MAGIC);
        w.section(section::HEADER, header)
            .section(section::TAU_G1, codec::encode_g1_slice(&self.tau_g1, Repr::Montgomery))
            .section(section::TAU_G2, codec::encode_g2_slice(&self.tau_g2, Repr::Montgomery))
            .section(
                section::ALPHA_TAU_G1,
                codec::encode_g1_slice(&self.alpha_tau_g1, Repr::Montgomery),
            )
            .section(
                section::BETA_TAU_G1,
                codec::encode_g1_slice(&self.beta_tau_g1, Repr::Montgomery),
            )
            .section(
                section::BETA_G2,
                codec::encode_g2_slice(std::slice::from_ref(&self.beta_g2), Repr::Montgomery),
            )
            .section(section::CONTRIBUTIONS, self.contributions.to_le_bytes().to_vec());
        w
    }

    /// Write the file to `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.to_writer().write_to(out)
    }

    /// Generate a single-party powers-of-tau file from `rng`.
    ///
    /// Whoever runs this learns τ, α and β; the output is only fit for
    /// development and tests.
    pub fn insecure_dev<R: Rng>(power: u32, rng: &mut R) -> Result<Self, CeremonyFileError> {
        if power > MAX_POWER {
            return Err(CeremonyFileError::UnsupportedPower(power));
        }
        let n = 1usize << power;
        let tau = nonzero_scalar(rng);
        let alpha = nonzero_scalar(rng);
        let beta = nonzero_scalar(rng);

        let mut powers = Vec::with_capacity(2 * n - 1);
        let mut acc = Fr::ONE;
        for _ in 0..2 * n - 1 {
            powers.push(acc);
            acc *= tau;
        }

        let g1 = G1Affine::generator();
        let g2 = G2Affine::generator();
        let scale_g1 = |factor: Fr, count: usize| -> Vec<G1Affine> {
            let proj: Vec<G1Projective> =
                powers[..count].iter().map(|p| g1 * (*p * factor)).collect();
            G1Projective::normalize_batch(&proj)
        };

        let tau_g1 = scale_g1(Fr::ONE, 2 * n - 1);
        let alpha_tau_g1 = scale_g1(alpha, n);
        let beta_tau_g1 = scale_g1(beta, n);
        let tau_g2_proj: Vec<G2Projective> = powers[..n].iter().map(|p| g2 * p).collect();
        let tau_g2 = G2Projective::normalize_batch(&tau_g2_proj);
        let beta_g2 = (g2 * beta).into_affine();

        Ok(Self {
            header: PtauHeader {
                n8: FIELD_SIZE as u32,
                prime: bn254_base_prime(),
                power,
                ceremony_power: power,
            },
            tau_g1,
            tau_g2,
            alpha_tau_g1,
            beta_tau_g1,
            beta_g2,
            contributions: 0,
        })
    }
}

fn nonzero_scalar<R: Rng>(rng: &mut R) -> Fr {
    loop {
        let s = Fr::rand(rng);
        if s != Fr::ZERO {
            return s;
        }
    }
}

fn read_header<R: Read + Seek>(
    file: &mut SectionReader<R>,
) -> Result<PtauHeader, CeremonyFileError> {
    let header = file.seek_unique_section(section::HEADER)?;
    let n8 = file.read_u32()?;
    if n8 as usize != FIELD_SIZE {
        return Err(CeremonyFileError::UnsupportedField("ptau element size is not 32 bytes"));
    }
    let prime = file.read_biguint(FIELD_SIZE)?;
    if prime != bn254_base_prime() {
        return Err(CeremonyFileError::UnsupportedField("ptau prime is not the BN254 base field"));
    }
    let power = file.read_u32()?;
    let ceremony_power = file.read_u32()?;
    file.expect_section_end(&header)?;
    if power > MAX_POWER {
        return Err(CeremonyFileError::UnsupportedPower(power));
    }
    Ok(PtauHeader {
        n8,
        prime,
        power,
        ceremony_power,
    })
}

fn read_g1<R: Read + Seek>(
    file: &mut SectionReader<R>,
    tag: u32,
    count: u64,
) -> Result<Vec<G1Affine>, CeremonyFileError> {
    let bytes = file.read_section_sized(tag, count * G1_SIZE as u64)?;
    codec::decode_g1_slice(&bytes, Repr::Montgomery, tag)
}

fn read_g2<R: Read + Seek>(
    file: &mut SectionReader<R>,
    tag: u32,
    count: u64,
) -> Result<Vec<G2Affine>, CeremonyFileError> {
    let bytes = file.read_section_sized(tag, count * G2_SIZE as u64)?;
    codec::decode_g2_slice(&bytes, Repr::Montgomery, tag)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use ark_ec::pairing::Pairing;
    use ark_bn254::Bn254;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::FileErrorKind;

    fn dev(power: u32) -> Ptau {
        Ptau::insecure_dev(power, &mut StdRng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn power_three_has_domain_eight_and_fifteen_tau_g1_points() {
        let bytes = dev(3).to_writer().to_bytes();
        let ptau = Ptau::read(Cursor::new(bytes)).unwrap();
        assert_eq!(ptau.header.power, 3);
        assert_eq!(ptau.domain_size(), 8);
        assert_eq!(ptau.tau_g1.len(), 15);
        assert_eq!(ptau.tau_g2.len(), 8);
        assert_eq!(ptau.alpha_tau_g1.len(), 8);
        assert_eq!(ptau.beta_tau_g1.len(), 8);
        assert_eq!(ptau.header.prime, bn254_base_prime());
        assert_eq!(ptau.tau_g1[0], G1Affine::generator());
    }

    #[test]
    fn dev_powers_are_consistent() {
        let ptau = dev(2);
        // e([τ^{i+1}]₁, [1]₂) == e([τ^i]₁, [τ]₂)
        for i in 0..ptau.tau_g1.len() - 1 {
            assert_eq!(
                Bn254::pairing(ptau.tau_g1[i + 1], ptau.tau_g2[0]),
                Bn254::pairing(ptau.tau_g1[i], ptau.tau_g2[1]),
            );
        }
        assert_eq!(
            Bn254::pairing(ptau.beta_tau_g1[0], G2Affine::generator()),
            Bn254::pairing(G1Affine::generator(), ptau.beta_g2),
        );
    }

    #[test]
    fn file_round_trips() {
        let ptau = dev(2);
        let mut bytes = Vec::new();
        ptau.write_to(&mut bytes).unwrap();
        assert_eq!(Ptau::read(Cursor::new(bytes)).unwrap(), ptau);
    }

    #[test]
    fn off_curve_point_is_rejected_with_its_position() {
        let mut ptau = dev(2);
        let bad = G1Affine::new_unchecked(ptau.tau_g1[3].x, ptau.tau_g1[3].y + Fq::ONE);
        ptau.tau_g1[3] = bad;
        let err = Ptau::read(Cursor::new(ptau.to_writer().to_bytes())).unwrap_err();
        assert!(matches!(
            err,
            CeremonyFileError::PointNotOnCurve { section: section::TAU_G1, index: 3 }
        ));
        assert_eq!(err.kind(), FileErrorKind::PointNotOnCurve);
    }

    #[test]
    fn wrong_prime_is_rejected() {
        let mut ptau = dev(1);
        ptau.header.prime += 2u32;
        let err = Ptau::read(Cursor::new(ptau.to_writer().to_bytes())).unwrap_err();
        assert!(matches!(err, CeremonyFileError::UnsupportedField(_)));
    }

    #[test]
    fn short_tau_section_is_rejected() {
        let mut ptau = dev(2);
        ptau.tau_g1.pop();
        let err = Ptau::read(Cursor::new(ptau.to_writer().to_bytes())).unwrap_err();
        assert!(matches!(
            err,
            CeremonyFileError::SectionLength { tag: section::TAU_G1, .. }
        ));
    }

    #[test]
    fn duplicated_section_is_rejected() {
        let ptau = dev(1);
        let mut w = ptau.to_writer();
        w.section(section::BETA_G2, codec::encode_g2_slice(&[ptau.beta_g2], Repr::Montgomery));
        let err = Ptau::read(Cursor::new(w.to_bytes())).unwrap_err();
        assert!(matches!(
            err,
            CeremonyFileError::MultiSegmentSection { tag: section::BETA_G2, count: 2 }
        ));
    }

    #[test]
    fn absurd_power_is_rejected() {
        let mut ptau = dev(1);
        ptau.header.power = 40;
        let err = Ptau::read(Cursor::new(ptau.to_writer().to_bytes())).unwrap_err();
        assert!(matches!(err, CeremonyFileError::UnsupportedPower(40)));
        assert!(Ptau::insecure_dev(29, &mut StdRng::seed_from_u64(1)).is_err());
    }

    fn header_payload(power: u32, ceremony_power: u32) -> Vec<u8> {
        let mut header = (FIELD_SIZE as u32).to_le_bytes().to_vec();
        header.extend(biguint_le(&bn254_base_prime(), FIELD_SIZE));
        header.extend_from_slice(&power.to_le_bytes());
        header.extend_from_slice(&ceremony_power.to_le_bytes());
        header
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_point_sections_never_panic(
            power in proptest::num::u32::ANY,
            ceremony_power in proptest::num::u32::ANY,
            payloads in proptest::collection::vec(
                proptest::collection::vec(proptest::num::u8::ANY, 0..300),
                6,
            ),
        ) {
            let mut w = SectionWriter::new(PTAU_MAGIC);
            w.section(section::HEADER, header_payload(power, ceremony_power));
            for (tag, payload) in (section::TAU_G1..).zip(payloads) {
                w.section(tag, payload);
            }
            let _ = Ptau::read(Cursor::new(w.to_bytes()));
        }

        #[test]
        fn small_power_with_garbage_points_is_rejected(
            power in 0u32..3,
            fill in 1u8..=255,
        ) {
            let n = 1usize << power;
            let mut w = SectionWriter::new(PTAU_MAGIC);
            w.section(section::HEADER, header_payload(power, power))
                .section(section::TAU_G1, vec![fill; (2 * n - 1) * G1_SIZE])
                .section(section::TAU_G2, vec![fill; n * G2_SIZE])
                .section(section::ALPHA_TAU_G1, vec![fill; n * G1_SIZE])
                .section(section::BETA_TAU_G1, vec![fill; n * G1_SIZE])
                .section(section::BETA_G2, vec![fill; G2_SIZE]);
            proptest::prop_assert!(Ptau::read(Cursor::new(w.to_bytes())).is_err());
        }
    }
}
