//! # BN254 Element Encodings
//!
//! Two byte forms appear in ceremony files:
//!
//! - **Montgomery**: snarkjs `ptau` and `zkey` store each base-field
//!   coordinate as its Montgomery representation, 32 bytes little-endian.
//! - **Canonical**: circom `r1cs` coefficients and tessera's own artifacts
//!   store the standard representative, 32 bytes little-endian.
//!
//! Either way a value not below the modulus is rejected, and `(0, 0)` is the
//! point at infinity. Decoded points are checked to be on the curve and in
//! the prime-order subgroup; the vector decoders do this in parallel.

use ark_bn254::{Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::short_weierstrass::{Affine, SWCurveConfig};
use ark_ec::AffineRepr;
use ark_ff::{BigInt, BigInteger, PrimeField, Zero};
use rayon::prelude::*;

use crate::error::CeremonyFileError;

/// Bytes per base- or scalar-field element.
pub const FIELD_SIZE: usize = 32;
/// Bytes per uncompressed G1 point.
pub const G1_SIZE: usize = 2 * FIELD_SIZE;
/// Bytes per uncompressed G2 point.
pub const G2_SIZE: usize = 4 * FIELD_SIZE;

/// Which representation a field element is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// Montgomery form (snarkjs).
    Montgomery,
    /// Standard form (circom r1cs, tessera artifacts).
    Canonical,
}

/// Why a single point failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointError {
    /// A coordinate is not below the field modulus.
    NonCanonical,
    /// The coordinates do not satisfy the curve equation.
    NotOnCurve,
    /// The point is outside the prime-order subgroup.
    NotInSubgroup,
}

impl PointError {
    /// Attach the section and index the point was read from.
    pub fn at(self, section: u32, index: usize) -> CeremonyFileError {
        match self {
            Self::NonCanonical => CeremonyFileError::NonCanonicalFieldElement { section, index },
            Self::NotOnCurve => CeremonyFileError::PointNotOnCurve { section, index },
            Self::NotInSubgroup => CeremonyFileError::PointNotInSubgroup { section, index },
        }
    }
}

fn bigint_le(bytes: &[u8]) -> BigInt<4> {
    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    BigInt::new(limbs)
}

// -- Field elements ----------------------------------------------------------

/// Decode a base-field element from 32 bytes.
pub fn decode_fq(bytes: &[u8], repr: Repr) -> Option<Fq> {
    let value = bigint_le(bytes);
    if value >= Fq::MODULUS {
        return None;
    }
    match repr {
        Repr::Montgomery => Some(Fq::new_unchecked(value)),
        Repr::Canonical => Fq::from_bigint(value),
    }
}

/// Append a base-field element.
pub fn encode_fq(value: &Fq, repr: Repr, out: &mut Vec<u8>) {
    let limbs = match repr {
        Repr::Montgomery => value.0,
        Repr::Canonical => value.into_bigint(),
    };
    out.extend_from_slice(&limbs.to_bytes_le());
}

/// Decode a canonical scalar-field element from 32 bytes.
pub fn decode_fr(bytes: &[u8]) -> Option<Fr> {
    Fr::from_bigint(bigint_le(bytes))
}

/// Append a canonical scalar-field element.
pub fn encode_fr(value: &Fr, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.into_bigint().to_bytes_le());
}

// -- Points ------------------------------------------------------------------

/// Decode a G1 point from [`G1_SIZE`] bytes.
pub fn decode_g1(bytes: &[u8], repr: Repr) -> Result<G1Affine, PointError> {
    let x = decode_fq(&bytes[..FIELD_SIZE], repr).ok_or(PointError::NonCanonical)?;
    let y = decode_fq(&bytes[FIELD_SIZE..G1_SIZE], repr).ok_or(PointError::NonCanonical)?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    check_point(G1Affine::new_unchecked(x, y))
}

/// Decode a G2 point from [`G2_SIZE`] bytes; each coordinate is `c0 | c1`.
pub fn decode_g2(bytes: &[u8], repr: Repr) -> Result<G2Affine, PointError> {
    let coord = |i: usize| {
        decode_fq(&bytes[i * FIELD_SIZE..(i + 1) * FIELD_SIZE], repr)
            .ok_or(PointError::NonCanonical)
    };
    let x = Fq2::new(coord(0)?, coord(1)?);
    let y = Fq2::new(coord(2)?, coord(3)?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    check_point(G2Affine::new_unchecked(x, y))
}

fn check_point<P: SWCurveConfig>(point: Affine<P>) -> Result<Affine<P>, PointError> {
    if !point.is_on_curve() {
        return Err(PointError::NotOnCurve);
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PointError::NotInSubgroup);
    }
    Ok(point)
}

/// Append a G1 point; infinity is written as `(0, 0)`.
pub fn encode_g1(point: &G1Affine, repr: Repr, out: &mut Vec<u8>) {
    match point.xy() {
        Some((x, y)) => {
            encode_fq(x, repr, out);
            encode_fq(y, repr, out);
        }
        None => out.extend_from_slice(&[0u8; G1_SIZE]),
    }
}

/// Append a G2 point; infinity is written as `(0, 0)`.
pub fn encode_g2(point: &G2Affine, repr: Repr, out: &mut Vec<u8>) {
    match point.xy() {
        Some((x, y)) => {
            for coordinate in [&x.c0, &x.c1, &y.c0, &y.c1] {
                encode_fq(coordinate, repr, out);
            }
        }
        None => out.extend_from_slice(&[0u8; G2_SIZE]),
    }
}

// -- Vectors -----------------------------------------------------------------

/// Decode a packed run of G1 points, reporting failures against `section`.
pub fn decode_g1_slice(
    bytes: &[u8],
    repr: Repr,
    section: u32,
) -> Result<Vec<G1Affine>, CeremonyFileError> {
    bytes
        .par_chunks_exact(G1_SIZE)
        .enumerate()
        .map(|(i, chunk)| decode_g1(chunk, repr).map_err(|e| e.at(section, i)))
        .collect()
}

/// Decode a packed run of G2 points, reporting failures against `section`.
pub fn decode_g2_slice(
    bytes: &[u8],
    repr: Repr,
    section: u32,
) -> Result<Vec<G2Affine>, CeremonyFileError> {
    bytes
        .par_chunks_exact(G2_SIZE)
        .enumerate()
        .map(|(i, chunk)| decode_g2(chunk, repr).map_err(|e| e.at(section, i)))
        .collect()
}

/// Pack G1 points back to back.
pub fn encode_g1_slice(points: &[G1Affine], repr: Repr) -> Vec<u8> {
    let mut out = Vec::with_capacity(points.len() * G1_SIZE);
    for point in points {
        encode_g1(point, repr, &mut out);
    }
    out
}

/// Pack G2 points back to back.
pub fn encode_g2_slice(points: &[G2Affine], repr: Repr) -> Vec<u8> {
    let mut out = Vec::with_capacity(points.len() * G2_SIZE);
    for point in points {
        encode_g2(point, repr, &mut out);
    }
    out
}

/// Length-prefixed canonical G1 vector: `count u32 | points`.
pub fn encode_g1_vec(points: &[G1Affine]) -> Vec<u8> {
    let mut out = (points.len() as u32).to_le_bytes().to_vec();
    out.extend(encode_g1_slice(points, Repr::Canonical));
    out
}

/// Length-prefixed canonical G2 vector: `count u32 | points`.
pub fn encode_g2_vec(points: &[G2Affine]) -> Vec<u8> {
    let mut out = (points.len() as u32).to_le_bytes().to_vec();
    out.extend(encode_g2_slice(points, Repr::Canonical));
    out
}

fn vec_body(payload: &[u8], section: u32, width: usize) -> Result<&[u8], CeremonyFileError> {
    if payload.len() < 4 {
        return Err(CeremonyFileError::Truncated);
    }
    let (count, body) = payload.split_at(4);
    let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as u64;
    let expected = 4 + count * width as u64;
    if payload.len() as u64 != expected {
        return Err(CeremonyFileError::SectionLength {
            tag: section,
            expected,
            actual: payload.len() as u64,
        });
    }
    Ok(body)
}

/// Decode a length-prefixed canonical G1 vector.
pub fn decode_g1_vec(payload: &[u8], section: u32) -> Result<Vec<G1Affine>, CeremonyFileError> {
    decode_g1_slice(vec_body(payload, section, G1_SIZE)?, Repr::Canonical, section)
}

/// Decode a length-prefixed canonical G2 vector.
pub fn decode_g2_vec(payload: &[u8], section: u32) -> Result<Vec<G2Affine>, CeremonyFileError> {
    decode_g2_slice(vec_body(payload, section, G2_SIZE)?, Repr::Canonical, section)
}

#[cfg(test)]
mod tests {
    use ark_ec::CurveGroup;
    use ark_ff::One;

    use super::*;

    #[test]
    fn montgomery_and_canonical_forms_differ_but_agree() {
        let g = G1Affine::generator();
        let mont = encode_g1_slice(&[g], Repr::Montgomery);
        let canon = encode_g1_slice(&[g], Repr::Canonical);
        assert_ne!(mont, canon);
        assert_eq!(decode_g1(&mont, Repr::Montgomery).unwrap(), g);
        assert_eq!(decode_g1(&canon, Repr::Canonical).unwrap(), g);
        // Generator is (1, 2) in standard form.
        assert_eq!(canon[0], 1);
        assert_eq!(canon[32], 2);
    }

    #[test]
    fn zero_coordinates_are_infinity() {
        assert!(decode_g1(&[0u8; G1_SIZE], Repr::Montgomery).unwrap().is_zero());
        assert!(decode_g2(&[0u8; G2_SIZE], Repr::Canonical).unwrap().is_zero());
        let mut out = Vec::new();
        encode_g2(&G2Affine::identity(), Repr::Montgomery, &mut out);
        assert_eq!(out, vec![0u8; G2_SIZE]);
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let mut bytes = Vec::new();
        encode_fq(&Fq::one(), Repr::Canonical, &mut bytes);
        encode_fq(&Fq::one(), Repr::Canonical, &mut bytes);
        assert_eq!(decode_g1(&bytes, Repr::Canonical), Err(PointError::NotOnCurve));
        assert_eq!(
            decode_g1_slice(&bytes, Repr::Canonical, 2).unwrap_err().to_string(),
            "point 0 in section 2 is not on the curve"
        );
    }

    #[test]
    fn unreduced_coordinate_is_rejected() {
        let mut bytes = vec![0xffu8; FIELD_SIZE];
        bytes.extend_from_slice(&[0u8; FIELD_SIZE]);
        assert_eq!(decode_g1(&bytes, Repr::Montgomery), Err(PointError::NonCanonical));
        assert!(decode_fr(&[0xffu8; FIELD_SIZE]).is_none());
    }

    #[test]
    fn g2_round_trips_in_both_forms() {
        let p = (G2Affine::generator() * Fr::from(7u64)).into_affine();
        for repr in [Repr::Montgomery, Repr::Canonical] {
            let bytes = encode_g2_slice(&[p], repr);
            assert_eq!(decode_g2_slice(&bytes, repr, 3).unwrap(), vec![p]);
        }
    }

    #[test]
    fn g2_point_outside_subgroup_is_rejected() {
        // Walk x until we land on the twist; almost every such point has a
        // non-trivial cofactor component.
        let mut x = Fq2::one();
        let point = loop {
            if let Some(p) = G2Affine::get_point_from_x_unchecked(x, false) {
                if !p.is_in_correct_subgroup_assuming_on_curve() {
                    break p;
                }
            }
            x += Fq2::one();
        };
        let bytes = encode_g2_slice(&[point], Repr::Canonical);
        assert_eq!(decode_g2(&bytes, Repr::Canonical), Err(PointError::NotInSubgroup));
    }

    #[test]
    fn vector_length_prefix_is_enforced() {
        let points = vec![G1Affine::generator(); 3];
        let mut payload = encode_g1_vec(&points);
        assert_eq!(decode_g1_vec(&payload, 4).unwrap(), points);
        payload.pop();
        assert!(matches!(
            decode_g1_vec(&payload, 4).unwrap_err(),
            CeremonyFileError::SectionLength { tag: 4, .. }
        ));
        assert!(matches!(decode_g1_vec(&[1, 0], 4).unwrap_err(), CeremonyFileError::Truncated));
    }

    #[test]
    fn scalar_round_trip() {
        let s = Fr::from(123456789u64);
        let mut out = Vec::new();
        encode_fr(&s, &mut out);
        assert_eq!(decode_fr(&out), Some(s));
    }
}
