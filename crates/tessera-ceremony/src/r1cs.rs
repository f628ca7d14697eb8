//! # Constraint Systems
//!
//! Reads and writes circom's binary `r1cs` format and builds the same
//! structure from an arkworks circuit, so one ceremony pipeline serves both
//! circom-compiled circuits and circuits defined in Rust.
//!
//! Wire layout follows both circom and arkworks: wire 0 is the constant one,
//! then public outputs, public inputs, and finally private wires.
//!
//! ```text
//! section 1: n8 u32 | prime[n8] | nWires u32 | nPubOut u32 | nPubIn u32
//!            | nPrvIn u32 | nLabels u64 | mConstraints u32
//! section 2: per constraint, A B C each as nTerms u32 | (wire u32 | coeff[n8])*
//! section 3: nWires u64 labels
//! ```
//!
//! Coefficients are canonical little-endian scalars.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use ark_bn254::Fr;
use ark_relations::r1cs::{
    ConstraintMatrices, ConstraintSynthesizer, ConstraintSystem, OptimizationGoal, SynthesisMode,
};
use sha2::{Digest, Sha256};

use crate::binfile::{biguint_le, SectionReader, SectionWriter};
use crate::codec::{self, FIELD_SIZE};
use crate::error::{CeremonyError, CeremonyFileError};
use crate::zkey::bn254_scalar_prime;

/// File magic.
pub const R1CS_MAGIC: &[u8; 4] = b"r1cs";

/// Section tags.
pub mod section {
    /// Header.
    pub const HEADER: u32 = 1;
    /// Constraints.
    pub const CONSTRAINTS: u32 = 2;
    /// Wire-to-label map.
    pub const WIRE_TO_LABEL: u32 = 3;
}

/// Sparse linear combination: `(wire, coefficient)` terms.
pub type LinearCombination = Vec<(u32, Fr)>;

/// One rank-1 constraint `⟨A, w⟩ · ⟨B, w⟩ = ⟨C, w⟩`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Left factor.
    pub a: LinearCombination,
    /// Right factor.
    pub b: LinearCombination,
    /// Product.
    pub c: LinearCombination,
}

/// A rank-1 constraint system over the BN254 scalar field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct R1cs {
    /// Total wires including the constant one.
    pub num_wires: u32,
    /// Public outputs.
    pub num_pub_out: u32,
    /// Public inputs.
    pub num_pub_in: u32,
    /// Private inputs.
    pub num_prv_in: u32,
    /// Labels in the original circuit.
    pub num_labels: u64,
    /// Constraints in order.
    pub constraints: Vec<Constraint>,
    /// Label id of each wire.
    pub wire_to_label: Vec<u64>,
}

impl R1cs {
    /// Number of instance wires: the constant one plus all public wires.
    pub fn num_instance(&self) -> usize {
        1 + self.num_pub_out as usize + self.num_pub_in as usize
    }

    /// Number of witness (private) wires.
    pub fn num_witness(&self) -> usize {
        self.num_wires as usize - self.num_instance()
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// QAP domain size: constraints plus one input-copy row per instance
    /// wire, rounded up to a power of two.
    pub fn domain_size(&self) -> usize {
        (self.num_constraints() + self.num_instance()).next_power_of_two()
    }

    /// Read and validate a circom `r1cs` stream.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, CeremonyFileError> {
        let mut file = SectionReader::open(reader, R1CS_MAGIC)?;
        file.require_version()?;

        let header = file.seek_unique_section(section::HEADER)?;
        let n8 = file.read_u32()?;
        if n8 as usize != FIELD_SIZE {
            return Err(CeremonyFileError::UnsupportedField("r1cs element size is not 32 bytes"));
        }
        if file.read_biguint(FIELD_SIZE)? != bn254_scalar_prime() {
            return Err(CeremonyFileError::UnsupportedField(
                "r1cs prime is not the BN254 scalar field",
            ));
        }
        let num_wires = file.read_u32()?;
        let num_pub_out = file.read_u32()?;
        let num_pub_in = file.read_u32()?;
        let num_prv_in = file.read_u32()?;
        let num_labels = file.read_u64()?;
        let num_constraints = file.read_u32()?;
        file.expect_section_end(&header)?;

        let public = 1u64 + num_pub_out as u64 + num_pub_in as u64;
        if public > num_wires as u64 {
            return Err(CeremonyFileError::InconsistentHeader(
                "public wires exceed the wire count",
            ));
        }

        let body = file.seek_unique_section(section::CONSTRAINTS)?;
        // Each constraint needs at least three term counts.
        let capacity = (num_constraints as u64).min(body.size / 12) as usize;
        let mut constraints = Vec::with_capacity(capacity);
        // A term is a wire index plus one coefficient.
        let max_terms = body.size / (4 + FIELD_SIZE as u64);
        let mut coeff_index = 0usize;
        for _ in 0..num_constraints {
            let mut lc = || read_lc(&mut file, num_wires, max_terms, &mut coeff_index);
            let a = lc()?;
            let b = lc()?;
            let c = lc()?;
            constraints.push(Constraint { a, b, c });
        }
        file.expect_section_end(&body)?;

        let wire_to_label = if file.has_section(section::WIRE_TO_LABEL) {
            let map = file.seek_unique_section(section::WIRE_TO_LABEL)?;
            crate::binfile::check_size(&map, num_wires as u64 * 8)?;
            (0..num_wires)
                .map(|_| file.read_u64())
                .collect::<Result<Vec<_>, _>>()?
        } else {
            // Without a label map nothing in the file backs wires the
            // constraints never reference.
            let referenced = constraints
                .iter()
                .flat_map(|c| c.a.iter().chain(&c.b).chain(&c.c))
                .map(|(wire, _)| *wire as u64 + 1)
                .max()
                .unwrap_or(0);
            if num_wires as u64 > referenced {
                return Err(CeremonyFileError::InconsistentHeader(
                    "wire count exceeds the referenced wires and no label map is present",
                ));
            }
            (0..num_wires as u64).collect()
        };

        Ok(Self {
            num_wires,
            num_pub_out,
            num_pub_in,
            num_prv_in,
            num_labels,
            constraints,
            wire_to_label,
        })
    }

    /// Read a circom `r1cs` file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CeremonyFileError> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Encode in circom layout.
    pub fn to_writer(&self) -> SectionWriter {
        let mut header = Vec::with_capacity(4 + FIELD_SIZE + 28);
        header.extend_from_slice(&(FIELD_SIZE as u32).to_le_bytes());
        header.extend(biguint_le(&bn254_scalar_prime(), FIELD_SIZE));
        header.extend_from_slice(&self.num_wires.to_le_bytes());
        header.extend_from_slice(&self.num_pub_out.to_le_bytes());
        header.extend_from_slice(&self.num_pub_in.to_le_bytes());
        header.extend_from_slice(&self.num_prv_in.to_le_bytes());
        header.extend_from_slice(&self.num_labels.to_le_bytes());
        header.extend_from_slice(&(self.constraints.len() as u32).to_le_bytes());

        let mut body = Vec::new();
        for constraint in &self.constraints {
            for lc in [&constraint.a, &constraint.b, &constraint.c] {
                body.extend_from_slice(&(lc.len() as u32).to_le_bytes());
                for (wire, coeff) in lc {
                    body.extend_from_slice(&wire.to_le_bytes());
                    codec::encode_fr(coeff, &mut body);
                }
            }
        }

        let labels = self
            .wire_to_label
            .iter()
            .flat_map(|label| label.to_le_bytes())
            .collect();

        let mut w = SectionWriter::new(R1CS_MAGIC);
        w.section(section::HEADER, header)
            .section(section::CONSTRAINTS, body)
            .section(section::WIRE_TO_LABEL, labels);
        w
    }

    /// Write the file to `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.to_writer().write_to(out)
    }

    /// SHA-256 of the circom encoding. Binds Phase 2 artifacts to a circuit.
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.to_writer().to_bytes()).into()
    }

    /// Build from arkworks constraint matrices.
    pub fn from_matrices(matrices: &ConstraintMatrices<Fr>) -> Self {
        let lc = |row: &Vec<(Fr, usize)>| -> LinearCombination {
            row.iter().map(|(coeff, wire)| (*wire as u32, *coeff)).collect()
        };
        let constraints = matrices
            .a
            .iter()
            .zip(&matrices.b)
            .zip(&matrices.c)
            .map(|((a, b), c)| Constraint {
                a: lc(a),
                b: lc(b),
                c: lc(c),
            })
            .collect();
        let num_wires = (matrices.num_instance_variables + matrices.num_witness_variables) as u32;
        Self {
            num_wires,
            num_pub_out: 0,
            num_pub_in: matrices.num_instance_variables as u32 - 1,
            num_prv_in: matrices.num_witness_variables as u32,
            num_labels: num_wires as u64,
            constraints,
            wire_to_label: (0..num_wires as u64).collect(),
        }
    }

    /// Synthesize `circuit` in setup mode and capture its constraints.
    pub fn from_circuit<C: ConstraintSynthesizer<Fr>>(circuit: C) -> Result<Self, CeremonyError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Setup);
        circuit.generate_constraints(cs.clone())?;
        cs.finalize();
        let matrices = cs
            .to_matrices()
            .ok_or(ark_relations::r1cs::SynthesisError::MissingCS)?;
        let r1cs = Self::from_matrices(&matrices);
        tracing::debug!(
            constraints = r1cs.num_constraints(),
            wires = r1cs.num_wires,
            public = r1cs.num_instance() - 1,
            "synthesized circuit"
        );
        Ok(r1cs)
    }
}

fn read_lc<R: Read + Seek>(
    file: &mut SectionReader<R>,
    num_wires: u32,
    max_terms: u64,
    coeff_index: &mut usize,
) -> Result<LinearCombination, CeremonyFileError> {
    let terms = file.read_u32()?;
    if terms > num_wires {
        return Err(CeremonyFileError::InconsistentHeader(
            "linear combination has more terms than wires",
        ));
    }
    if terms as u64 > max_terms {
        return Err(CeremonyFileError::InconsistentHeader(
            "linear combination overruns the constraints section",
        ));
    }
    let mut lc = Vec::with_capacity(terms as usize);
    let mut coeff = [0u8; FIELD_SIZE];
    for _ in 0..terms {
        let wire = file.read_u32()?;
        if wire >= num_wires {
            return Err(CeremonyFileError::WireOutOfRange { wire, wires: num_wires });
        }
        file.read_bytes(&mut coeff)?;
        let value = codec::decode_fr(&coeff).ok_or(CeremonyFileError::NonCanonicalFieldElement {
            section: section::CONSTRAINTS,
            index: *coeff_index,
        })?;
        *coeff_index += 1;
        lc.push((wire, value));
    }
    Ok(lc)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::testing::CubeCircuit;

    #[test]
    fn captures_arkworks_circuit() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        assert_eq!(r1cs.num_constraints(), 3);
        assert_eq!(r1cs.num_instance(), 2);
        assert_eq!(r1cs.num_witness(), 3);
        assert_eq!(r1cs.num_wires, 5);
        // 3 constraints + 2 input rows -> 8
        assert_eq!(r1cs.domain_size(), 8);
    }

    #[test]
    fn circom_encoding_round_trips() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let mut bytes = Vec::new();
        r1cs.write_to(&mut bytes).unwrap();
        assert_eq!(&bytes[..4], b"r1cs");
        assert_eq!(R1cs::read(Cursor::new(bytes)).unwrap(), r1cs);
    }

    #[test]
    fn digest_tracks_constraints() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let mut changed = r1cs.clone();
        changed.constraints[0].c[0].1 += Fr::from(1u64);
        assert_eq!(r1cs.digest(), r1cs.clone().digest());
        assert_ne!(r1cs.digest(), changed.digest());
    }

    #[test]
    fn wire_out_of_range_is_rejected() {
        let mut r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        r1cs.constraints[1].a[0].0 = r1cs.num_wires;
        let err = R1cs::read(Cursor::new(r1cs.to_writer().to_bytes())).unwrap_err();
        assert!(matches!(err, CeremonyFileError::WireOutOfRange { .. }));
    }

    #[test]
    fn missing_label_section_defaults_to_identity() {
        let r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        let full = r1cs.to_writer().to_bytes();
        // Rebuild without section 3.
        let mut file = SectionReader::open(Cursor::new(full), R1CS_MAGIC).unwrap();
        let header = file.read_section(section::HEADER).unwrap();
        let body = file.read_section(section::CONSTRAINTS).unwrap();
        let mut w = SectionWriter::new(R1CS_MAGIC);
        w.section(section::HEADER, header).section(section::CONSTRAINTS, body);
        let back = R1cs::read(Cursor::new(w.to_bytes())).unwrap();
        assert_eq!(back.wire_to_label, vec![0, 1, 2, 3, 4]);
    }

    fn header(num_wires: u32, num_constraints: u32) -> Vec<u8> {
        let mut header = (FIELD_SIZE as u32).to_le_bytes().to_vec();
        header.extend(biguint_le(&bn254_scalar_prime(), FIELD_SIZE));
        header.extend_from_slice(&num_wires.to_le_bytes());
        header.extend_from_slice(&[0u8; 12]);
        header.extend_from_slice(&0u64.to_le_bytes());
        header.extend_from_slice(&num_constraints.to_le_bytes());
        header
    }

    #[test]
    fn unlabelled_wire_count_must_be_referenced() {
        let mut w = SectionWriter::new(R1CS_MAGIC);
        w.section(section::HEADER, header(u32::MAX, 0))
            .section(section::CONSTRAINTS, Vec::new());
        assert!(matches!(
            R1cs::read(Cursor::new(w.to_bytes())).unwrap_err(),
            CeremonyFileError::InconsistentHeader(_)
        ));
    }

    #[test]
    fn term_count_beyond_section_is_rejected() {
        let mut body = (u32::MAX - 1).to_le_bytes().to_vec();
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&[0u8; FIELD_SIZE]);
        let mut w = SectionWriter::new(R1CS_MAGIC);
        w.section(section::HEADER, header(u32::MAX, 1))
            .section(section::CONSTRAINTS, body)
            .section(section::WIRE_TO_LABEL, Vec::new());
        assert!(matches!(
            R1cs::read(Cursor::new(w.to_bytes())).unwrap_err(),
            CeremonyFileError::InconsistentHeader(_)
        ));
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_constraints_never_panic(
            num_wires in proptest::num::u32::ANY,
            num_constraints in proptest::num::u32::ANY,
            body in proptest::collection::vec(proptest::num::u8::ANY, 0..512),
        ) {
            let mut w = SectionWriter::new(R1CS_MAGIC);
            w.section(section::HEADER, header(num_wires, num_constraints))
                .section(section::CONSTRAINTS, body);
            let _ = R1cs::read(Cursor::new(w.to_bytes()));
        }

        #[test]
        fn arbitrary_header_never_panics(
            header in proptest::collection::vec(proptest::num::u8::ANY, 0..96),
            labels in proptest::collection::vec(proptest::num::u8::ANY, 0..64),
        ) {
            let mut w = SectionWriter::new(R1CS_MAGIC);
            w.section(section::HEADER, header)
                .section(section::CONSTRAINTS, Vec::new())
                .section(section::WIRE_TO_LABEL, labels);
            let _ = R1cs::read(Cursor::new(w.to_bytes()));
        }
    }

    #[test]
    fn public_count_beyond_wires_is_rejected() {
        let mut r1cs = R1cs::from_circuit(CubeCircuit::blank()).unwrap();
        r1cs.num_pub_in = 10;
        assert!(matches!(
            R1cs::read(Cursor::new(r1cs.to_writer().to_bytes())).unwrap_err(),
            CeremonyFileError::InconsistentHeader(_)
        ));
    }
}
