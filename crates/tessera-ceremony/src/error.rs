//! # Ceremony Error Types
//!
//! Three layers, each a `thiserror` enum:
//!
//! - [`CeremonyFileError`]: anything wrong with the bytes of a ceremony file
//!   (`ptau`, `zkey`, `r1cs` or a tessera artifact). Trusted-setup input
//!   crosses a trust boundary, so off-curve points and non-canonical field
//!   elements are typed errors, never panics.
//! - [`VerificationError`]: a Phase 2 contribution that does not follow from
//!   its predecessor.
//! - [`CeremonyError`]: the umbrella returned by pipeline stages.

use thiserror::Error;

/// Coarse classification of [`CeremonyFileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileErrorKind {
    /// Bad magic, truncated data, section-table violations, wrong field.
    MalformedFile,
    /// A zkey for a proving system other than Groth16.
    UnsupportedProtocol,
    /// A decoded group element is not on the curve (or not in the subgroup).
    PointNotOnCurve,
    /// The underlying stream failed.
    Io,
}

/// Errors decoding a section-tagged ceremony file.
#[derive(Error, Debug)]
pub enum CeremonyFileError {
    /// I/O failure other than an unexpected end of file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the expected 4-byte magic.
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic {
        /// Magic the caller asked for.
        expected: String,
        /// Magic found in the file.
        found: String,
    },

    /// The container version is not one this reader understands.
    #[error("unsupported {magic} version {version}")]
    UnsupportedVersion {
        /// File magic.
        magic: String,
        /// Version found.
        version: u32,
    },

    /// The stream ended before a fixed-size field was complete.
    #[error("truncated file")]
    Truncated,

    /// A section's declared size runs past the end of the file.
    #[error("section {tag} at offset {offset} with size {size} overruns the file")]
    SectionOverrun {
        /// Section tag.
        tag: u32,
        /// Payload offset.
        offset: u64,
        /// Declared payload size.
        size: u64,
    },

    /// A section the format requires is absent.
    #[error("missing section {tag}")]
    MissingSection {
        /// Section tag.
        tag: u32,
    },

    /// A section that must be unique appears more than once.
    #[error("section {tag} has {count} segments; expected exactly one")]
    MultiSegmentSection {
        /// Section tag.
        tag: u32,
        /// Number of segments found.
        count: usize,
    },

    /// A section's size disagrees with the data it is declared to hold.
    #[error("section {tag} is {actual} bytes; expected {expected}")]
    SectionLength {
        /// Section tag.
        tag: u32,
        /// Size implied by the header.
        expected: u64,
        /// Size found.
        actual: u64,
    },

    /// The file is over a different field or element width than BN254.
    #[error("unsupported field: {0}")]
    UnsupportedField(&'static str),

    /// A domain power outside what BN254's FFT domains support.
    #[error("unsupported power {0} (maximum 28)")]
    UnsupportedPower(u32),

    /// A field element is not reduced modulo the field prime.
    #[error("non-canonical field element in section {section} at index {index}")]
    NonCanonicalFieldElement {
        /// Section tag.
        section: u32,
        /// Element index within the section.
        index: usize,
    },

    /// A decoded point does not satisfy the curve equation.
    #[error("point {index} in section {section} is not on the curve")]
    PointNotOnCurve {
        /// Section tag.
        section: u32,
        /// Point index within the section.
        index: usize,
    },

    /// A decoded point is on the curve but outside the prime-order subgroup.
    #[error("point {index} in section {section} is not in the prime-order subgroup")]
    PointNotInSubgroup {
        /// Section tag.
        section: u32,
        /// Point index within the section.
        index: usize,
    },

    /// The zkey protocol id is not Groth16.
    #[error("zkey protocol id {protocol_id} is not Groth16 (1)")]
    UnsupportedProtocol {
        /// Protocol id found in section 1.
        protocol_id: u32,
    },

    /// An r1cs term refers to a wire beyond the declared wire count.
    #[error("constraint refers to wire {wire} of {wires}")]
    WireOutOfRange {
        /// Wire index found.
        wire: u32,
        /// Declared wire count.
        wires: u32,
    },

    /// Header counts contradict each other.
    #[error("inconsistent header: {0}")]
    InconsistentHeader(&'static str),

    /// A tessera artifact's stored hash does not match its content.
    #[error("{artifact} hash does not match its content")]
    HashMismatch {
        /// Artifact kind.
        artifact: &'static str,
    },
}

impl CeremonyFileError {
    /// Classify this error.
    pub fn kind(&self) -> FileErrorKind {
        match self {
            Self::Io(_) => FileErrorKind::Io,
            Self::UnsupportedProtocol { .. } => FileErrorKind::UnsupportedProtocol,
            Self::PointNotOnCurve { .. } | Self::PointNotInSubgroup { .. } => {
                FileErrorKind::PointNotOnCurve
            }
            Self::BadMagic { .. }
            | Self::UnsupportedVersion { .. }
            | Self::Truncated
            | Self::SectionOverrun { .. }
            | Self::MissingSection { .. }
            | Self::MultiSegmentSection { .. }
            | Self::SectionLength { .. }
            | Self::UnsupportedField(_)
            | Self::UnsupportedPower(_)
            | Self::NonCanonicalFieldElement { .. }
            | Self::WireOutOfRange { .. }
            | Self::InconsistentHeader(_)
            | Self::HashMismatch { .. } => FileErrorKind::MalformedFile,
        }
    }
}

/// Reasons a Phase 2 contribution fails verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The two states were initialised from different `(r1cs, phase1)` pairs.
    #[error("contribution was initialised from a different circuit or phase 1")]
    OriginMismatch,

    /// The stored hash does not match the state's content.
    #[error("{which} state hash does not match its content")]
    HashMismatch {
        /// `previous` or `contribution`.
        which: &'static str,
    },

    /// Vector lengths differ between the two states.
    #[error("{what} length changed from {previous} to {contribution}")]
    LengthMismatch {
        /// Which vector.
        what: &'static str,
        /// Length in the previous state.
        previous: usize,
        /// Length in the contribution.
        contribution: usize,
    },

    /// The contribution carries identity points where secrets must be non-zero.
    #[error("degenerate contribution: {0} is the identity")]
    Degenerate(&'static str),

    /// The contributor's proof of knowledge of their secret does not verify.
    #[error("proof of knowledge does not verify")]
    InvalidProofOfKnowledge,

    /// Delta in G1 was not updated by the proven secret.
    #[error("delta in G1 was not updated by the contributed secret")]
    DeltaNotFromContribution,

    /// Delta in G1 and delta in G2 were updated by different factors.
    #[error("delta in G1 and G2 disagree")]
    InconsistentDelta,

    /// The `L` query was not divided by the contributed secret.
    #[error("L query was not updated consistently with delta")]
    InvalidL,

    /// The `Z` query was not divided by the contributed secret.
    #[error("Z query was not updated consistently with delta")]
    InvalidZ,

    /// No point was found while hashing to G2.
    #[error("hash to G2 found no point")]
    HashToCurve,
}

/// Umbrella error for ceremony pipeline stages.
#[derive(Error, Debug)]
pub enum CeremonyError {
    /// Input file could not be decoded.
    #[error(transparent)]
    File(#[from] CeremonyFileError),

    /// Contribution verification failed.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// Circuit synthesis failed.
    #[error("circuit synthesis failed: {0}")]
    Synthesis(#[from] ark_relations::r1cs::SynthesisError),

    /// The circuit needs a larger FFT domain than phase 1 provides.
    #[error("circuit needs a domain of {required} but phase 1 provides {available}")]
    DomainTooLarge {
        /// Domain size the circuit needs.
        required: usize,
        /// Domain size of phase 1.
        available: usize,
    },

    /// An artifact was not derived from the other inputs of this stage.
    #[error("{artifact} was not derived from the supplied r1cs and phase 1")]
    StageMismatch {
        /// Which artifact.
        artifact: &'static str,
    },

    /// An artifact's vectors do not fit the circuit.
    #[error("{what} has {actual} entries; circuit needs {expected}")]
    ShapeMismatch {
        /// Which vector.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Phase 1 vectors are shorter than the declared power requires.
    #[error("phase 1 {what} has {actual} points; power {power} needs {expected}")]
    IncompletePhase1 {
        /// Which vector.
        what: &'static str,
        /// Declared power.
        power: u32,
        /// Required length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}
